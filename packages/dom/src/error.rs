use crate::NodeId;
use thiserror::Error;

pub type DomResult<T> = Result<T, DomError>;
pub type ParseResult<T> = Result<T, ParseError>;

/// Structural errors reported by the host tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {node} has no parent")]
    Detached { node: NodeId },

    #[error("Cannot insert {node} into its own subtree")]
    HierarchyCycle { node: NodeId },

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Element {0} already has a shadow root")]
    ShadowAlreadyAttached(NodeId),

    #[error("Node {node} is still part of a tree")]
    Attached { node: NodeId },
}

/// Markup errors, positions are byte offsets into the source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected input at {pos}: {found:?}")]
    UnexpectedInput { pos: usize, found: String },

    #[error("Unexpected end of markup at {pos}, <{tag}> is still open")]
    UnclosedTag { pos: usize, tag: String },

    #[error("Closing tag </{found}> at {pos} does not match <{expected}>")]
    MismatchedClose {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Closing tag </{tag}> at {pos} has no matching opening tag")]
    StrayClose { pos: usize, tag: String },

    #[error("Tree error while parsing: {0}")]
    Dom(#[from] DomError),
}

impl ParseError {
    pub fn unexpected_input(pos: usize, found: impl Into<String>) -> Self {
        Self::UnexpectedInput {
            pos,
            found: found.into(),
        }
    }
}
