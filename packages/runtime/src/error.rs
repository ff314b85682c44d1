use crate::component::ComponentId;
use ripple_dom::{DomError, ParseError};
use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Faults raised while instantiating or rendering one component
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Cannot instantiate component because the template with id '{0}' does not exist")]
    TemplateNotFound(String),

    #[error("No component is registered for <{0}>")]
    UnknownComponent(String),

    #[error("SyntaxError in :for expression: '{0}'")]
    ForSyntax(String),

    #[error("Node with :for=\"{0}\" has no :key")]
    MissingKey(String),

    #[error("Key '{expression}' evaluated to a falsy value; keys should be based on the iteration item")]
    FalsyKey { expression: String },

    #[error("Key '{expression}' must evaluate to a string or a number, got {found}")]
    InvalidKey { expression: String, found: String },

    #[error("'{method}' is not a method on component '{component}'")]
    UnknownMethod { component: String, method: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Component <{tag}> ({id}) failed: {source}")]
    Component {
        id: ComponentId,
        tag: String,
        #[source]
        source: RenderError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
