//! # Ripple DOM
//!
//! The host tree the Ripple renderer patches: an arena [`Document`] with
//! DOM-like semantics, a markup parser for templates and an HTML serializer.
//!
//! ```rust,ignore
//! use ripple_dom::{parse_fragment, to_html, Document};
//!
//! let mut doc = Document::new();
//! let fragment = parse_fragment(&mut doc, "<p class=\"note\">@count</p>")?;
//! assert_eq!(to_html(&doc, fragment), "<p class=\"note\">@count</p>");
//! ```

pub mod document;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod serializer;


pub use document::{Ancestors, Attribute, Document, NodeId, NodeKind};
pub use error::{DomError, DomResult, ParseError, ParseResult};
pub use parser::{is_void_element, parse_fragment};
pub use serializer::{inner_html, to_html};
