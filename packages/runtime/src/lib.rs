pub mod component;
pub mod directives;
pub mod error;
pub mod registry;
pub mod renderer;
pub mod runtime;
pub mod scheduler;
pub mod scope;


#[cfg(test)]
mod tests_directives;

#[cfg(test)]
mod tests_nested;

pub use component::{ComponentDef, ComponentId, Handle, Hook, Lifecycle, StaticComponent};
pub use directives::parse_for;
pub use error::{RenderError, RenderResult, RuntimeError, RuntimeResult};
pub use registry::{Registration, Registry};
pub use runtime::{EventBinding, Runtime};
pub use scheduler::{Scheduler, Task};
pub use scope::{slug_to_camel, ItemKey};
