pub mod path;
pub mod store;
pub mod tracker;
pub mod value;

#[cfg(test)]
mod tests_store;

pub use path::{coerce, evaluate, resolve, segments};
pub use store::{make_reactive, Store};
pub use tracker::{DepId, DepRecord, Region, SharedTracker, Targets, Tracker};
pub use value::{Array, Object, Value};
