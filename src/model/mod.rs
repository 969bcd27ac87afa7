//! Core data model types for deepweave

mod node;
mod path;
mod value;

pub use node::{Callable, Composite, Mapping, NativeFn, Node};
pub use path::{Path, Segment};
pub use value::{BackRef, NodeId, Value};
