//! Node arena
//!
//! Every composite node lives in a [`Heap`] slot and is addressed by a
//! generational [`NodeId`](crate::model::NodeId). The JSON bridge lives here
//! too since it is just another way of allocating and reading nodes.

mod heap;
mod json;

pub use heap::{CollectStats, Heap};
