//! # deepweave
//!
//! Deep copy, merge and structural hashing for value graphs that may
//! contain cycles and weak back-references, plus a deterministic, seedable,
//! branchable pseudo-random engine.
//!
//! ## Core Concepts
//!
//! - **Heap**: generational arena owning every composite node
//! - **Values**: scalars, owning node handles, and non-owning back-references
//! - **Frozen nodes**: immutable by contract, shared instead of copied
//! - **Walkers**: copy, merge, assign and hash, each keyed by node identity
//! - **Random**: reproducible stream with exact copies and independent branches
//!
//! ## Example
//!
//! ```
//! use deepweave::{deep_copy, deep_hash, Heap, Value};
//!
//! let mut heap = Heap::new();
//! let shared = heap.sequence([Value::from(1)]);
//! let root = heap.mapping([("a", shared.clone()), ("b", shared)]);
//!
//! let copy = deep_copy(&mut heap, &root).unwrap();
//! assert_eq!(heap.field(&copy, "a"), heap.field(&copy, "b"));
//! assert_eq!(deep_hash(&heap, &copy), deep_hash(&heap, &root));
//! ```

pub mod config;
pub mod model;
pub mod ops;
pub mod random;
pub mod store;

mod error;

pub use config::{Config, ConfigStore};
pub use error::{Error, Result};
pub use model::{BackRef, Callable, Composite, Mapping, Node, NodeId, Path, Value};
pub use ops::{
    deep_assign, deep_copy, deep_copy_with, deep_hash, deep_merge, fingerprint, same_shape,
    CopyOutcome, Fingerprint, ReclaimedPolicy,
};
pub use random::Random;
pub use store::{CollectStats, Heap};
