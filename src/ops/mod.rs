//! Graph walkers: copy, merge, assign, hash
//!
//! Each walker keeps its own identity-keyed visited map for the duration of
//! one call; nothing is shared between calls.

mod assign;
mod copy;
mod hash;
mod merge;
mod shape;

pub use assign::deep_assign;
pub use copy::{deep_copy, deep_copy_with, CopyOutcome, ReclaimedPolicy};
pub use hash::{
    deep_hash, fingerprint, same_shape, Fingerprint, CALLABLE_TAG, RECLAIMED_NODE, UNRESOLVED_BACK_REF,
};
pub use merge::deep_merge;
