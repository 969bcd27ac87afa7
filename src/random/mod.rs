//! Deterministic pseudo-randomness
//!
//! Not cryptographically secure.

mod engine;
mod sample;
mod seed;

pub use engine::{Random, Seed};
pub use sample::{choose, shuffle, take};
pub use seed::string_hash;
