//! Error types for deepweave

use crate::model::{NodeId, Path};
use thiserror::Error;

/// Result type alias for deepweave operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in deepweave operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A strong handle outlived the node it named
    #[error("Node {node} has been reclaimed")]
    Reclaimed { node: NodeId },

    /// A back-reference's target has no owner left
    #[error("Back reference at '{path}' points at reclaimed node {target}")]
    ReclaimedTarget { path: Path, target: NodeId },

    #[error("Merge conflict at '{path}': {reason}")]
    MergeConflict { path: Path, reason: String },

    #[error("Node {node} is frozen")]
    Frozen { node: NodeId },

    #[error("Node {node} is a {found}, expected a {expected}")]
    KindMismatch {
        node: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Index {index} out of range for node {node} of length {len}")]
    IndexOutOfRange { node: NodeId, index: usize, len: usize },

    #[error("Value at '{path}' is not callable")]
    NotCallable { path: Path },

    #[error("Cannot represent {what} at '{path}'")]
    Unrepresentable { path: Path, what: String },

    #[error("Config error: {0}")]
    Config(String),
}
