//! Values, node handles and back-references

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node slot in a [`Heap`](crate::Heap)
///
/// Handles are compared by identity. A handle whose generation no longer
/// matches its slot is stale: the node it named has been reclaimed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        NodeId { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

/// A non-owning, tagged edge to another node of the same graph
///
/// Holding a `BackRef` does not keep its target alive: the collector never
/// traces through it. `id` tells the owning structure which of its fields
/// the back-reference stands for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackRef {
    target: NodeId,
    id: String,
}

impl BackRef {
    /// Create a back-reference without checking that `target` is live.
    /// Prefer [`Heap::back_ref`](crate::Heap::back_ref).
    pub fn new(target: NodeId, id: impl Into<String>) -> Self {
        BackRef {
            target,
            id: id.into(),
        }
    }

    /// The raw target handle; may be stale
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Same tag, different target
    pub fn retarget(&self, target: NodeId) -> Self {
        BackRef {
            target,
            id: self.id.clone(),
        }
    }
}

/// A value in a graph
///
/// `Null`, `Bool`, `Number` and `Text` are scalars and carry no identity.
/// `Node` is an owning edge into the heap. Equality is identity for nodes
/// and value equality for everything else.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Node(NodeId),
    BackRef(BackRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Text(_)
        )
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_back_ref(&self) -> Option<&BackRef> {
        match self {
            Value::BackRef(back_ref) => Some(back_ref),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short kind name for diagnostics (heap nodes report as "node")
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Node(_) => "node",
            Value::BackRef(_) => "back reference",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Node(id)
    }
}

impl From<BackRef> for Value {
    fn from(back_ref: BackRef) -> Self {
        Value::BackRef(back_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_equality_is_identity() {
        let a = Value::Node(NodeId::new(1, 0));
        let b = Value::Node(NodeId::new(1, 0));
        let stale = Value::Node(NodeId::new(1, 1));
        assert_eq!(a, b);
        assert_ne!(a, stale);
    }

    #[test]
    fn test_scalar_equality_is_by_value() {
        assert_eq!(Value::from("x"), Value::Text("x".into()));
        assert_eq!(Value::from(2), Value::Number(2.0));
        assert_ne!(Value::from(1), Value::from("1"));
        assert!(Value::Null.is_scalar());
        assert!(!Value::Node(NodeId::new(0, 0)).is_scalar());
    }

    #[test]
    fn test_retarget_keeps_id() {
        let original = BackRef::new(NodeId::new(0, 0), "parent");
        let moved = original.retarget(NodeId::new(5, 2));
        assert_eq!(moved.id(), "parent");
        assert_eq!(moved.target(), NodeId::new(5, 2));
    }
}
