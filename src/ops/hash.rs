//! Structural hashing of value graphs
//!
//! The digest is a canonical string. Each composite node gets a reference
//! number the first time it is seen (0, 1, 2, ... in visitation order) and
//! every later visit prints `REF#<n>` instead of recursing, which is what
//! makes cyclic graphs terminate.
//!
//! Two properties are intentional and worth knowing:
//! - mapping keys are hashed in insertion order, so the same entries
//!   inserted in a different order hash differently;
//! - reference numbers encode sharing, so a graph that aliases one node
//!   twice hashes differently from a graph holding two equal copies.
//!
//! Callables hash to a constant tag: two different functions are
//! indistinguishable here.

use crate::model::{Composite, Node, NodeId, Value};
use crate::store::Heap;
use std::collections::HashMap;
use std::fmt;

/// Emitted for every callable
pub const CALLABLE_TAG: &str = "FN";
/// Emitted for a back-reference whose target is outside the hashed scope
/// (not yet numbered, or reclaimed)
pub const UNRESOLVED_BACK_REF: &str = "BACKREF?";
/// Emitted for a strong handle whose node was reclaimed
pub const RECLAIMED_NODE: &str = "NODE?";

/// Canonical digest string of a value graph
pub fn deep_hash(heap: &Heap, value: &Value) -> String {
    let mut hasher = GraphHasher {
        heap,
        refs: HashMap::new(),
        out: String::new(),
    };
    hasher.hash(value);
    hasher.out
}

/// BLAKE3 digest of a graph's [`deep_hash`] string
///
/// Fixed-size stand-in for the canonical string when graphs are compared
/// or stored; equal fingerprints mean equal digests.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

/// [`Fingerprint`] of a value graph
pub fn fingerprint(heap: &Heap, value: &Value) -> Fingerprint {
    let digest = blake3::hash(deep_hash(heap, value).as_bytes());
    Fingerprint(*digest.as_bytes())
}

/// Whether two graphs hash to the same digest
pub fn same_shape(heap: &Heap, a: &Value, b: &Value) -> bool {
    deep_hash(heap, a) == deep_hash(heap, b)
}

struct GraphHasher<'h> {
    heap: &'h Heap,
    refs: HashMap<NodeId, usize>,
    out: String,
}

impl GraphHasher<'_> {
    fn hash(&mut self, value: &Value) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => self.out.push_str(&format_number(*n)),
            Value::Text(s) => self.push_quoted(s),
            Value::Node(id) => self.hash_node(*id),
            Value::BackRef(back_ref) => {
                let target = back_ref.target();
                match self.refs.get(&target) {
                    Some(n) if self.heap.contains(target) => {
                        self.out.push_str(&format!("BACKREF#{}", n))
                    }
                    _ => self.out.push_str(UNRESOLVED_BACK_REF),
                }
            }
        }
    }

    fn hash_node(&mut self, id: NodeId) {
        if let Some(n) = self.refs.get(&id) {
            self.out.push_str(&format!("REF#{}", n));
            return;
        }
        let heap = self.heap;
        let Ok(node) = heap.get(id) else {
            self.out.push_str(RECLAIMED_NODE);
            return;
        };

        match node {
            Node::Callable(_) => self.out.push_str(CALLABLE_TAG),
            Node::Sequence(items) | Node::Frozen(Composite::Sequence(items)) => {
                self.number(id);
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.hash(item);
                }
                self.out.push(']');
            }
            Node::Mapping(mapping) | Node::Frozen(Composite::Mapping(mapping)) => {
                self.number(id);
                self.out.push('{');
                for (i, (key, item)) in mapping.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.push_quoted(key);
                    self.out.push(':');
                    self.hash(item);
                }
                self.out.push('}');
            }
        }
    }

    /// Assign the next reference number and print it
    fn number(&mut self, id: NodeId) {
        let n = self.refs.len();
        self.refs.insert(id, n);
        self.out.push_str(&n.to_string());
    }

    fn push_quoted(&mut self, s: &str) {
        self.out.push_str(&serde_json::Value::from(s).to_string());
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        // -0 and 0 print alike
        "0".to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        let heap = Heap::new();
        assert_eq!(deep_hash(&heap, &Value::Null), "null");
        assert_eq!(deep_hash(&heap, &Value::from(true)), "true");
        assert_eq!(deep_hash(&heap, &Value::from(3)), "3");
        assert_eq!(deep_hash(&heap, &Value::from(1.5)), "1.5");
        assert_eq!(deep_hash(&heap, &Value::Number(-0.0)), "0");
        assert_eq!(deep_hash(&heap, &Value::from("a\"b")), r#""a\"b""#);
    }

    #[test]
    fn test_nested_format() {
        let mut heap = Heap::new();
        let list = heap.sequence([Value::from(1), Value::from("x")]);
        let root = heap.mapping([("a", list), ("b", Value::Null)]);

        assert_eq!(deep_hash(&heap, &root), r#"0{"a":1[1,"x"],"b":null}"#);
    }

    #[test]
    fn test_shared_reference_vs_duplicate() {
        let mut heap = Heap::new();
        let shared = heap.sequence([]);
        let aliased = heap.sequence([shared.clone(), shared]);
        let first = heap.sequence([]);
        let second = heap.sequence([]);
        let duplicated = heap.sequence([first, second]);

        assert_eq!(deep_hash(&heap, &aliased), "0[1[],REF#1]");
        assert_eq!(deep_hash(&heap, &duplicated), "0[1[],2[]]");
    }

    #[test]
    fn test_back_refs() {
        let mut heap = Heap::new();
        let root = heap
            .rec_mapping(|heap, me| {
                let up = heap.back_ref(me, "up")?;
                Ok([("up", up)].into_iter().collect())
            })
            .unwrap();
        assert_eq!(deep_hash(&heap, &root), r#"0{"up":BACKREF#0}"#);

        let outside = heap.sequence([]);
        let stray = heap.back_ref(outside.as_node().unwrap(), "x").unwrap();
        let holder = heap.sequence([stray]);
        assert_eq!(deep_hash(&heap, &holder), "0[BACKREF?]");
    }

    #[test]
    fn test_reclaimed_back_ref_is_sentinel() {
        let mut heap = Heap::new();
        let target = heap.sequence([]);
        let back_ref = heap.back_ref(target.as_node().unwrap(), "gone").unwrap();
        let holder = heap.sequence([back_ref]);
        heap.collect(&[holder.clone()]);

        assert_eq!(deep_hash(&heap, &holder), "0[BACKREF?]");
    }

    #[test]
    fn test_callables_are_opaque() {
        let mut heap = Heap::new();
        let f = heap.function(|_, _| Ok(Value::from(1)));
        let g = heap.function(|_, _| Ok(Value::from(2)));

        assert_eq!(deep_hash(&heap, &f), deep_hash(&heap, &g));
        assert_eq!(deep_hash(&heap, &f), CALLABLE_TAG);
    }

    #[test]
    fn test_fingerprint_and_same_shape() {
        let mut heap = Heap::new();
        let a = heap.mapping([("k", Value::from(1))]);
        let b = heap.mapping([("k", Value::from(1))]);
        let c = heap.mapping([("k", Value::from(2))]);

        assert!(same_shape(&heap, &a, &b));
        assert!(!same_shape(&heap, &a, &c));
        assert_eq!(fingerprint(&heap, &a), fingerprint(&heap, &b));
        assert_ne!(fingerprint(&heap, &a), fingerprint(&heap, &c));
    }

    #[test]
    fn test_fingerprint_is_blake3_of_digest() {
        let mut heap = Heap::new();
        let list = heap.sequence([Value::from(1), Value::from("x")]);

        let expected = blake3::hash(deep_hash(&heap, &list).as_bytes());
        let print = fingerprint(&heap, &list);
        assert_eq!(print.as_bytes(), expected.as_bytes());
        assert_eq!(print.to_hex(), expected.to_hex().as_str());
        assert_eq!(print.to_string().len(), 64);
    }
}
