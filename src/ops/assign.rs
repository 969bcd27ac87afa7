//! In-place deep assignment, the mutating sibling of [`deep_merge`](super::deep_merge)
//!
//! `b` is written into `a` and `a` is returned. Callables compose exactly
//! like merge but combine their results with assignment. Unlike merge, a
//! mismatch between incompatible values never fails: `a` wins. A frozen `b`
//! is only read, so its entries are assigned like any other.

use super::shape::{compose, contents_of, Shape};
use crate::model::{Composite, NodeId, Path, Value};
use crate::store::Heap;
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

/// Deep-assign `b` into `a`, mutating `a` and its mutable descendants
///
/// Fails with [`Error::Frozen`] when a composite would have to be written
/// into a frozen node.
pub fn deep_assign(heap: &mut Heap, a: &Value, b: &Value) -> Result<Value> {
    assign_at(heap, a, b, &Path::root())
}

pub(crate) fn assign_at(heap: &mut Heap, a: &Value, b: &Value, path: &Path) -> Result<Value> {
    Assigner {
        heap,
        seen: HashSet::new(),
    }
    .assign(a, b, path)
}

struct Assigner<'h> {
    heap: &'h mut Heap,
    seen: HashSet<(NodeId, NodeId)>,
}

impl Assigner<'_> {
    fn assign(&mut self, a: &Value, b: &Value, path: &Path) -> Result<Value> {
        if a == b {
            return Ok(a.clone());
        }
        if a.is_null() {
            return Ok(b.clone());
        }
        if b.is_null() {
            return Ok(a.clone());
        }

        let left = Shape::of(self.heap, a)?;
        let right = Shape::of(self.heap, b)?;
        match (left, right) {
            (Shape::Mapping | Shape::Sequence, Shape::Mapping | Shape::Sequence | Shape::Frozen) => {
                self.assign_composites(left, a, b, path)
            }
            (Shape::Frozen, other) if other.is_composite() => match a.as_node() {
                Some(node) => Err(Error::Frozen { node }),
                None => Ok(a.clone()),
            },
            (Shape::Callable, Shape::Callable) => Ok(compose(self.heap, a, b, path, assign_at)),
            (Shape::Callable, other) | (other, Shape::Callable) if other.is_composite() => {
                Ok(compose(self.heap, a, b, path, assign_at))
            }
            (left, right) => {
                debug!(%path, left = left.name(), right = right.name(), "keeping left value");
                Ok(a.clone())
            }
        }
    }

    fn assign_composites(&mut self, left: Shape, a: &Value, b: &Value, path: &Path) -> Result<Value> {
        let (Some(a_id), Some(b_id)) = (a.as_node(), b.as_node()) else {
            return Ok(a.clone());
        };
        if !self.seen.insert((a_id, b_id)) {
            return Ok(a.clone());
        }

        match (left, contents_of(self.heap, b)?) {
            (Shape::Mapping, Some(Composite::Mapping(other))) => {
                for (key, value) in other.iter() {
                    let next = match self.heap.field(a, key).cloned() {
                        Some(existing) => self.assign(&existing, value, &path.key(key))?,
                        None => value.clone(),
                    };
                    self.heap.insert(a_id, key, next)?;
                }
            }
            (Shape::Sequence, Some(Composite::Sequence(other))) => {
                for (i, value) in other.iter().enumerate() {
                    let next = match self.heap.element(a, i).cloned() {
                        Some(existing) => self.assign(&existing, value, &path.index(i))?,
                        None => value.clone(),
                    };
                    self.heap.set_index(a_id, i, next)?;
                }
            }
            (left, _) => {
                let right = Shape::of(self.heap, b)?;
                debug!(%path, left = left.name(), right = right.name(), "keeping left value");
            }
        }
        Ok(a.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_mutates_left() {
        let mut heap = Heap::new();
        let a = heap.mapping([("x", Value::from(1))]);
        let b = heap.mapping([("y", Value::from(2))]);

        let result = deep_assign(&mut heap, &a, &b).unwrap();
        assert_eq!(result, a);
        assert_eq!(heap.field(&a, "y"), Some(&Value::from(2)));
        assert_eq!(heap.child_count(&b), Some(1));
    }

    #[test]
    fn test_assign_keeps_left_on_scalar_mismatch() {
        let mut heap = Heap::new();
        let a = heap.mapping([("x", Value::from(1))]);
        let b = heap.mapping([("x", Value::from("s"))]);

        deep_assign(&mut heap, &a, &b).unwrap();
        assert_eq!(heap.field(&a, "x"), Some(&Value::from(1)));
    }

    #[test]
    fn test_assign_nested_sequences() {
        let mut heap = Heap::new();
        let inner = heap.sequence([Value::from(1)]);
        let a = heap.mapping([("list", inner.clone())]);
        let b_inner = heap.sequence([Value::Null, Value::from(2)]);
        let b = heap.mapping([("list", b_inner)]);

        deep_assign(&mut heap, &a, &b).unwrap();
        assert_eq!(heap.export_json(&inner).unwrap(), serde_json::json!([1, 2]));
    }

    #[test]
    fn test_assign_into_frozen_fails() {
        let mut heap = Heap::new();
        let frozen = heap.frozen_mapping([("x", Value::from(1))]);
        let b = heap.mapping([("y", Value::from(2))]);

        assert!(matches!(
            deep_assign(&mut heap, &frozen, &b),
            Err(Error::Frozen { .. })
        ));
    }

    #[test]
    fn test_assign_reads_from_frozen_source() {
        let mut heap = Heap::new();
        let a = heap.mapping([("x", Value::from(1))]);
        let frozen = heap.frozen_mapping([("y", Value::from(2))]);

        deep_assign(&mut heap, &a, &frozen).unwrap();
        assert_eq!(heap.field(&a, "x"), Some(&Value::from(1)));
        assert_eq!(heap.field(&a, "y"), Some(&Value::from(2)));
        assert!(heap.is_frozen(frozen.as_node().unwrap()));

        let list = heap.sequence([Value::from(1)]);
        let frozen_list = heap.frozen_sequence([Value::Null, Value::from(2)]);
        deep_assign(&mut heap, &list, &frozen_list).unwrap();
        assert_eq!(heap.export_json(&list).unwrap(), serde_json::json!([1, 2]));
    }

    #[test]
    fn test_assign_frozen_sequence_into_mapping_keeps_left() {
        let mut heap = Heap::new();
        let a = heap.mapping([("x", Value::from(1))]);
        let frozen = heap.frozen_sequence([Value::from(2)]);

        assert_eq!(deep_assign(&mut heap, &a, &frozen).unwrap(), a);
        assert_eq!(heap.child_count(&a), Some(1));
    }

    #[test]
    fn test_assign_composes_callables() {
        let mut heap = Heap::new();
        let f = heap.function(|heap, _| Ok(heap.mapping([("f", Value::from(true))])));
        let g = heap.function(|heap, _| Ok(heap.mapping([("g", Value::from(true))])));

        let composed = deep_assign(&mut heap, &f, &g).unwrap();
        let result = heap.call(&composed, &[]).unwrap();
        assert_eq!(heap.field(&result, "f"), Some(&Value::from(true)));
        assert_eq!(heap.field(&result, "g"), Some(&Value::from(true)));
    }

    #[test]
    fn test_assign_cycle_terminates() {
        let mut heap = Heap::new();
        let a = heap
            .rec_mapping(|_, me| Ok([("me", Value::Node(me))].into_iter().collect()))
            .unwrap();
        let b = heap
            .rec_mapping(|_, me| Ok([("me", Value::Node(me)), ("z", Value::from(0))].into_iter().collect()))
            .unwrap();

        deep_assign(&mut heap, &a, &b).unwrap();
        assert_eq!(heap.field(&a, "z"), Some(&Value::from(0)));
        assert_eq!(heap.field(&a, "me"), Some(&a));
    }
}
