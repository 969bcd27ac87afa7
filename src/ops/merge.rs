//! Non-mutating deep merge
//!
//! Rules, in order:
//! 1. identical values merge to the left value
//! 2. an absent side yields the other side
//! 3. two mappings (or two sequences) merge key by key (index by index)
//!    into a new node; entries only in `b` are shared, not copied
//! 4. two back-references merge when their targets were merged with each
//!    other, and then point at the merged node
//! 5. a callable combined with a callable or a composite becomes a new
//!    callable that evaluates both with the call's arguments and merges the
//!    results
//! 6. anything else is a [`Error::MergeConflict`]
//!
//! Once the walk succeeds, back-references held directly by a merged node
//! whose target was merged are re-pointed at the merged node. A failed merge
//! frees every node it allocated.

use super::shape::{body_of, compose, Shape};
use crate::model::{Composite, Mapping, Node, NodeId, Path, Value};
use crate::store::Heap;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Merge two value graphs into a new one without writing through either
pub fn deep_merge(heap: &mut Heap, a: &Value, b: &Value) -> Result<Value> {
    merge_at(heap, a, b, &Path::root())
}

/// [`deep_merge`] reporting conflicts relative to `path`
pub(crate) fn merge_at(heap: &mut Heap, a: &Value, b: &Value, path: &Path) -> Result<Value> {
    let mut merger = Merger {
        heap,
        visited: HashMap::new(),
        owners: HashMap::new(),
        fresh: Vec::new(),
    };
    match merger.merge(a, b, path) {
        Ok(merged) => {
            let repointed = merger.repoint_back_refs()?;
            trace!(allocated = merger.fresh.len(), repointed, "deep merge finished");
            Ok(merged)
        }
        Err(e) => {
            let discarded = merger.heap.discard(merger.fresh.drain(..));
            debug!(discarded, "deep merge failed, merged nodes discarded");
            Err(e)
        }
    }
}

struct Merger<'h> {
    heap: &'h mut Heap,
    /// (left, right) pair → merged node, installed before recursing
    visited: HashMap<(NodeId, NodeId), NodeId>,
    /// Either side of a merged pair → the merged node
    owners: HashMap<NodeId, NodeId>,
    /// Nodes allocated by this merge
    fresh: Vec<NodeId>,
}

impl Merger<'_> {
    fn merge(&mut self, a: &Value, b: &Value, path: &Path) -> Result<Value> {
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
            (Shape::Mapping, Shape::Mapping) | (Shape::Sequence, Shape::Sequence) => {
                self.merge_composites(a, b, path)
            }
            (Shape::BackRef, Shape::BackRef) => self.merge_back_refs(a, b, path),
            (Shape::Callable, Shape::Callable) => Ok(self.compose(a, b, path)),
            (Shape::Callable, other) | (other, Shape::Callable) if other.is_composite() => {
                Ok(self.compose(a, b, path))
            }
            (left, right) => Err(conflict(path, left, right)),
        }
    }

    fn merge_composites(&mut self, a: &Value, b: &Value, path: &Path) -> Result<Value> {
        let (Some(a_id), Some(b_id)) = (a.as_node(), b.as_node()) else {
            return Err(conflict(path, Shape::of(self.heap, a)?, Shape::of(self.heap, b)?));
        };
        if let Some(merged) = self.visited.get(&(a_id, b_id)) {
            trace!(%path, "merge pair revisited");
            return Ok(Value::Node(*merged));
        }

        match (body_of(self.heap, a)?, body_of(self.heap, b)?) {
            (Some(Composite::Mapping(mut result)), Some(Composite::Mapping(other))) => {
                let merged = self.register(a_id, b_id, Node::Mapping(Mapping::new()));
                for (key, value) in other.iter() {
                    let next = match result.get(key) {
                        Some(existing) => {
                            let existing = existing.clone();
                            self.merge(&existing, value, &path.key(key))?
                        }
                        None => value.clone(),
                    };
                    result.insert(key, next);
                }
                *self.heap.get_mut(merged)? = Node::Mapping(result);
                Ok(Value::Node(merged))
            }
            (Some(Composite::Sequence(mut result)), Some(Composite::Sequence(other))) => {
                let merged = self.register(a_id, b_id, Node::Sequence(Vec::new()));
                for (i, value) in other.iter().enumerate() {
                    if i < result.len() {
                        let existing = result[i].clone();
                        result[i] = self.merge(&existing, value, &path.index(i))?;
                    } else {
                        result.push(value.clone());
                    }
                }
                *self.heap.get_mut(merged)? = Node::Sequence(result);
                Ok(Value::Node(merged))
            }
            _ => Err(conflict(path, Shape::of(self.heap, a)?, Shape::of(self.heap, b)?)),
        }
    }

    fn merge_back_refs(&mut self, a: &Value, b: &Value, path: &Path) -> Result<Value> {
        if let (Some(left), Some(right)) = (a.as_back_ref(), b.as_back_ref()) {
            let merged = self
                .visited
                .get(&(left.target(), right.target()))
                .or_else(|| {
                    let owner = self.owners.get(&left.target())?;
                    (self.owners.get(&right.target()) == Some(owner)).then_some(owner)
                })
                .copied();
            if let Some(merged) = merged {
                return Ok(Value::BackRef(left.retarget(merged)));
            }
        }
        Err(Error::MergeConflict {
            path: path.clone(),
            reason: "back references point at nodes that were not merged together".into(),
        })
    }

    fn compose(&mut self, a: &Value, b: &Value, path: &Path) -> Value {
        let composed = compose(self.heap, a, b, path, merge_at);
        self.fresh.extend(composed.as_node());
        composed
    }

    fn register(&mut self, a: NodeId, b: NodeId, placeholder: Node) -> NodeId {
        let merged = self.heap.alloc(placeholder);
        self.visited.insert((a, b), merged);
        self.owners.entry(a).or_insert(merged);
        self.owners.entry(b).or_insert(merged);
        self.fresh.push(merged);
        merged
    }

    /// Re-point back-references carried over from one side whose target
    /// was merged into a new node
    fn repoint_back_refs(&mut self) -> Result<usize> {
        let mut repointed = 0;
        for &merged in &self.fresh {
            let children: Box<dyn Iterator<Item = &mut Value>> = match self.heap.get_mut(merged)? {
                Node::Sequence(items) => Box::new(items.iter_mut()),
                Node::Mapping(mapping) => Box::new(mapping.values_mut()),
                Node::Callable(_) | Node::Frozen(_) => continue,
            };
            for child in children {
                let Value::BackRef(back_ref) = child else {
                    continue;
                };
                if let Some(&owner) = self.owners.get(&back_ref.target()) {
                    *back_ref = back_ref.retarget(owner);
                    repointed += 1;
                }
            }
        }
        Ok(repointed)
    }
}

fn conflict(path: &Path, left: Shape, right: Shape) -> Error {
    Error::MergeConflict {
        path: path.clone(),
        reason: format!("cannot merge {} with {}", left.name(), right.name()),
    }
}
