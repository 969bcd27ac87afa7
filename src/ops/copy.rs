//! Deep copy of value graphs
//!
//! The copy is depth-first. Every composite node is registered in the
//! visited map before its children are copied, so shared nodes are cloned
//! once and cycles close on the clone instead of recursing forever.

use super::shape::body_of;
use crate::model::{BackRef, Composite, Mapping, Node, NodeId, Path, Segment, Value};
use crate::store::Heap;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// What a copy does with a back-reference whose target was reclaimed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclaimedPolicy {
    /// Abort the whole copy with [`Error::ReclaimedTarget`]
    #[default]
    Fail,
    /// Keep the dangling back-reference as-is and report its path
    PassThrough,
}

impl FromStr for ReclaimedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fail" => Ok(ReclaimedPolicy::Fail),
            "pass_through" | "pass-through" => Ok(ReclaimedPolicy::PassThrough),
            other => Err(format!("unknown reclaimed policy: {}", other)),
        }
    }
}

impl fmt::Display for ReclaimedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReclaimedPolicy::Fail => write!(f, "fail"),
            ReclaimedPolicy::PassThrough => write!(f, "pass_through"),
        }
    }
}

/// Result of [`deep_copy_with`]
#[derive(Clone, Debug)]
pub struct CopyOutcome {
    pub value: Value,
    /// Paths of dangling back-references that were passed through
    pub dangling: Vec<Path>,
}

/// Copy a value graph, preserving aliasing and cycles
///
/// Frozen nodes and callables are shared with the source rather than
/// copied. A back-reference into the copied graph is re-pointed at the
/// clone; one that points elsewhere keeps its original target. Fails if a
/// back-reference's target has been reclaimed.
pub fn deep_copy(heap: &mut Heap, value: &Value) -> Result<Value> {
    deep_copy_with(heap, value, ReclaimedPolicy::Fail).map(|outcome| outcome.value)
}

/// [`deep_copy`] with an explicit policy for dangling back-references
pub fn deep_copy_with(heap: &mut Heap, value: &Value, policy: ReclaimedPolicy) -> Result<CopyOutcome> {
    let mut copier = Copier {
        heap,
        policy,
        visited: HashMap::new(),
        fresh: Vec::new(),
        dangling: Vec::new(),
        path: Path::root(),
    };
    let value = match copier.copy(value) {
        Ok(value) => value,
        Err(e) => {
            let discarded = copier.heap.discard(copier.fresh.drain(..));
            debug!(discarded, "deep copy failed, clones discarded");
            return Err(e);
        }
    };
    let patched = copier.patch_forward_refs()?;
    debug!(
        cloned = copier.fresh.len(),
        forward_refs = patched,
        dangling = copier.dangling.len(),
        "deep copy finished"
    );
    Ok(CopyOutcome {
        value,
        dangling: copier.dangling,
    })
}

struct Copier<'h> {
    heap: &'h mut Heap,
    policy: ReclaimedPolicy,
    /// Original node → its clone (or itself for shared nodes)
    visited: HashMap<NodeId, NodeId>,
    /// Nodes allocated by this copy
    fresh: Vec<NodeId>,
    dangling: Vec<Path>,
    path: Path,
}

impl Copier<'_> {
    fn copy(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::Node(id) => self.copy_node(*id),
            Value::BackRef(back_ref) => self.copy_back_ref(back_ref),
            scalar => Ok(scalar.clone()),
        }
    }

    fn copy_node(&mut self, id: NodeId) -> Result<Value> {
        if let Some(clone) = self.visited.get(&id) {
            return Ok(Value::Node(*clone));
        }

        let Some(body) = body_of(self.heap, &Value::Node(id))? else {
            // Frozen and callable nodes are shared, not cloned
            self.visited.insert(id, id);
            return Ok(Value::Node(id));
        };

        match body {
            Composite::Sequence(items) => {
                let clone = self.register(id, Node::Sequence(Vec::new()));
                let mut copied = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.path.push(Segment::Index(i));
                    copied.push(self.copy(item)?);
                    self.path.pop();
                }
                *self.heap.get_mut(clone)? = Node::Sequence(copied);
                Ok(Value::Node(clone))
            }
            Composite::Mapping(mapping) => {
                let clone = self.register(id, Node::Mapping(Mapping::new()));
                let mut copied = Mapping::new();
                for (key, item) in mapping.iter() {
                    self.path.push(Segment::Key(key.to_string()));
                    copied.insert(key, self.copy(item)?);
                    self.path.pop();
                }
                *self.heap.get_mut(clone)? = Node::Mapping(copied);
                Ok(Value::Node(clone))
            }
        }
    }

    fn copy_back_ref(&mut self, back_ref: &BackRef) -> Result<Value> {
        let target = back_ref.target();
        if !self.heap.contains(target) {
            return match self.policy {
                ReclaimedPolicy::Fail => Err(Error::ReclaimedTarget {
                    path: self.path.clone(),
                    target,
                }),
                ReclaimedPolicy::PassThrough => {
                    warn!(path = %self.path, %target, "passing dangling back reference through");
                    self.dangling.push(self.path.clone());
                    Ok(Value::BackRef(back_ref.clone()))
                }
            };
        }

        match self.visited.get(&target) {
            Some(clone) => Ok(Value::BackRef(back_ref.retarget(*clone))),
            // Outside the copy so far; patched afterwards if it gets cloned later
            None => Ok(Value::BackRef(back_ref.clone())),
        }
    }

    fn register(&mut self, original: NodeId, placeholder: Node) -> NodeId {
        let clone = self.heap.alloc(placeholder);
        self.visited.insert(original, clone);
        self.fresh.push(clone);
        clone
    }

    /// Re-point back-references whose target was cloned after the
    /// back-reference itself was copied
    fn patch_forward_refs(&mut self) -> Result<usize> {
        let mut patched = 0;
        for &clone in &self.fresh {
            let children: Box<dyn Iterator<Item = &mut Value>> = match self.heap.get_mut(clone)? {
                Node::Sequence(items) => Box::new(items.iter_mut()),
                Node::Mapping(mapping) => Box::new(mapping.values_mut()),
                Node::Callable(_) | Node::Frozen(_) => continue,
            };
            for child in children {
                let Value::BackRef(back_ref) = child else {
                    continue;
                };
                if let Some(&target) = self.visited.get(&back_ref.target()) {
                    if target != back_ref.target() {
                        *back_ref = back_ref.retarget(target);
                        patched += 1;
                    }
                }
            }
        }
        Ok(patched)
    }
}
