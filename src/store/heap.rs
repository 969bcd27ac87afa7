//! Generational arena holding every node of a value graph
//!
//! Slots are addressed by [`NodeId`]. Freeing a slot bumps its generation,
//! so every handle still naming the old node goes stale instead of silently
//! pointing at whatever is allocated there next. This is the liveness check
//! behind back-references: a back-reference is dangling exactly when its
//! target handle is stale.

use crate::model::{BackRef, Callable, Composite, Mapping, Node, NodeId, Path, Value};
use crate::{Error, Result};
use std::fmt;
use tracing::debug;

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Counters reported by [`Heap::collect`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Nodes reachable from the roots
    pub marked: usize,
    /// Nodes reclaimed by this pass
    pub reclaimed: usize,
}

/// Arena of graph nodes
#[derive(Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Store a node and return its handle
    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(index, 0)
    }

    /// Whether `id` still names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.slot(id)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(Error::Reclaimed { node: id })
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        match self.slots.get_mut(id.index() as usize) {
            Some(slot) if slot.generation == id.generation() => {
                slot.node.as_mut().ok_or(Error::Reclaimed { node: id })
            }
            _ => Err(Error::Reclaimed { node: id }),
        }
    }

    /// Reclaim a single node, returning its body
    ///
    /// Every outstanding handle to it, strong or back-reference, goes stale.
    pub fn free(&mut self, id: NodeId) -> Result<Node> {
        let node = self.get_mut(id)?;
        let node = std::mem::replace(node, Node::Sequence(Vec::new()));
        self.release(id.index());
        Ok(node)
    }

    /// Reclaim every still-live node in `ids`, returning how many were freed
    ///
    /// Used to roll back the nodes a failed walk allocated.
    pub fn discard(&mut self, ids: impl IntoIterator<Item = NodeId>) -> usize {
        let mut freed = 0;
        for id in ids {
            if self.contains(id) {
                self.release(id.index());
                freed += 1;
            }
        }
        freed
    }

    // === Constructors ===

    pub fn sequence(&mut self, items: impl IntoIterator<Item = Value>) -> Value {
        Value::Node(self.alloc(Node::Sequence(items.into_iter().collect())))
    }

    pub fn mapping<K: Into<String>>(&mut self, entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Node(self.alloc(Node::Mapping(entries.into_iter().collect())))
    }

    pub fn callable(&mut self, callable: Callable) -> Value {
        Value::Node(self.alloc(Node::Callable(callable)))
    }

    /// Shorthand for an anonymous callable with no captures
    pub fn function<F>(&mut self, func: F) -> Value
    where
        F: Fn(&mut Heap, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.callable(Callable::new(func))
    }

    pub fn frozen_sequence(&mut self, items: impl IntoIterator<Item = Value>) -> Value {
        let body = Composite::Sequence(items.into_iter().collect());
        Value::Node(self.alloc(Node::Frozen(body)))
    }

    pub fn frozen_mapping<K: Into<String>>(
        &mut self,
        entries: impl IntoIterator<Item = (K, Value)>,
    ) -> Value {
        let body = Composite::Mapping(entries.into_iter().collect());
        Value::Node(self.alloc(Node::Frozen(body)))
    }

    /// Build a mapping whose body can refer to the mapping itself
    ///
    /// `build` receives the handle of the (still empty) mapping; the entries
    /// it returns are then added to it.
    pub fn rec_mapping<F>(&mut self, build: F) -> Result<Value>
    where
        F: FnOnce(&mut Heap, NodeId) -> Result<Mapping>,
    {
        let id = self.alloc(Node::Mapping(Mapping::new()));
        let body = build(self, id)?;
        for (key, value) in body.iter() {
            self.insert(id, key, value.clone())?;
        }
        Ok(Value::Node(id))
    }

    /// Build a sequence whose items can refer to the sequence itself
    pub fn rec_sequence<F>(&mut self, build: F) -> Result<Value>
    where
        F: FnOnce(&mut Heap, NodeId) -> Result<Vec<Value>>,
    {
        let id = self.alloc(Node::Sequence(Vec::new()));
        for item in build(self, id)? {
            self.push(id, item)?;
        }
        Ok(Value::Node(id))
    }

    // === Mutation ===

    pub fn push(&mut self, id: NodeId, value: Value) -> Result<()> {
        match self.get_mut(id)? {
            Node::Sequence(items) => {
                items.push(value);
                Ok(())
            }
            Node::Frozen(_) => Err(Error::Frozen { node: id }),
            other => Err(Error::KindMismatch {
                node: id,
                expected: "sequence",
                found: other.kind_name(),
            }),
        }
    }

    /// Insert or overwrite a mapping entry, returning the previous value
    pub fn insert(&mut self, id: NodeId, key: &str, value: Value) -> Result<Option<Value>> {
        match self.get_mut(id)? {
            Node::Mapping(mapping) => Ok(mapping.insert(key, value)),
            Node::Frozen(_) => Err(Error::Frozen { node: id }),
            other => Err(Error::KindMismatch {
                node: id,
                expected: "mapping",
                found: other.kind_name(),
            }),
        }
    }

    /// Overwrite a sequence element; `index == len` appends
    pub fn set_index(&mut self, id: NodeId, index: usize, value: Value) -> Result<Option<Value>> {
        match self.get_mut(id)? {
            Node::Sequence(items) if index < items.len() => {
                Ok(Some(std::mem::replace(&mut items[index], value)))
            }
            Node::Sequence(items) if index == items.len() => {
                items.push(value);
                Ok(None)
            }
            Node::Sequence(items) => Err(Error::IndexOutOfRange {
                node: id,
                index,
                len: items.len(),
            }),
            Node::Frozen(_) => Err(Error::Frozen { node: id }),
            other => Err(Error::KindMismatch {
                node: id,
                expected: "sequence",
                found: other.kind_name(),
            }),
        }
    }

    /// Mark a sequence or mapping immutable
    ///
    /// Only this node is frozen. Its children are assumed to be immutable
    /// too, but that is the caller's contract and is not enforced.
    pub fn freeze(&mut self, id: NodeId) -> Result<()> {
        let node = self.get_mut(id)?;
        let body = match node {
            Node::Sequence(items) => Composite::Sequence(std::mem::take(items)),
            Node::Mapping(mapping) => Composite::Mapping(std::mem::take(mapping)),
            Node::Frozen(_) => return Ok(()),
            Node::Callable(_) => {
                return Err(Error::KindMismatch {
                    node: id,
                    expected: "sequence or mapping",
                    found: "callable",
                })
            }
        };
        *node = Node::Frozen(body);
        Ok(())
    }

    pub fn is_frozen(&self, id: NodeId) -> bool {
        self.get(id).map(Node::is_frozen).unwrap_or(false)
    }

    // === Back-references ===

    /// Create a back-reference to a live node
    pub fn back_ref(&self, target: NodeId, id: impl Into<String>) -> Result<Value> {
        self.get(target)?;
        Ok(Value::BackRef(BackRef::new(target, id)))
    }

    /// Follow a back-reference to its target
    pub fn resolve(&self, back_ref: &BackRef) -> Result<NodeId> {
        let target = back_ref.target();
        if self.contains(target) {
            Ok(target)
        } else {
            Err(Error::ReclaimedTarget {
                path: Path::root(),
                target,
            })
        }
    }

    // === Navigation ===

    /// Look up a mapping entry, frozen or not
    pub fn field(&self, value: &Value, key: &str) -> Option<&Value> {
        match self.get(value.as_node()?).ok()? {
            Node::Mapping(mapping) | Node::Frozen(Composite::Mapping(mapping)) => mapping.get(key),
            _ => None,
        }
    }

    /// Look up a sequence element, frozen or not
    pub fn element(&self, value: &Value, index: usize) -> Option<&Value> {
        match self.get(value.as_node()?).ok()? {
            Node::Sequence(items) | Node::Frozen(Composite::Sequence(items)) => items.get(index),
            _ => None,
        }
    }

    /// Number of direct children of a composite value
    pub fn child_count(&self, value: &Value) -> Option<usize> {
        match self.get(value.as_node()?).ok()? {
            Node::Sequence(items) | Node::Frozen(Composite::Sequence(items)) => Some(items.len()),
            Node::Mapping(mapping) | Node::Frozen(Composite::Mapping(mapping)) => {
                Some(mapping.len())
            }
            Node::Callable(_) => None,
        }
    }

    /// Invoke a callable value
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        let func = match callee {
            Value::Node(id) => match self.get(*id)? {
                Node::Callable(callable) => callable.func(),
                _ => return Err(Error::NotCallable { path: Path::root() }),
            },
            _ => return Err(Error::NotCallable { path: Path::root() }),
        };
        func(self, args)
    }

    pub fn is_callable(&self, value: &Value) -> bool {
        value
            .as_node()
            .and_then(|id| self.get(id).ok())
            .map_or(false, |node| matches!(node, Node::Callable(_)))
    }

    // === Collection ===

    /// Reclaim every node not reachable from `roots`
    ///
    /// Owning edges are `Value::Node` children and callable captures.
    /// Back-references are not followed, so a node kept only by
    /// back-references is reclaimed and those back-references dangle.
    pub fn collect(&mut self, roots: &[Value]) -> CollectStats {
        let mut marked = vec![false; self.slots.len()];
        let mut stack: Vec<NodeId> = roots.iter().filter_map(Value::as_node).collect();
        let mut stats = CollectStats::default();

        while let Some(id) = stack.pop() {
            let Ok(node) = self.get(id) else {
                continue;
            };
            let index = id.index() as usize;
            if marked[index] {
                continue;
            }
            marked[index] = true;
            stats.marked += 1;
            stack.extend(node.owned().filter_map(Value::as_node));
        }

        for (index, is_marked) in marked.into_iter().enumerate() {
            if !is_marked && self.slots[index].node.is_some() {
                self.release(index as u32);
                stats.reclaimed += 1;
            }
        }

        debug!(
            marked = stats.marked,
            reclaimed = stats.reclaimed,
            live = self.live,
            "heap collected"
        );
        stats
    }

    // === Internal helpers ===

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation() && slot.node.is_some())
    }

    fn release(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("live", &self.live)
            .field("capacity", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_get() {
        let mut heap = Heap::new();
        let seq = heap.sequence([Value::from(1), Value::from(2)]);
        let id = seq.as_node().unwrap();

        assert_eq!(heap.len(), 1);
        assert!(matches!(heap.get(id).unwrap(), Node::Sequence(items) if items.len() == 2));
        assert_eq!(heap.element(&seq, 1), Some(&Value::from(2)));
    }

    #[test]
    fn test_free_makes_handles_stale() {
        let mut heap = Heap::new();
        let id = heap.alloc(Node::Mapping(Mapping::new()));
        heap.free(id).unwrap();

        assert!(!heap.contains(id));
        assert!(matches!(heap.get(id), Err(Error::Reclaimed { .. })));

        // The slot is reused under a new generation
        let reused = heap.alloc(Node::Sequence(Vec::new()));
        assert_eq!(reused.index(), id.index());
        assert_ne!(reused, id);
        assert!(!heap.contains(id));
        assert!(heap.contains(reused));
    }

    #[test]
    fn test_discard_skips_stale_handles() {
        let mut heap = Heap::new();
        let a = heap.alloc(Node::Sequence(Vec::new()));
        let b = heap.alloc(Node::Sequence(Vec::new()));
        heap.free(a).unwrap();

        assert_eq!(heap.discard([a, b, b]), 1);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_frozen_rejects_mutation() {
        let mut heap = Heap::new();
        let value = heap.mapping([("a", Value::from(1))]);
        let id = value.as_node().unwrap();
        heap.freeze(id).unwrap();

        assert!(heap.is_frozen(id));
        assert!(matches!(
            heap.insert(id, "b", Value::Null),
            Err(Error::Frozen { .. })
        ));
        // Reads still work through the frozen body
        assert_eq!(heap.field(&value, "a"), Some(&Value::from(1)));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut heap = Heap::new();
        let seq = heap.sequence([]);
        let err = heap.insert(seq.as_node().unwrap(), "k", Value::Null).unwrap_err();
        assert!(matches!(
            err,
            Error::KindMismatch {
                expected: "mapping",
                found: "sequence",
                ..
            }
        ));
    }

    #[test]
    fn test_set_index() {
        let mut heap = Heap::new();
        let seq = heap.sequence([Value::from(1)]);
        let id = seq.as_node().unwrap();

        assert_eq!(heap.set_index(id, 0, Value::from(9)).unwrap(), Some(Value::from(1)));
        assert_eq!(heap.set_index(id, 1, Value::from(10)).unwrap(), None);
        assert!(matches!(
            heap.set_index(id, 5, Value::Null),
            Err(Error::IndexOutOfRange { len: 2, .. })
        ));
    }

    #[test]
    fn test_back_ref_resolves_while_target_owned() {
        let mut heap = Heap::new();
        let parent = heap
            .rec_mapping(|heap, me| {
                let up = heap.back_ref(me, "parent")?;
                let child = heap.mapping([("parent", up)]);
                Ok([("child", child)].into_iter().collect())
            })
            .unwrap();

        let child = heap.field(&parent, "child").unwrap().clone();
        let back_ref = heap.field(&child, "parent").unwrap().as_back_ref().unwrap().clone();
        assert_eq!(back_ref.id(), "parent");
        assert_eq!(heap.resolve(&back_ref).unwrap(), parent.as_node().unwrap());
    }

    #[test]
    fn test_collect_does_not_trace_back_refs() {
        let mut heap = Heap::new();
        let target = heap.mapping([("x", Value::from(1))]);
        let back_ref = heap.back_ref(target.as_node().unwrap(), "t").unwrap();
        let holder = heap.sequence([back_ref.clone()]);

        let stats = heap.collect(&[holder.clone()]);
        assert_eq!(stats.marked, 1);
        assert_eq!(stats.reclaimed, 1);

        let back_ref = back_ref.as_back_ref().unwrap();
        assert!(matches!(
            heap.resolve(back_ref),
            Err(Error::ReclaimedTarget { .. })
        ));
    }

    #[test]
    fn test_collect_keeps_callable_captures() {
        let mut heap = Heap::new();
        let captured = heap.mapping([("n", Value::from(1))]);
        let callable = Callable::new(|_, _| Ok(Value::Null)).capturing(vec![captured.clone()]);
        let func = heap.callable(callable);

        let stats = heap.collect(&[func]);
        assert_eq!(stats.reclaimed, 0);
        assert!(heap.contains(captured.as_node().unwrap()));
    }

    #[test]
    fn test_call() {
        let mut heap = Heap::new();
        let double = heap.function(|_, args| {
            let n = args.first().and_then(Value::as_number).unwrap_or_default();
            Ok(Value::from(n * 2.0))
        });

        assert!(heap.is_callable(&double));
        assert_eq!(heap.call(&double, &[Value::from(21)]).unwrap(), Value::from(42));
        assert!(matches!(
            heap.call(&Value::from(1), &[]),
            Err(Error::NotCallable { .. })
        ));
    }
}
