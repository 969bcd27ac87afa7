//! Heap node kinds

use super::Value;
use crate::store::Heap;
use crate::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered, string-keyed collection of values
///
/// Overwriting a key keeps its original position. Lookups go through a
/// key-to-position index; removal shifts the later entries down.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.position(key).map(move |i| &mut self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or overwrite, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.entries.remove(i);
        for (key, _) in &self.entries[i..] {
            if let Some(position) = self.index.get_mut(key) {
                *position -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}

/// Signature of a native callable
pub type NativeFn = dyn Fn(&mut Heap, &[Value]) -> Result<Value> + Send + Sync;

/// An opaque, invocable function value
///
/// `captures` lists the values the function closes over that live in the
/// heap; the collector keeps them alive for as long as the callable is.
#[derive(Clone)]
pub struct Callable {
    name: Option<String>,
    func: Arc<NativeFn>,
    captures: Vec<Value>,
}

impl Callable {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut Heap, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Callable {
            name: None,
            func: Arc::new(func),
            captures: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare heap values this function holds on to
    pub fn capturing(mut self, captures: Vec<Value>) -> Self {
        self.captures = captures;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn captures(&self) -> &[Value] {
        &self.captures
    }

    pub(crate) fn func(&self) -> Arc<NativeFn> {
        Arc::clone(&self.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("captures", &self.captures.len())
            .finish()
    }
}

/// Body of a composite node
#[derive(Clone, Debug, PartialEq)]
pub enum Composite {
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

impl Composite {
    /// Direct children in traversal order
    pub fn children(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Composite::Sequence(items) => Box::new(items.iter()),
            Composite::Mapping(mapping) => Box::new(mapping.values()),
        }
    }
}

/// A node stored in the heap
#[derive(Clone, Debug)]
pub enum Node {
    Sequence(Vec<Value>),
    Mapping(Mapping),
    Callable(Callable),
    /// Shared by contract, never copied or merged
    Frozen(Composite),
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
            Node::Callable(_) => "callable",
            Node::Frozen(Composite::Sequence(_)) => "frozen sequence",
            Node::Frozen(Composite::Mapping(_)) => "frozen mapping",
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Node::Frozen(_))
    }

    /// Values this node owns: children for composites, captures for callables
    pub fn owned(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Node::Sequence(items) => Box::new(items.iter()),
            Node::Mapping(mapping) => Box::new(mapping.values()),
            Node::Callable(callable) => Box::new(callable.captures().iter()),
            Node::Frozen(body) => body.children(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_keeps_insertion_order() {
        let mut mapping = Mapping::new();
        mapping.insert("b", Value::from(1));
        mapping.insert("a", Value::from(2));
        mapping.insert("c", Value::from(3));
        let keys: Vec<_> = mapping.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_mapping_overwrite_keeps_position() {
        let mut mapping: Mapping = [("x", Value::from(1)), ("y", Value::from(2))]
            .into_iter()
            .collect();
        let previous = mapping.insert("x", Value::from("new"));
        assert_eq!(previous, Some(Value::from(1)));
        assert_eq!(mapping.keys().next(), Some("x"));
        assert_eq!(mapping.get("x"), Some(&Value::from("new")));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_mapping_remove() {
        let mut mapping: Mapping = [("x", Value::from(1))].into_iter().collect();
        assert_eq!(mapping.remove("x"), Some(Value::from(1)));
        assert!(mapping.is_empty());
        assert_eq!(mapping.remove("x"), None);
    }

    #[test]
    fn test_mapping_remove_shifts_later_keys() {
        let mut mapping: Mapping = [("a", Value::from(1)), ("b", Value::from(2)), ("c", Value::from(3))]
            .into_iter()
            .collect();
        mapping.remove("a");

        assert_eq!(mapping.get("b"), Some(&Value::from(2)));
        assert_eq!(mapping.get("c"), Some(&Value::from(3)));
        mapping.insert("b", Value::from(20));
        mapping.insert("d", Value::from(4));
        assert_eq!(mapping.keys().collect::<Vec<_>>(), ["b", "c", "d"]);
        assert_eq!(mapping.get("b"), Some(&Value::from(20)));
    }

    #[test]
    fn test_mapping_many_keys() {
        let mapping: Mapping = (0..2000).map(|i| (format!("k{}", i), Value::from(i))).collect();
        assert_eq!(mapping.len(), 2000);
        assert_eq!(mapping.get("k1999"), Some(&Value::from(1999)));
        assert!(mapping.contains_key("k0"));
        assert!(!mapping.contains_key("k2000"));
    }

    #[test]
    fn test_callable_owned_values_are_captures() {
        let callable = Callable::new(|_, _| Ok(Value::Null)).capturing(vec![Value::from(7)]);
        let node = Node::Callable(callable);
        assert_eq!(node.owned().count(), 1);
        assert_eq!(node.kind_name(), "callable");
    }
}
