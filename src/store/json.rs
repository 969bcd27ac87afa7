//! Bridge between JSON documents and heap graphs

use super::Heap;
use crate::model::{Composite, Mapping, Node, NodeId, Path, Segment, Value};
use crate::{Error, Result};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// Largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Heap {
    /// Allocate a JSON document as a fresh, acyclic graph
    ///
    /// Object key order is preserved.
    pub fn import_json(&mut self, json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            JsonValue::String(s) => Value::Text(s.clone()),
            JsonValue::Array(items) => {
                let items: Vec<Value> = items.iter().map(|item| self.import_json(item)).collect();
                self.sequence(items)
            }
            JsonValue::Object(object) => {
                let entries: Mapping = object
                    .iter()
                    .map(|(key, value)| (key.clone(), self.import_json(value)))
                    .collect();
                Value::Node(self.alloc(Node::Mapping(entries)))
            }
        }
    }

    /// Render a graph as JSON
    ///
    /// Shared nodes are written out once per reference. Callables,
    /// back-references, cycles and non-finite numbers have no JSON form
    /// and fail with [`Error::Unrepresentable`].
    pub fn export_json(&self, value: &Value) -> Result<JsonValue> {
        let mut in_progress = HashSet::new();
        self.export_at(value, &mut Path::root(), &mut in_progress)
    }

    fn export_at(
        &self,
        value: &Value,
        path: &mut Path,
        in_progress: &mut HashSet<NodeId>,
    ) -> Result<JsonValue> {
        match value {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Number(n) => number_to_json(*n).ok_or_else(|| Error::Unrepresentable {
                path: path.clone(),
                what: format!("non-finite number {}", n),
            }),
            Value::Text(s) => Ok(JsonValue::String(s.clone())),
            Value::BackRef(back_ref) => Err(Error::Unrepresentable {
                path: path.clone(),
                what: format!("back reference '{}'", back_ref.id()),
            }),
            Value::Node(id) => {
                if !in_progress.insert(*id) {
                    return Err(Error::Unrepresentable {
                        path: path.clone(),
                        what: "cycle".to_string(),
                    });
                }
                let json = self.export_node(*id, path, in_progress)?;
                in_progress.remove(id);
                Ok(json)
            }
        }
    }

    fn export_node(
        &self,
        id: NodeId,
        path: &mut Path,
        in_progress: &mut HashSet<NodeId>,
    ) -> Result<JsonValue> {
        match self.get(id)? {
            Node::Sequence(items) | Node::Frozen(Composite::Sequence(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    path.push(Segment::Index(i));
                    out.push(self.export_at(item, path, in_progress)?);
                    path.pop();
                }
                Ok(JsonValue::Array(out))
            }
            Node::Mapping(mapping) | Node::Frozen(Composite::Mapping(mapping)) => {
                let mut out = serde_json::Map::new();
                for (key, item) in mapping.iter() {
                    path.push(Segment::Key(key.to_string()));
                    out.insert(key.to_string(), self.export_at(item, path, in_progress)?);
                    path.pop();
                }
                Ok(JsonValue::Object(out))
            }
            Node::Callable(_) => Err(Error::Unrepresentable {
                path: path.clone(),
                what: "callable".to_string(),
            }),
        }
    }
}

fn number_to_json(n: f64) -> Option<JsonValue> {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Some(JsonValue::from(n as i64));
    }
    serde_json::Number::from_f64(n).map(JsonValue::Number)
}
