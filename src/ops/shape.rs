//! Node-kind classification and callable composition shared by merge and assign

use crate::model::{Callable, Composite, Node, Path, Value};
use crate::store::Heap;
use crate::Result;

/// Coarse kind of a value as seen by the combining walkers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    Scalar(&'static str),
    BackRef,
    Sequence,
    Mapping,
    Frozen,
    Callable,
}

impl Shape {
    pub(crate) fn of(heap: &Heap, value: &Value) -> Result<Shape> {
        Ok(match value {
            Value::Node(id) => match heap.get(*id)? {
                Node::Sequence(_) => Shape::Sequence,
                Node::Mapping(_) => Shape::Mapping,
                Node::Frozen(_) => Shape::Frozen,
                Node::Callable(_) => Shape::Callable,
            },
            Value::BackRef(_) => Shape::BackRef,
            scalar => Shape::Scalar(scalar.kind_name()),
        })
    }

    /// Sequence or mapping, frozen or not
    pub(crate) fn is_composite(&self) -> bool {
        matches!(self, Shape::Sequence | Shape::Mapping | Shape::Frozen)
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Shape::Scalar(kind) => kind,
            Shape::BackRef => "back reference",
            Shape::Sequence => "sequence",
            Shape::Mapping => "mapping",
            Shape::Frozen => "frozen node",
            Shape::Callable => "callable",
        }
    }
}

/// How the two results of a composed callable are combined
pub(crate) type Combine = fn(&mut Heap, &Value, &Value, &Path) -> Result<Value>;

/// Build a callable that evaluates both operands with the call's arguments
/// and combines the results under `path(...)`
///
/// A callable operand is invoked; any other operand is used as-is.
pub(crate) fn compose(heap: &mut Heap, a: &Value, b: &Value, path: &Path, combine: Combine) -> Value {
    let left = a.clone();
    let right = b.clone();
    let path = path.call();
    let callable = Callable::new(move |heap, args| {
        let left_result = evaluate(heap, &left, args)?;
        let right_result = evaluate(heap, &right, args)?;
        combine(heap, &left_result, &right_result, &path)
    })
    .named("composed")
    .capturing(vec![a.clone(), b.clone()]);
    heap.callable(callable)
}

fn evaluate(heap: &mut Heap, operand: &Value, args: &[Value]) -> Result<Value> {
    if heap.is_callable(operand) {
        heap.call(operand, args)
    } else {
        Ok(operand.clone())
    }
}

/// Clone the body of a mutable composite node
pub(crate) fn body_of(heap: &Heap, value: &Value) -> Result<Option<Composite>> {
    let Some(id) = value.as_node() else {
        return Ok(None);
    };
    Ok(match heap.get(id)? {
        Node::Sequence(items) => Some(Composite::Sequence(items.clone())),
        Node::Mapping(mapping) => Some(Composite::Mapping(mapping.clone())),
        Node::Frozen(_) | Node::Callable(_) => None,
    })
}

/// Clone the body of any composite node, frozen or not, for reading
pub(crate) fn contents_of(heap: &Heap, value: &Value) -> Result<Option<Composite>> {
    let Some(id) = value.as_node() else {
        return Ok(None);
    };
    Ok(match heap.get(id)? {
        Node::Sequence(items) | Node::Frozen(Composite::Sequence(items)) => {
            Some(Composite::Sequence(items.clone()))
        }
        Node::Mapping(mapping) | Node::Frozen(Composite::Mapping(mapping)) => {
            Some(Composite::Mapping(mapping.clone()))
        }
        Node::Callable(_) => None,
    })
}
