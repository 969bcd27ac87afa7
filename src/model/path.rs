//! Structural paths for traversal diagnostics

use std::fmt;

/// One step from a container into a child
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Mapping key
    Key(String),
    /// Sequence position
    Index(usize),
    /// Result of invoking a callable
    Call,
}

/// Location inside a value graph, rendered as `.field.sub[3](...)`
///
/// The root path renders as the empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// A new path extended by a key segment
    pub fn key(&self, key: &str) -> Self {
        self.with(Segment::Key(key.to_string()))
    }

    /// A new path extended by an index segment
    pub fn index(&self, index: usize) -> Self {
        self.with(Segment::Index(index))
    }

    /// A new path extended by a call segment
    pub fn call(&self) -> Self {
        self.with(Segment::Call)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn with(&self, segment: Segment) -> Self {
        let mut next = self.clone();
        next.push(segment);
        next
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, ".{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
            Segment::Call => write!(f, "(...)"),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
