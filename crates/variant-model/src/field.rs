//! Field kinds, values and the depth-first field cursor
//!
//! A node's fields form a tree. Collaborators expose it through
//! [`FieldWalk`], a pre-order cursor whose caller decides at every step
//! whether to descend into the current field's children.

use crate::id::StableId;
use crate::path::PropertyPath;
use serde::{Deserialize, Serialize};

/// Kind of a field, fixed by the node's schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Aggregate with child fields (struct or sequence)
    Container,
    /// Text
    String,
    /// Reference to another node
    Reference,
    /// Length of a sequence
    SequenceLength,
    /// Any other scalar or opaque structured value
    Leaf,
    /// Embedded polymorphic payload; not safely diffable or copyable
    Polymorphic,
}

impl FieldKind {
    /// Whether a walk may descend below a field of this kind
    #[inline]
    #[must_use]
    pub fn can_enter_children(self) -> bool {
        matches!(self, Self::Container)
    }
}

/// Value of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Containers carry no direct value
    Container,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Reference(Option<StableId>),
    Length(usize),
    Data(serde_json::Value),
    Polymorphic(serde_json::Value),
}

impl FieldValue {
    /// Kind implied by this value
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Container => FieldKind::Container,
            Self::String(_) => FieldKind::String,
            Self::Reference(_) => FieldKind::Reference,
            Self::Length(_) => FieldKind::SequenceLength,
            Self::Polymorphic(_) => FieldKind::Polymorphic,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Data(_) => FieldKind::Leaf,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_reference(&self) -> Option<Option<StableId>> {
        match self {
            Self::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Value equality where a NaN float equals any other NaN
    #[must_use]
    pub fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Node-level flags copied verbatim when a node is cloned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags {
    /// Hidden from hierarchy views
    #[serde(default)]
    pub hidden: bool,
    /// Not editable through the editor surface
    #[serde(default)]
    pub locked: bool,
    /// Never saved with the container
    #[serde(default)]
    pub transient: bool,
}

/// One field visited by a [`FieldWalk`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStep {
    pub path: PropertyPath,
    pub kind: FieldKind,
    pub value: FieldValue,
    /// Nesting depth; top-level fields are at depth 0
    pub depth: usize,
    /// Container plumbing rather than user data; never copied or diffed
    pub structural: bool,
}

/// Depth-first cursor over a snapshot of a node's fields
///
/// Mirrors a serialized-property iterator: every call to [`FieldWalk::next`]
/// decides whether the previously returned field's children are visited.
#[derive(Debug, Clone, Default)]
pub struct FieldWalk {
    steps: Vec<FieldStep>,
    pos: Option<usize>,
}

impl FieldWalk {
    /// Build a walk from steps in pre-order
    #[must_use]
    pub fn new(steps: Vec<FieldStep>) -> Self {
        Self { steps, pos: None }
    }

    /// Advance to the next field
    ///
    /// With `enter_children == false` the descendants of the current field
    /// are skipped. The flag is ignored on the first call.
    pub fn next(&mut self, enter_children: bool) -> Option<&FieldStep> {
        let next = match self.pos {
            None => 0,
            Some(current) if current >= self.steps.len() => return None,
            Some(current) => {
                let depth = self.steps[current].depth;
                let mut next = current + 1;
                if !enter_children {
                    while next < self.steps.len() && self.steps[next].depth > depth {
                        next += 1;
                    }
                }
                next
            }
        };

        if next >= self.steps.len() {
            self.pos = Some(self.steps.len());
            return None;
        }
        self.pos = Some(next);
        self.steps.get(next)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
