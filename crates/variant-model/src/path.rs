//! Property paths for addressing fields within a node
//!
//! Provides [`PropertyPath`], an order-independent route through a node's
//! field tree: named fields, array elements and array lengths.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Display token of the length segment
const LENGTH_TOKEN: &str = "$len";

/// One step of a [`PropertyPath`]
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PathSegment {
    /// Named field
    Field(String),
    /// Element of a sequence
    Index(usize),
    /// Length of the sequence addressed by the preceding segments
    Length,
}

/// Path within a node's field tree
///
/// # Examples
/// - `speed` → a top-level field
/// - `clips[2].start` → field `start` of the third element of `clips`
/// - `clips.$len` → the length of `clips`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyPath(Vec<PathSegment>);

impl PropertyPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Create path from a single field name
    #[inline]
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![PathSegment::Field(name.into())])
    }

    /// Empty path (the node itself)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Name of the innermost named field, if any
    ///
    /// For `clips[2].start` this is `start`; for `clips[2]` it is `clips`.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.0.iter().rev().find_map(|seg| match seg {
            PathSegment::Field(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Append a named field, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        self.with(PathSegment::Field(name.into()))
    }

    /// Append an element index, returning new path
    #[inline]
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    /// Append the length segment, returning new path
    #[inline]
    #[must_use]
    pub fn length(&self) -> Self {
        self.with(PathSegment::Length)
    }

    fn with(&self, segment: PathSegment) -> Self {
        let mut new = self.clone();
        new.0.push(segment);
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Check if this path is a strict ancestor of another
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PathSegment> {
        self.0.iter()
    }

    /// Whether the display form parses back to this exact path
    ///
    /// False for field names outside `[A-Za-z0-9_]` (such as `play-rate`) or
    /// a field literally named `$len`.
    #[must_use]
    pub fn has_text_form(&self) -> bool {
        self.to_string().parse::<Self>().is_ok_and(|parsed| parsed == *self)
    }
}

/// Whether `name` can appear as a field in a path's display form
#[must_use]
pub fn is_plain_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                PathSegment::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Length => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(LENGTH_TOKEN)?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for PropertyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for part in s.split('.') {
            if part.is_empty() {
                return Err(PathError::EmptySegment);
            }
            if part == LENGTH_TOKEN {
                segments.push(PathSegment::Length);
                continue;
            }

            // `name[1][2]` → Field(name), Index(1), Index(2)
            let (name, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if !is_plain_field_name(name) {
                return Err(PathError::InvalidSegment(part.to_string()));
            }
            segments.push(PathSegment::Field(name.to_string()));

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| PathError::InvalidSegment(part.to_string()))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| PathError::InvalidIndex(part.to_string()))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(PathError::InvalidSegment(part.to_string()));
                }
            }
        }

        Ok(Self(segments))
    }
}

impl From<Vec<PathSegment>> for PropertyPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl Default for PropertyPath {
    fn default() -> Self {
        Self::root()
    }
}

/// Serialized as the display string when it parses back losslessly,
/// otherwise as the explicit segment list
impl serde::Serialize for PropertyPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if self.has_text_form() {
            serializer.collect_str(self)
        } else {
            serializer.collect_seq(&self.0)
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum PathRepr {
    Text(String),
    Segments(Vec<PathSegment>),
}

impl<'de> serde::Deserialize<'de> for PropertyPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match PathRepr::deserialize(deserializer)? {
            PathRepr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            PathRepr::Segments(segments) => Ok(Self(segments)),
        }
    }
}

/// Errors related to property paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),

    /// Element index is not a number
    #[error("invalid element index in segment: {0}")]
    InvalidIndex(String),
}
