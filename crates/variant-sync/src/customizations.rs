//! Recorded customizations of a variant
//!
//! Everything the engine remembers between runs apart from the base
//! pointer: the correspondence table plus the added, removed and
//! overridden sets.

use crate::overrides::OverrideSet;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use variant_ref::{CorrespondenceTable, StableReference};

/// Ordered set of node references
pub type NodeSet = IndexSet<StableReference>;

/// Mapping table and recorded deltas of one variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customizations {
    /// Base ↔ variant node correspondence
    #[serde(default)]
    pub table: CorrespondenceTable,
    /// Variant nodes with no base counterpart
    #[serde(default)]
    pub added: NodeSet,
    /// Base nodes deliberately removed from the variant
    #[serde(default)]
    pub removed: NodeSet,
    /// Field values that differ from the base
    #[serde(default)]
    pub overrides: OverrideSet,
}

impl Customizations {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget recorded deltas, keeping the correspondence table
    pub fn clear_recorded(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.overrides.clear();
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.overrides.is_empty()
    }
}
