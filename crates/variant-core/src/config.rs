//! Engine configuration
//!
//! [`VariantConfig`] is plain serde data so front ends can load it from a
//! file. Every field has a default.

use serde::{Deserialize, Serialize};
use variant_sync::Level;

/// Default type name of the bookkeeping node
pub const DEFAULT_BOOKKEEPING_TYPE: &str = "VariantData";

/// Default suffix appended to the base name when deriving a variant
pub const DEFAULT_VARIANT_SUFFIX: &str = " Variant";

/// Override engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    /// Type name of the node holding the persisted variant state
    pub bookkeeping_type: String,
    /// Minimum level forwarded by the default diagnostic sink
    pub diagnostic_level: Level,
    /// Appended to the base name to name a derived variant
    pub variant_suffix: String,
}

impl VariantConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With bookkeeping node type name
    #[inline]
    #[must_use]
    pub fn with_bookkeeping_type(mut self, type_name: impl Into<String>) -> Self {
        self.bookkeeping_type = type_name.into();
        self
    }

    /// With minimum diagnostic level
    #[inline]
    #[must_use]
    pub fn with_diagnostic_level(mut self, level: Level) -> Self {
        self.diagnostic_level = level;
        self
    }

    /// With variant name suffix
    #[inline]
    #[must_use]
    pub fn with_variant_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.variant_suffix = suffix.into();
        self
    }
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            bookkeeping_type: DEFAULT_BOOKKEEPING_TYPE.to_string(),
            diagnostic_level: Level::Info,
            variant_suffix: DEFAULT_VARIANT_SUFFIX.to_string(),
        }
    }
}
