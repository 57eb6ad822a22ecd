//! Error types for the variant engine
//!
//! Everything here aborts the operation. Recoverable problems are reported
//! as diagnostics instead and never surface as an `Err`.

use variant_model::{AssetGuid, NodeHandle, StableId, StoreError};
use variant_ref::CorrespondenceError;
use variant_sync::SyncError;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    /// Variant container has no bookkeeping node
    #[error("no '{type_name}' bookkeeping node in container {container}")]
    MissingBookkeeping {
        container: AssetGuid,
        type_name: String,
    },

    /// Node is not part of a persisted container
    #[error("node {0} is not persistent")]
    NotPersistent(NodeHandle),

    /// Bookkeeping state has no base reference
    #[error("variant state has no base reference")]
    BaseAbsent,

    /// Base reference no longer resolves to a live node
    #[error("base {0} does not resolve to a live node")]
    BaseUnresolved(StableId),

    /// Persisted state could not be read
    #[error("corrupt variant state: {0}")]
    CorruptState(String),

    /// Node cannot serve as a base
    #[error("invalid base: {0}")]
    InvalidBase(String),

    /// Sync or record failed
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Store collaborator failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Correspondence bijection violated
    #[error("correspondence error: {0}")]
    Correspondence(#[from] CorrespondenceError),
}

impl VariantError {
    /// Whether the base graph needs attention rather than the variant
    #[inline]
    #[must_use]
    pub fn is_base_problem(&self) -> bool {
        matches!(
            self,
            Self::BaseAbsent | Self::BaseUnresolved(_) | Self::InvalidBase(_)
        )
    }
}

impl From<serde_json::Error> for VariantError {
    fn from(err: serde_json::Error) -> Self {
        Self::CorruptState(err.to_string())
    }
}

/// Result alias for engine operations
pub type Result<T, E = VariantError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_problems_are_classified() {
        assert!(VariantError::BaseAbsent.is_base_problem());
        assert!(!VariantError::CorruptState("x".into()).is_base_problem());
    }

    #[test]
    fn json_errors_become_corrupt_state() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = VariantError::from(err);
        assert!(matches!(err, VariantError::CorruptState(_)));
        assert!(err.to_string().starts_with("corrupt variant state"));
    }
}
