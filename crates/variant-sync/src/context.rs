//! Shared inputs of the sync engine and the diff recorder

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Level};
use crate::overrides::OverrideError;
use variant_model::{AssetGuid, AssetStore, NodeHandle, PropertyPath, StableId, StoreError};
use variant_ref::CorrespondenceError;

/// Base and variant roots with their containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphPair {
    pub base_root: NodeHandle,
    pub variant_root: NodeHandle,
    pub base_container: AssetGuid,
    pub variant_container: AssetGuid,
}

impl GraphPair {
    /// Resolve the containers of both roots
    ///
    /// # Errors
    /// Fails if either root is not part of a persisted container
    pub fn new<S: AssetStore + ?Sized>(
        store: &S,
        base_root: NodeHandle,
        variant_root: NodeHandle,
    ) -> Result<Self, SyncError> {
        let base_container = store
            .container_of(base_root)
            .ok_or(SyncError::NotPersistent(base_root))?;
        let variant_container = store
            .container_of(variant_root)
            .ok_or(SyncError::NotPersistent(variant_root))?;
        Ok(Self {
            base_root,
            variant_root,
            base_container,
            variant_container,
        })
    }
}

/// Options shared by sync and record
#[derive(Clone, Copy)]
pub struct SyncOptions<'a> {
    /// Type name of the bookkeeping node, excluded from every enumeration
    pub bookkeeping_type: &'a str,
    pub sink: &'a dyn DiagnosticSink,
}

impl<'a> SyncOptions<'a> {
    #[inline]
    #[must_use]
    pub fn new(bookkeeping_type: &'a str, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            bookkeeping_type,
            sink,
        }
    }

    /// Whether `node` is a bookkeeping node
    pub fn is_bookkeeping<S: AssetStore + ?Sized>(&self, store: &S, node: NodeHandle) -> bool {
        store.type_name(node).as_deref() == Some(self.bookkeeping_type)
    }

    /// Sub-nodes of `container` that carry user data
    ///
    /// Excludes the primary node and bookkeeping nodes.
    pub fn user_nodes<S: AssetStore + ?Sized>(
        &self,
        store: &S,
        container: &AssetGuid,
    ) -> Vec<NodeHandle> {
        store
            .enumerate_sub_nodes(container)
            .into_iter()
            .filter(|&node| !store.is_primary_node(node) && !self.is_bookkeeping(store, node))
            .collect()
    }

    pub(crate) fn emit(
        &self,
        level: Level,
        kind: DiagnosticKind,
        step: &'static str,
        message: impl Into<String>,
        node: Option<StableId>,
        path: Option<&PropertyPath>,
    ) {
        let mut diagnostic = Diagnostic::new(level, kind, step, message).with_node(node);
        if let Some(path) = path {
            diagnostic = diagnostic.with_path(path);
        }
        self.sink.emit(diagnostic);
    }
}

impl std::fmt::Debug for SyncOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOptions")
            .field("bookkeeping_type", &self.bookkeeping_type)
            .finish_non_exhaustive()
    }
}

/// Fatal sync and record failures
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Node is not part of a persisted container
    #[error("node {0} is not persistent")]
    NotPersistent(NodeHandle),

    /// Store collaborator failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Correspondence bijection would be violated
    #[error("correspondence error: {0}")]
    Correspondence(#[from] CorrespondenceError),

    /// Override could not be encoded
    #[error("override error: {0}")]
    Override(#[from] OverrideError),
}
