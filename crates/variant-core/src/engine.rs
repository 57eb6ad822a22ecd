//! Variant engine entry points
//!
//! [`VariantEngine`] locates a variant's bookkeeping state, checks the
//! preconditions, runs the sync engine or the diff recorder and writes the
//! state back.

use crate::config::VariantConfig;
use crate::error::{Result, VariantError};
use crate::state::{find_bookkeeping, VariantState};
use variant_model::{NodeHandle, Store};
use variant_sync::{
    ApplyReport, Diagnostic, DiagnosticKind, DiagnosticSink, DiffRecorder, GraphPair, Level,
    RecordReport, StructuralSyncEngine, SyncOptions, TracingSink,
};

/// Bookkeeping node of a variant together with its loaded state
#[derive(Debug)]
struct Located {
    bookkeeping: NodeHandle,
    state: VariantState,
}

/// Applies, records and resets variants over a store
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = VariantEngine::new(&mut store, VariantConfig::default());
/// engine.record(variant_root)?;
/// engine.apply(variant_root)?;
/// ```
pub struct VariantEngine<'a, S: Store + ?Sized, D: DiagnosticSink = TracingSink> {
    store: &'a mut S,
    config: VariantConfig,
    sink: D,
}

impl<'a, S: Store + ?Sized> VariantEngine<'a, S, TracingSink> {
    /// Engine reporting through `tracing` at the configured level
    #[must_use]
    pub fn new(store: &'a mut S, config: VariantConfig) -> Self {
        let sink = TracingSink::new(config.diagnostic_level);
        Self::with_sink(store, config, sink)
    }
}

impl<'a, S: Store + ?Sized, D: DiagnosticSink> VariantEngine<'a, S, D> {
    /// Engine reporting to a custom sink
    #[must_use]
    pub fn with_sink(store: &'a mut S, config: VariantConfig, sink: D) -> Self {
        Self {
            store,
            config,
            sink,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &VariantConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &*self.store
    }

    #[inline]
    #[must_use]
    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Re-synchronize the variant with its base, then replay overrides
    ///
    /// # Errors
    /// Fails if the bookkeeping state is missing or corrupt, the base does
    /// not resolve, either graph is not persistent, or the store fails
    pub fn apply(&mut self, variant_root: NodeHandle) -> Result<ApplyReport> {
        let Located {
            bookkeeping,
            mut state,
        } = self.locate(variant_root)?;
        let graphs = self.graphs(&state, variant_root)?;
        self.progress("apply", format!("applying overrides to {}", graphs.variant_container));

        let options = SyncOptions::new(&self.config.bookkeeping_type, &self.sink);
        let report =
            StructuralSyncEngine::new(&mut *self.store, &mut state.customizations, graphs, options)
                .apply()?;

        state.save(&mut *self.store, bookkeeping)?;
        self.store.persist(variant_root)?;
        self.progress("apply", format!("{report:?}"));
        Ok(report)
    }

    /// Capture the variant's current deviations from its base
    ///
    /// # Errors
    /// Same preconditions as [`VariantEngine::apply`]
    pub fn record(&mut self, variant_root: NodeHandle) -> Result<RecordReport> {
        let Located {
            bookkeeping,
            mut state,
        } = self.locate(variant_root)?;
        let graphs = self.graphs(&state, variant_root)?;
        self.progress("record", format!("recording overrides of {}", graphs.variant_container));

        let options = SyncOptions::new(&self.config.bookkeeping_type, &self.sink);
        let report =
            DiffRecorder::new(&*self.store, &mut state.customizations, graphs, options).record()?;

        state.save(&mut *self.store, bookkeeping)?;
        self.progress("record", format!("{report:?}"));
        Ok(report)
    }

    /// Forget recorded deltas; the correspondence table is kept
    ///
    /// # Errors
    /// Fails if the bookkeeping state is missing or corrupt
    pub fn reset(&mut self, variant_root: NodeHandle) -> Result<()> {
        let Located {
            bookkeeping,
            mut state,
        } = self.locate(variant_root)?;
        state.customizations.clear_recorded();
        state.save(&mut *self.store, bookkeeping)?;
        self.progress("reset", "cleared recorded overrides");
        Ok(())
    }

    /// Read the persisted state of a variant
    ///
    /// # Errors
    /// Fails if the bookkeeping state is missing or corrupt
    pub fn state(&self, variant_root: NodeHandle) -> Result<VariantState> {
        Ok(self.locate(variant_root)?.state)
    }

    fn locate(&self, variant_root: NodeHandle) -> Result<Located> {
        let store = &*self.store;
        let container = store
            .container_of(variant_root)
            .ok_or(VariantError::NotPersistent(variant_root))?;
        let bookkeeping = find_bookkeeping(store, &container, &self.config.bookkeeping_type)
            .ok_or_else(|| VariantError::MissingBookkeeping {
                container,
                type_name: self.config.bookkeeping_type.clone(),
            })?;
        let state = VariantState::load(store, bookkeeping)?;
        Ok(Located { bookkeeping, state })
    }

    fn graphs(&self, state: &VariantState, variant_root: NodeHandle) -> Result<GraphPair> {
        let store = &*self.store;
        let base_id = state.base.id().ok_or(VariantError::BaseAbsent)?;
        let base_root = state
            .base
            .resolve(store)
            .ok_or(VariantError::BaseUnresolved(base_id))?;
        if store.container_of(base_root) == store.container_of(variant_root) {
            return Err(VariantError::InvalidBase(format!(
                "base {base_id} lives in the variant's own container"
            )));
        }
        Ok(GraphPair::new(store, base_root, variant_root)?)
    }

    fn progress(&self, step: &'static str, message: impl Into<String>) {
        self.sink.emit(Diagnostic::new(
            Level::Info,
            DiagnosticKind::Progress,
            step,
            message,
        ));
    }
}
