//! Structural synchronization of a variant with its base
//!
//! [`StructuralSyncEngine::apply`] runs the four steps in their required
//! order: map and clone sub-nodes, collect orphans, copy base fields, then
//! replay recorded overrides on top.

use crate::context::{GraphPair, SyncError, SyncOptions};
use crate::customizations::Customizations;
use crate::diagnostics::{DiagnosticKind, Level};
use crate::overrides::OverridePayload;
use std::collections::BTreeSet;
use variant_model::{AssetStore, FieldKind, FieldValue, NodeHandle, Store, StoreError};
use variant_ref::StableReference;

/// Counters for one `apply`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Base sub-nodes cloned into the variant
    pub cloned: usize,
    /// Base sub-nodes left out because they were removed
    pub tombstoned: usize,
    /// Variant sub-nodes destroyed as orphans
    pub orphans_removed: usize,
    /// Mapped pairs whose fields were copied
    pub pairs_copied: usize,
    /// Overrides written to the variant
    pub overrides_applied: usize,
    /// Overrides skipped with an error diagnostic
    pub overrides_skipped: usize,
}

/// Drives a variant towards its base while keeping recorded customizations
pub struct StructuralSyncEngine<'a, S: Store + ?Sized> {
    store: &'a mut S,
    custom: &'a mut Customizations,
    graphs: GraphPair,
    options: SyncOptions<'a>,
}

impl<'a, S: Store + ?Sized> StructuralSyncEngine<'a, S> {
    #[must_use]
    pub fn new(
        store: &'a mut S,
        custom: &'a mut Customizations,
        graphs: GraphPair,
        options: SyncOptions<'a>,
    ) -> Self {
        Self {
            store,
            custom,
            graphs,
            options,
        }
    }

    /// Run every step in order
    ///
    /// Field copy must see the final set of clones, and overrides must land
    /// after the base values they replace.
    ///
    /// # Errors
    /// Returns error on store failures or a bijection violation
    pub fn apply(&mut self) -> Result<ApplyReport, SyncError> {
        let mut report = ApplyReport::default();
        self.sync_structure(&mut report)?;
        report.orphans_removed = self.remove_orphans()?;
        report.pairs_copied = self.copy_base_fields()?;
        let (applied, skipped) = self.replay_overrides()?;
        report.overrides_applied = applied;
        report.overrides_skipped = skipped;
        Ok(report)
    }

    /// Map every base sub-node to a variant sub-node, cloning as needed
    ///
    /// Nodes in the removed set get a tombstone instead of a clone. Running
    /// this twice without intervening changes creates nothing the second time.
    ///
    /// # Errors
    /// Returns error on store failures or a bijection violation
    pub fn sync_structure(&mut self, report: &mut ApplyReport) -> Result<(), SyncError> {
        const STEP: &str = "sync_structure";
        let store = &mut *self.store;
        let table = &mut self.custom.table;

        table.ensure(
            StableReference::identify(store, self.graphs.base_root),
            StableReference::identify(store, self.graphs.variant_root),
        )?;

        let base_nodes = self.options.user_nodes(store, &self.graphs.base_container);
        self.options.emit(
            Level::Info,
            DiagnosticKind::Progress,
            STEP,
            format!("mapping {} base sub-nodes", base_nodes.len()),
            None,
            None,
        );

        for node in base_nodes {
            let source = StableReference::identify(store, node);
            let Some(source_id) = source.id() else {
                continue;
            };

            if self.custom.removed.contains(&source) {
                table.upsert(source, StableReference::absent())?;
                report.tombstoned += 1;
                continue;
            }

            let current = table
                .by_source(&source_id)
                .map(|m| m.target.clone())
                .unwrap_or_default();
            if current.resolve(store).is_some() {
                continue;
            }

            let clone = store.instantiate_copy(node)?;
            let flags = store.flags(node)?;
            store.set_flags(clone, flags)?;
            store.add_sub_node(&self.graphs.variant_container, clone)?;
            let target = StableReference::identify(store, clone);
            self.options.emit(
                Level::Debug,
                DiagnosticKind::Progress,
                STEP,
                format!("cloned {source} as {target}"),
                Some(source_id),
                None,
            );
            table.upsert(source, target)?;
            report.cloned += 1;
        }
        Ok(())
    }

    /// Destroy variant sub-nodes that are neither mapped nor added
    ///
    /// # Errors
    /// Returns error on store failures
    pub fn remove_orphans(&mut self) -> Result<usize, SyncError> {
        const STEP: &str = "remove_orphans";
        let store = &mut *self.store;
        let mut removed = 0;

        for node in self.options.user_nodes(store, &self.graphs.variant_container) {
            let Some(id) = store.stable_id(node) else {
                continue;
            };
            let reference = StableReference::from_id(id);
            if self.custom.added.contains(&reference) || self.custom.table.contains_target(&id) {
                continue;
            }
            self.options.emit(
                Level::Debug,
                DiagnosticKind::Progress,
                STEP,
                format!("destroying orphan {id}"),
                Some(id),
                None,
            );
            store.remove_sub_node(node)?;
            store.destroy(node)?;
            removed += 1;
        }
        self.options.emit(
            Level::Info,
            DiagnosticKind::Progress,
            STEP,
            format!("destroyed {removed} orphans"),
            None,
            None,
        );
        Ok(removed)
    }

    /// Copy every base field onto its mapped variant node
    ///
    /// Returns the number of pairs copied.
    ///
    /// # Errors
    /// Returns error on store failures
    pub fn copy_base_fields(&mut self) -> Result<usize, SyncError> {
        const STEP: &str = "copy_base_fields";
        let pairs: Vec<(NodeHandle, NodeHandle, StableReference)> = {
            let store = &*self.store;
            self.custom
                .table
                .iter()
                .filter_map(|m| {
                    Some((m.source.resolve(store)?, m.target.resolve(store)?, m.source.clone()))
                })
                .collect()
        };

        for (source, target, source_ref) in &pairs {
            self.options.emit(
                Level::Debug,
                DiagnosticKind::Progress,
                STEP,
                format!("{source_ref} --> {}", StableReference::identify(&*self.store, *target)),
                source_ref.id(),
                None,
            );
            self.copy_fields(*source, *target, source_ref)?;
            self.store.persist(*target)?;
        }
        Ok(pairs.len())
    }

    fn copy_fields(
        &mut self,
        source: NodeHandle,
        target: NodeHandle,
        source_ref: &StableReference,
    ) -> Result<(), SyncError> {
        const STEP: &str = "copy_base_fields";
        let mut walk = self.store.iterate(source)?;
        let mut enter = true;

        while let Some(step) = walk.next(enter) {
            if step.structural {
                enter = false;
                continue;
            }
            enter = step.kind.can_enter_children();

            let Some(target_kind) = self.store.kind_of(target, &step.path) else {
                continue;
            };
            if target_kind != step.kind {
                self.options.emit(
                    Level::Warn,
                    DiagnosticKind::KindMismatch,
                    STEP,
                    format!("base is {:?}, variant is {target_kind:?}", step.kind),
                    source_ref.id(),
                    Some(&step.path),
                );
                enter = false;
                continue;
            }

            let value = match step.kind {
                FieldKind::Container => continue,
                FieldKind::Polymorphic => {
                    self.options.emit(
                        Level::Warn,
                        DiagnosticKind::PolymorphicSkipped,
                        STEP,
                        "skipping polymorphic field",
                        source_ref.id(),
                        Some(&step.path),
                    );
                    continue;
                }
                FieldKind::Reference => {
                    let base = StableReference::from(step.value.as_reference().flatten());
                    FieldValue::Reference(self.custom.table.correspond(&base).id())
                }
                FieldKind::String | FieldKind::SequenceLength | FieldKind::Leaf => {
                    step.value.clone()
                }
            };

            self.options.emit(
                Level::Debug,
                DiagnosticKind::Field,
                STEP,
                format!("-- {} ({:?}): {value:?}", step.path, step.kind),
                source_ref.id(),
                Some(&step.path),
            );
            match self.store.set(target, &step.path, value) {
                Ok(()) => {}
                Err(e @ StoreError::KindMismatch { .. }) => {
                    self.options.emit(
                        Level::Warn,
                        DiagnosticKind::KindMismatch,
                        STEP,
                        e.to_string(),
                        source_ref.id(),
                        Some(&step.path),
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Write recorded overrides onto the variant
    ///
    /// Unresolvable overrides are reported and skipped. Returns
    /// `(applied, skipped)`.
    ///
    /// # Errors
    /// Returns error on store failures other than a rejected value
    pub fn replay_overrides(&mut self) -> Result<(usize, usize), SyncError> {
        const STEP: &str = "replay_overrides";
        let store = &mut *self.store;
        let table = &self.custom.table;
        let options = self.options;
        let mut touched = BTreeSet::new();
        let (mut applied, mut skipped) = (0, 0);

        for ov in &self.custom.overrides {
            let fail = |kind: DiagnosticKind, message: String| {
                options.emit(Level::Error, kind, STEP, message, ov.source.id(), Some(&ov.path));
            };

            let target = table.correspond(&ov.source);
            let Some(node) = target.resolve(store) else {
                fail(
                    DiagnosticKind::UnresolvedTarget,
                    format!("no variant node for {}", ov.source),
                );
                skipped += 1;
                continue;
            };

            if store.container_of(node) != Some(self.graphs.variant_container) {
                fail(
                    DiagnosticKind::OutsideVariant,
                    format!("{target} is not part of the variant"),
                );
                skipped += 1;
                continue;
            }

            let (Some(kind), Some(current)) =
                (store.kind_of(node, &ov.path), store.get(node, &ov.path))
            else {
                fail(
                    DiagnosticKind::MissingPath,
                    format!("property not found on {target}"),
                );
                skipped += 1;
                continue;
            };

            let value = match (&ov.payload, kind) {
                (OverridePayload::Reference(r), FieldKind::Reference) => {
                    FieldValue::Reference(table.correspond(r).id())
                }
                (OverridePayload::Scalar(blob), kind) if kind != FieldKind::Reference => {
                    match blob.decode(&current) {
                        Ok(value) => value,
                        Err(e) => {
                            fail(DiagnosticKind::DecodeFailed, e.to_string());
                            skipped += 1;
                            continue;
                        }
                    }
                }
                (_, kind) => {
                    fail(
                        DiagnosticKind::PayloadMismatch,
                        format!("payload does not fit {kind:?} field"),
                    );
                    skipped += 1;
                    continue;
                }
            };

            options.emit(
                Level::Debug,
                DiagnosticKind::Field,
                STEP,
                format!("set {} = {value:?} on {target}", ov.path),
                ov.source.id(),
                Some(&ov.path),
            );
            match store.set(node, &ov.path, value) {
                Ok(()) => {
                    applied += 1;
                    touched.insert(node);
                }
                Err(e @ StoreError::KindMismatch { .. }) => {
                    fail(DiagnosticKind::PayloadMismatch, e.to_string());
                    skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        for node in touched {
            store.persist(node)?;
        }
        options.emit(
            Level::Info,
            DiagnosticKind::Progress,
            STEP,
            format!("applied {applied} overrides, skipped {skipped}"),
            None,
            None,
        );
        Ok((applied, skipped))
    }
}
