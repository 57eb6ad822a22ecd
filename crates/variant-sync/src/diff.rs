//! Recording a variant's customizations against its base
//!
//! [`DiffRecorder::record`] rebuilds the added, removed and override sets
//! from the live state of both graphs. It reads the store only.

use crate::context::{GraphPair, SyncError, SyncOptions};
use crate::customizations::{Customizations, NodeSet};
use crate::diagnostics::{DiagnosticKind, Level};
use crate::overrides::PropertyOverride;
use variant_model::{FieldKind, FieldValue, NodeHandle, Store};
use variant_ref::StableReference;

/// Counters for one `record`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordReport {
    pub added: usize,
    pub removed: usize,
    pub overrides: usize,
}

/// Computes the delta between a variant and its base
pub struct DiffRecorder<'a, S: Store + ?Sized> {
    store: &'a S,
    custom: &'a mut Customizations,
    graphs: GraphPair,
    options: SyncOptions<'a>,
}

impl<'a, S: Store + ?Sized> DiffRecorder<'a, S> {
    #[must_use]
    pub fn new(
        store: &'a S,
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
    /// # Errors
    /// Returns error if a captured value cannot be encoded
    pub fn record(&mut self) -> Result<RecordReport, SyncError> {
        let added = self.find_added();
        let removed = self.find_removed();
        let overrides = self.find_property_overrides()?;
        Ok(RecordReport {
            added,
            removed,
            overrides,
        })
    }

    /// Replace the added set with variant nodes that have no live base node
    pub fn find_added(&mut self) -> usize {
        const STEP: &str = "find_added";
        let store = self.store;
        let table = &self.custom.table;
        let mut added = NodeSet::new();

        for node in self.options.user_nodes(store, &self.graphs.variant_container) {
            let reference = StableReference::identify(store, node);
            let Some(id) = reference.id() else {
                continue;
            };
            let has_source = table
                .by_target(&id)
                .is_some_and(|m| m.source.is_present(store));
            if !has_source {
                self.options.emit(
                    Level::Debug,
                    DiagnosticKind::Progress,
                    STEP,
                    format!("added {reference}"),
                    Some(id),
                    None,
                );
                added.insert(reference);
            }
        }

        self.custom.added = added;
        self.custom.added.len()
    }

    /// Replace the removed set with base nodes that have no live variant node
    pub fn find_removed(&mut self) -> usize {
        const STEP: &str = "find_removed";
        let store = self.store;
        let table = &self.custom.table;
        let mut removed = NodeSet::new();

        for node in self.options.user_nodes(store, &self.graphs.base_container) {
            let reference = StableReference::identify(store, node);
            let Some(id) = reference.id() else {
                continue;
            };
            let has_target = table
                .by_source(&id)
                .is_some_and(|m| m.target.is_present(store));
            if !has_target {
                self.options.emit(
                    Level::Debug,
                    DiagnosticKind::Progress,
                    STEP,
                    format!("removed {reference}"),
                    Some(id),
                    None,
                );
                removed.insert(reference);
            }
        }

        self.custom.removed = removed;
        self.custom.removed.len()
    }

    /// Rebuild the override set from every mapped pair
    ///
    /// A field missing on the base counts as changed.
    ///
    /// # Errors
    /// Returns error if a captured value cannot be encoded
    pub fn find_property_overrides(&mut self) -> Result<usize, SyncError> {
        self.custom.overrides.clear();
        let store = self.store;
        let pairs: Vec<(NodeHandle, NodeHandle, StableReference)> = self
            .custom
            .table
            .iter()
            .filter_map(|m| {
                Some((m.source.resolve(store)?, m.target.resolve(store)?, m.source.clone()))
            })
            .collect();

        for (source, target, source_ref) in pairs {
            self.diff_pair(source, target, &source_ref)?;
        }

        let count = self.custom.overrides.len();
        self.options.emit(
            Level::Info,
            DiagnosticKind::Progress,
            "find_property_overrides",
            format!("recorded {count} overrides"),
            None,
            None,
        );
        Ok(count)
    }

    fn diff_pair(
        &mut self,
        source: NodeHandle,
        target: NodeHandle,
        source_ref: &StableReference,
    ) -> Result<(), SyncError> {
        const STEP: &str = "find_property_overrides";
        let store = self.store;
        let mut walk = store.iterate(target)?;
        let mut enter = true;

        while let Some(step) = walk.next(enter) {
            if step.structural {
                enter = false;
                continue;
            }
            enter = step.kind.can_enter_children();

            let base_value = store.get(source, &step.path);
            let captured = match step.kind {
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
                    let current = StableReference::from(step.value.as_reference().flatten());
                    let on_base = self.custom.table.correspond(&current);
                    let base_id = base_value.as_ref().and_then(FieldValue::as_reference);
                    if base_id == Some(on_base.id()) {
                        continue;
                    }
                    FieldValue::Reference(on_base.id())
                }
                FieldKind::String | FieldKind::SequenceLength | FieldKind::Leaf => {
                    if base_value.as_ref().is_some_and(|base| base.same_value(&step.value)) {
                        continue;
                    }
                    step.value.clone()
                }
            };

            let ov = PropertyOverride::capture(source_ref.clone(), step.path.clone(), &captured)?;
            self.options.emit(
                Level::Debug,
                DiagnosticKind::Field,
                STEP,
                format!("-- {} ({:?}): {}", step.path, step.kind, ov.payload_summary()),
                source_ref.id(),
                Some(&step.path),
            );
            self.custom.overrides.insert(ov);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::sync::StructuralSyncEngine;
    use indexmap::IndexMap;
    use variant_model::{AssetFactory, AssetStore, FieldNode, MemoryStore, PropertyAccessor};

    fn applied() -> (MemoryStore, GraphPair, Customizations, NodeHandle) {
        let mut store = MemoryStore::new();
        let base = store.create_container("Assets/Base.playable").unwrap();
        let variant = store.create_container("Assets/Base Variant.playable").unwrap();
        let base_root = store
            .insert_node(&base, "Timeline", "Base", IndexMap::new())
            .unwrap();
        store.set_primary(base_root).unwrap();
        let variant_root = store
            .insert_node(&variant, "Timeline", "Base Variant", IndexMap::new())
            .unwrap();
        store.set_primary(variant_root).unwrap();

        let mut fields = IndexMap::new();
        fields.insert("label".to_string(), FieldNode::String("A".into()));
        fields.insert("speed".to_string(), FieldNode::Float(1.0));
        let track = store.insert_node(&base, "Track", "Track", fields).unwrap();

        let graphs = GraphPair::new(&store, base_root, variant_root).unwrap();
        let mut custom = Customizations::new();
        StructuralSyncEngine::new(
            &mut store,
            &mut custom,
            graphs,
            SyncOptions::new("VariantData", &NullSink),
        )
        .apply()
        .unwrap();
        (store, graphs, custom, track)
    }

    #[test]
    fn fresh_variant_records_nothing() {
        let (store, graphs, mut custom, _) = applied();
        let report = DiffRecorder::new(
            &store,
            &mut custom,
            graphs,
            SyncOptions::new("VariantData", &NullSink),
        )
        .record()
        .unwrap();
        assert_eq!(report, RecordReport::default());
    }

    #[test]
    fn changed_leaf_is_recorded_against_base_node() {
        let (mut store, graphs, mut custom, track) = applied();
        let source = StableReference::identify(&store, track);
        let clone = custom.table.correspond(&source).resolve(&store).unwrap();
        let speed = "speed".parse().unwrap();
        store.set(clone, &speed, FieldValue::Float(2.0)).unwrap();

        let count = DiffRecorder::new(
            &store,
            &mut custom,
            graphs,
            SyncOptions::new("VariantData", &NullSink),
        )
        .find_property_overrides()
        .unwrap();
        assert_eq!(count, 1);
        let ov = custom.overrides.get(&source, &speed).unwrap();
        assert_eq!(ov.payload_summary(), "2.0");
    }

    #[test]
    fn destroyed_clone_is_removed() {
        let (mut store, graphs, mut custom, track) = applied();
        let source = StableReference::identify(&store, track);
        let clone = custom.table.correspond(&source).resolve(&store).unwrap();
        store.remove_sub_node(clone).unwrap();
        store.destroy(clone).unwrap();

        let removed = DiffRecorder::new(
            &store,
            &mut custom,
            graphs,
            SyncOptions::new("VariantData", &NullSink),
        )
        .find_removed();
        assert_eq!(removed, 1);
        assert!(custom.removed.contains(&source));
    }
}
