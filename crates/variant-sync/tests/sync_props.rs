//! Property tests for apply/record over generated base graphs

use indexmap::IndexMap;
use proptest::prelude::*;
use variant_model::{AssetFactory, AssetGuid, AssetStore, FieldNode, MemoryStore, NodeHandle};
use variant_sync::{
    Customizations, DiffRecorder, GraphPair, NullSink, StructuralSyncEngine, SyncOptions,
};

#[derive(Debug, Clone)]
struct TrackShape {
    label: String,
    speed: f64,
    clips: Vec<i64>,
    /// Index of another generated node this one points at
    target: Option<usize>,
}

fn track_shape() -> impl Strategy<Value = TrackShape> {
    (
        "[a-z]{0,8}",
        -100.0f64..100.0,
        prop::collection::vec(-50i64..50, 0..4),
        prop::option::of(0usize..8),
    )
        .prop_map(|(label, speed, clips, target)| TrackShape {
            label,
            speed,
            clips,
            target,
        })
}

fn build(shapes: &[TrackShape]) -> (MemoryStore, GraphPair) {
    let mut store = MemoryStore::new();
    let base = store.create_container("Assets/Gen.playable").unwrap();
    let variant = store.create_container("Assets/Gen Variant.playable").unwrap();
    let base_root = store
        .insert_node(&base, "Timeline", "Gen", IndexMap::new())
        .unwrap();
    store.set_primary(base_root).unwrap();
    let variant_root = store
        .insert_node(&variant, "Timeline", "Gen Variant", IndexMap::new())
        .unwrap();
    store.set_primary(variant_root).unwrap();

    let handles: Vec<NodeHandle> = shapes
        .iter()
        .map(|shape| {
            let mut fields = IndexMap::new();
            fields.insert("label".to_string(), FieldNode::String(shape.label.clone()));
            fields.insert("speed".to_string(), FieldNode::Float(shape.speed));
            fields.insert(
                "clips".to_string(),
                FieldNode::array(
                    FieldNode::Int(0),
                    shape.clips.iter().copied().map(FieldNode::Int).collect(),
                ),
            );
            fields.insert("target".to_string(), FieldNode::Reference(None));
            store.insert_node(&base, "Track", "Track", fields).unwrap()
        })
        .collect();

    for (shape, &handle) in shapes.iter().zip(&handles) {
        let Some(i) = shape.target else { continue };
        let Some(&pointee) = handles.get(i) else { continue };
        let id = store.stable_id(pointee);
        if let Some(FieldNode::Reference(slot)) =
            store.fields_mut(handle).and_then(|f| f.get_mut("target"))
        {
            *slot = id;
        }
    }

    let graphs = GraphPair::new(&store, base_root, variant_root).unwrap();
    (store, graphs)
}

fn member_count(store: &MemoryStore, container: &AssetGuid) -> usize {
    store.enumerate_sub_nodes(container).len()
}

proptest! {
    #[test]
    fn apply_is_idempotent(shapes in prop::collection::vec(track_shape(), 0..8)) {
        let (mut store, graphs) = build(&shapes);
        let mut custom = Customizations::new();
        let options = SyncOptions::new("VariantData", &NullSink);

        let first = StructuralSyncEngine::new(&mut store, &mut custom, graphs, options)
            .apply()
            .unwrap();
        prop_assert_eq!(first.cloned, shapes.len());
        let members = member_count(&store, &graphs.variant_container);
        let table = custom.table.clone();

        let second = StructuralSyncEngine::new(&mut store, &mut custom, graphs, options)
            .apply()
            .unwrap();
        prop_assert_eq!(second.cloned, 0);
        prop_assert_eq!(second.orphans_removed, 0);
        prop_assert_eq!(member_count(&store, &graphs.variant_container), members);
        prop_assert_eq!(&custom.table, &table);
    }

    #[test]
    fn record_after_apply_is_empty(shapes in prop::collection::vec(track_shape(), 0..8)) {
        let (mut store, graphs) = build(&shapes);
        let mut custom = Customizations::new();
        let options = SyncOptions::new("VariantData", &NullSink);

        StructuralSyncEngine::new(&mut store, &mut custom, graphs, options)
            .apply()
            .unwrap();
        let report = DiffRecorder::new(&store, &mut custom, graphs, options)
            .record()
            .unwrap();

        prop_assert_eq!(report.added, 0);
        prop_assert_eq!(report.removed, 0);
        prop_assert_eq!(report.overrides, 0);
        prop_assert!(custom.is_pristine());
    }
}
