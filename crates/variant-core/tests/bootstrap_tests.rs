use pretty_assertions::assert_eq;
use variant_core::{
    derive_variant_with_sink, VariantConfig, VariantEngine, VariantError, VariantState,
};
use variant_model::{AssetFactory, AssetStore, FieldValue, MemoryStore, PropertyAccessor};
use variant_ref::StableReference;
use variant_test_utils::{path, user_nodes, CollectingSink, TimelineFixture};

#[test]
fn derive_lays_out_variant_container() {
    let sink = CollectingSink::new();
    let mut fx = TimelineFixture::new();
    let derived = fx.derive(&sink);

    assert_eq!(derived.asset_path, "Assets/Intro Variant.playable");
    assert_eq!(
        fx.store.container_at(&derived.asset_path),
        Some(derived.container)
    );
    assert_eq!(fx.store.primary_node(&derived.container), Some(derived.root));
    assert_eq!(fx.store.name(derived.root).as_deref(), Some("Intro Variant"));
    assert_eq!(fx.store.type_name(derived.root).as_deref(), Some("Timeline"));
    assert_eq!(
        fx.store.get(derived.root, &path("title")),
        Some("Intro".into())
    );

    assert!(fx.store.flags(derived.bookkeeping).unwrap().hidden);
    let state = VariantState::load(&fx.store, derived.bookkeeping).unwrap();
    assert_eq!(state.base, StableReference::identify(&fx.store, fx.root));
    assert_eq!(state.customizations.table.len(), 3);
    assert_eq!(user_nodes(&fx.store, &derived.container).len(), 2);
}

#[test]
fn second_derive_gets_unique_path() {
    let sink = CollectingSink::new();
    let mut fx = TimelineFixture::new();
    let first = fx.derive(&sink);
    let second = fx.derive(&sink);

    assert_eq!(first.asset_path, "Assets/Intro Variant.playable");
    assert_eq!(second.asset_path, "Assets/Intro Variant 1.playable");
    assert_ne!(first.container, second.container);
}

#[test]
fn custom_suffix_and_bookkeeping_type() {
    let sink = CollectingSink::new();
    let mut fx = TimelineFixture::new();
    let config = VariantConfig::default()
        .with_variant_suffix(" Alt")
        .with_bookkeeping_type("Ledger");

    let derived = derive_variant_with_sink(&mut fx.store, fx.root, &config, &sink).unwrap();
    assert_eq!(derived.asset_path, "Assets/Intro Alt.playable");
    assert_eq!(fx.store.type_name(derived.bookkeeping).as_deref(), Some("Ledger"));

    let report = VariantEngine::with_sink(&mut fx.store, config, &sink)
        .record(derived.root)
        .unwrap();
    assert_eq!(report.overrides, 0);

    let result =
        VariantEngine::with_sink(&mut fx.store, VariantConfig::default(), &sink).apply(derived.root);
    assert!(matches!(result, Err(VariantError::MissingBookkeeping { .. })));
}

#[test]
fn variant_of_variant_skips_bookkeeping() {
    let sink = CollectingSink::new();
    let mut fx = TimelineFixture::new();
    let first = fx.derive(&sink);

    let second =
        derive_variant_with_sink(&mut fx.store, first.root, &VariantConfig::default(), &sink)
            .unwrap();
    assert_eq!(second.asset_path, "Assets/Intro Variant Variant.playable");
    assert_eq!(second.report.cloned, 2);
    assert_eq!(user_nodes(&fx.store, &second.container).len(), 2);
}

#[test]
fn non_primary_base_is_rejected() {
    let sink = CollectingSink::new();
    let mut fx = TimelineFixture::new();
    let result =
        derive_variant_with_sink(&mut fx.store, fx.animation, &VariantConfig::default(), &sink);
    assert!(matches!(result, Err(VariantError::InvalidBase(_))));
}

#[test]
fn transient_base_is_rejected() {
    let sink = CollectingSink::new();
    let mut store = MemoryStore::new();
    let loose = store.create_node("Timeline");
    let result = derive_variant_with_sink(&mut store, loose, &VariantConfig::default(), &sink);
    assert!(matches!(result, Err(VariantError::NotPersistent(_))));
}

#[test]
fn derived_variant_reports_progress() {
    let sink = CollectingSink::new();
    let mut fx = TimelineFixture::new();
    fx.derive(&sink);

    let steps: Vec<&str> = sink.diagnostics().iter().map(|d| d.step).collect();
    for step in ["sync_structure", "remove_orphans", "copy_base_fields", "replay_overrides"] {
        assert!(steps.contains(&step), "missing {step} in {steps:?}");
    }
    assert_eq!(
        fx.store.get(fx.root, &path("duration")),
        Some(FieldValue::Float(10.0))
    );
}
