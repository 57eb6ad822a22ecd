//! Testing utilities for the variant workspace
//!
//! Shared fixtures, a collecting diagnostic sink and lookup helpers.

#![allow(missing_docs)]

use indexmap::IndexMap;
use std::cell::RefCell;
use variant_core::config::DEFAULT_BOOKKEEPING_TYPE;
use variant_core::{
    derive_variant_with_sink, DerivedVariant, VariantConfig, VariantEngine, VariantState,
};
use variant_model::{
    AssetFactory, AssetGuid, AssetStore, FieldNode, MemoryStore, NodeHandle, PropertyPath,
    StableId,
};
use variant_ref::StableReference;
use variant_sync::{Diagnostic, DiagnosticKind, DiagnosticSink, Level};

pub const BASE_PATH: &str = "Assets/Intro.playable";

/// Sink that keeps every diagnostic for later assertions
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    #[must_use]
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    #[must_use]
    pub fn at_level(&self, level: Level) -> Vec<Diagnostic> {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == level)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}

/// Base timeline: a primary `Timeline` node and two `Track` sub-nodes
///
/// The audio track's `target` points at the animation track, and the
/// timeline's `tracks` list points at both.
pub struct TimelineFixture {
    pub store: MemoryStore,
    pub base: AssetGuid,
    pub root: NodeHandle,
    pub animation: NodeHandle,
    pub audio: NodeHandle,
}

impl TimelineFixture {
    #[must_use]
    pub fn new() -> Self {
        let mut store = MemoryStore::new();
        let base = store.create_container(BASE_PATH).unwrap();
        let root = store
            .insert_node(&base, "Timeline", "Intro", timeline_fields())
            .unwrap();
        store.set_primary(root).unwrap();

        let animation = store
            .insert_node(
                &base,
                "Track",
                "Animation",
                track_fields("Animation", &[(0.0, "Walk"), (2.5, "Run")], None),
            )
            .unwrap();
        let animation_id = store.stable_id(animation);
        let audio = store
            .insert_node(
                &base,
                "Track",
                "Audio",
                track_fields("Audio", &[(1.0, "Theme")], animation_id),
            )
            .unwrap();
        let audio_id = store.stable_id(audio);

        if let Some(FieldNode::Array { items, .. }) =
            store.fields_mut(root).and_then(|f| f.get_mut("tracks"))
        {
            *items = vec![
                FieldNode::Reference(animation_id),
                FieldNode::Reference(audio_id),
            ];
        }

        Self {
            store,
            base,
            root,
            animation,
            audio,
        }
    }

    /// Derive a variant with the default config, collecting diagnostics
    pub fn derive(&mut self, sink: &CollectingSink) -> DerivedVariant {
        derive_variant_with_sink(&mut self.store, self.root, &VariantConfig::default(), sink)
            .unwrap()
    }

    /// Engine over this fixture's store, reporting to `sink`
    pub fn engine<'a>(
        &'a mut self,
        sink: &'a CollectingSink,
    ) -> VariantEngine<'a, MemoryStore, &'a CollectingSink> {
        VariantEngine::with_sink(&mut self.store, VariantConfig::default(), sink)
    }

    /// Add another track to the base
    pub fn add_base_track(&mut self, label: &str) -> NodeHandle {
        self.store
            .insert_node(&self.base, "Track", label, track_fields(label, &[], None))
            .unwrap()
    }
}

impl Default for TimelineFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub fn timeline_fields() -> IndexMap<String, FieldNode> {
    let mut fields = IndexMap::new();
    fields.insert("script".to_string(), FieldNode::String("TimelineAsset".into()));
    fields.insert("version".to_string(), FieldNode::Int(2));
    fields.insert("title".to_string(), FieldNode::String("Intro".into()));
    fields.insert("duration".to_string(), FieldNode::Float(10.0));
    fields.insert(
        "tracks".to_string(),
        FieldNode::array(FieldNode::Reference(None), Vec::new()),
    );
    fields
}

#[must_use]
pub fn clip(start: f64, label: &str) -> FieldNode {
    FieldNode::record([
        ("start", FieldNode::Float(start)),
        ("duration", FieldNode::Float(1.0)),
        ("label", FieldNode::String(label.to_string())),
    ])
}

#[must_use]
pub fn track_fields(
    label: &str,
    clips: &[(f64, &str)],
    target: Option<StableId>,
) -> IndexMap<String, FieldNode> {
    let mut fields = IndexMap::new();
    fields.insert("script".to_string(), FieldNode::String("TrackAsset".into()));
    fields.insert("label".to_string(), FieldNode::String(label.to_string()));
    fields.insert("muted".to_string(), FieldNode::Bool(false));
    fields.insert("volume".to_string(), FieldNode::Float(1.0));
    fields.insert(
        "clips".to_string(),
        FieldNode::array(
            clip(0.0, ""),
            clips.iter().map(|(start, label)| clip(*start, label)).collect(),
        ),
    );
    fields.insert("target".to_string(), FieldNode::Reference(target));
    fields
}

/// Parse a property path
#[must_use]
pub fn path(s: &str) -> PropertyPath {
    s.parse().unwrap()
}

/// Variant node mapped from `base_node`, if it resolves
#[must_use]
pub fn counterpart<S: AssetStore + ?Sized>(
    store: &S,
    state: &VariantState,
    base_node: NodeHandle,
) -> Option<NodeHandle> {
    let source = StableReference::identify(store, base_node);
    state
        .customizations
        .table
        .correspond(&source)
        .resolve(store)
        .filter(|&node| store.container_of(node) != store.container_of(base_node))
}

/// User sub-nodes of a container, excluding primary and bookkeeping nodes
#[must_use]
pub fn user_nodes(store: &MemoryStore, container: &AssetGuid) -> Vec<NodeHandle> {
    store
        .enumerate_sub_nodes(container)
        .into_iter()
        .filter(|&n| {
            !store.is_primary_node(n)
                && store.type_name(n).as_deref() != Some(DEFAULT_BOOKKEEPING_TYPE)
        })
        .collect()
}
