//! Variant Sync
//!
//! The diff/patch core of the override engine.
//!
//! # Core Concepts
//!
//! - [`StructuralSyncEngine`]: clone, collect, copy, replay (`apply`)
//! - [`DiffRecorder`]: added, removed, overridden (`record`)
//! - [`PropertyOverride`]: one recorded field value, keyed by base node
//! - [`Customizations`]: correspondence table plus recorded deltas
//! - [`DiagnosticSink`]: where recoverable problems are reported
//!
//! # Example
//!
//! ```rust
//! use indexmap::IndexMap;
//! use variant_model::{AssetFactory, FieldNode, MemoryStore};
//! use variant_sync::{Customizations, GraphPair, NullSink, StructuralSyncEngine, SyncOptions};
//!
//! let mut store = MemoryStore::new();
//! let base = store.create_container("Assets/Intro.playable").unwrap();
//! let variant = store.create_container("Assets/Intro Variant.playable").unwrap();
//! let base_root = store.insert_node(&base, "Timeline", "Intro", IndexMap::new()).unwrap();
//! let variant_root = store.insert_node(&variant, "Timeline", "Intro Variant", IndexMap::new()).unwrap();
//! store.set_primary(base_root).unwrap();
//! store.set_primary(variant_root).unwrap();
//! let mut fields = IndexMap::new();
//! fields.insert("label".to_string(), FieldNode::String("A".into()));
//! store.insert_node(&base, "Track", "Track", fields).unwrap();
//!
//! let graphs = GraphPair::new(&store, base_root, variant_root).unwrap();
//! let mut custom = Customizations::new();
//! let report = StructuralSyncEngine::new(&mut store, &mut custom, graphs, SyncOptions::new("VariantData", &NullSink))
//!     .apply()
//!     .unwrap();
//! assert_eq!(report.cloned, 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod context;
mod customizations;
pub mod diagnostics;
mod diff;
mod overrides;
mod sync;

pub use context::{GraphPair, SyncError, SyncOptions};
pub use customizations::{Customizations, NodeSet};
pub use diagnostics::{
    Diagnostic, DiagnosticKind, DiagnosticSink, Level, NullSink, TracingSink, UnknownLevel,
};
pub use diff::{DiffRecorder, RecordReport};
pub use overrides::{OverrideError, OverridePayload, OverrideSet, PropertyOverride, ScalarBlob};
pub use sync::{ApplyReport, StructuralSyncEngine};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
