//! Variant Core
//!
//! Keeps a derived "variant" object graph in step with an evolving base
//! while preserving its local customizations.
//!
//! - **apply**: clone new base sub-nodes, collect orphans, copy base fields,
//!   replay recorded overrides
//! - **record**: capture added nodes, removed nodes and changed fields
//! - **reset**: forget recorded customizations
//! - **derive_variant**: create a new variant of a base
//!
//! # Example
//!
//! ```rust
//! use indexmap::IndexMap;
//! use variant_core::{derive_variant, VariantConfig, VariantEngine};
//! use variant_model::{AssetFactory, FieldNode, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! let base = store.create_container("Assets/Intro.playable").unwrap();
//! let root = store.insert_node(&base, "Timeline", "Intro", IndexMap::new()).unwrap();
//! store.set_primary(root).unwrap();
//! let mut fields = IndexMap::new();
//! fields.insert("label".to_string(), FieldNode::String("A".into()));
//! store.insert_node(&base, "Track", "Track", fields).unwrap();
//!
//! let config = VariantConfig::default();
//! let derived = derive_variant(&mut store, root, &config).unwrap();
//! assert_eq!(derived.asset_path, "Assets/Intro Variant.playable");
//! assert_eq!(derived.report.cloned, 1);
//!
//! let mut engine = VariantEngine::new(&mut store, config);
//! let report = engine.record(derived.root).unwrap();
//! assert_eq!(report.overrides, 0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod error;
pub mod state;

pub use bootstrap::{derive_variant, derive_variant_with_sink, DerivedVariant};
pub use config::VariantConfig;
pub use engine::VariantEngine;
pub use error::{Result, VariantError};
pub use state::{find_bookkeeping, VariantState, STATE_FIELD};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving variants
    pub use crate::{derive_variant, VariantConfig, VariantEngine, VariantError, VariantState};
    pub use variant_sync::{ApplyReport, DiagnosticSink, Level, RecordReport};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
