//! Variant References
//!
//! Cross-graph identity for the override engine.
//!
//! # Overview
//!
//! - **StableReference**: persisted node id with a revalidated handle cache
//! - **CorrespondenceTable**: partial bijection between base and variant nodes
//!
//! # Example
//!
//! ```rust
//! use variant_model::{AssetGuid, LocalId, StableId};
//! use variant_ref::{CorrespondenceTable, StableReference};
//!
//! let base = StableReference::from_id(StableId::new(AssetGuid::new([1; 16]), LocalId(1)));
//! let variant = StableReference::from_id(StableId::new(AssetGuid::new([2; 16]), LocalId(1)));
//!
//! let mut table = CorrespondenceTable::new();
//! table.upsert(base.clone(), variant.clone()).unwrap();
//!
//! assert_eq!(table.correspond(&base), variant);
//! assert_eq!(table.correspond(&variant), base);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod reference;
pub mod table;

pub use reference::StableReference;
pub use table::{CorrespondenceError, CorrespondenceTable, Mapping};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
