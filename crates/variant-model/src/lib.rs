//! Variant Model
//!
//! Identity, addressing and storage interfaces shared by the override engine.
//!
//! # Core Concepts
//!
//! - [`StableId`]: persisted `(container, local id)` identity of a node
//! - [`NodeHandle`]: transient handle to a live node
//! - [`PropertyPath`]: order-independent route to a field inside a node
//! - [`FieldWalk`]: depth-first field cursor with caller-controlled descent
//! - [`AssetStore`] / [`PropertyAccessor`]: collaborator interfaces
//! - [`MemoryStore`]: in-memory reference implementation
//!
//! # Example
//!
//! ```rust
//! use variant_model::{AssetFactory, AssetStore, FieldNode, MemoryStore, PropertyAccessor, PropertyPath};
//! use indexmap::IndexMap;
//!
//! let mut store = MemoryStore::new();
//! let guid = store.create_container("Assets/Intro.playable").unwrap();
//! let mut fields = IndexMap::new();
//! fields.insert("title".to_string(), FieldNode::String("Intro".into()));
//! let node = store.insert_node(&guid, "Track", "Track A", fields).unwrap();
//!
//! assert!(store.is_persistent(node));
//! assert!(store.get(node, &PropertyPath::field("title")).is_some());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod field;
mod id;
pub mod memory;
mod path;
mod store;

pub use field::{FieldKind, FieldStep, FieldValue, FieldWalk, NodeFlags};
pub use id::{AssetGuid, IdError, LocalId, NodeHandle, StableId};
pub use memory::{FieldNode, MemoryStore};
pub use path::{is_plain_field_name, PathError, PathSegment, PropertyPath};
pub use store::{AssetFactory, AssetStore, PropertyAccessor, Store, StoreError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
