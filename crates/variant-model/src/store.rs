//! Collaborator interfaces consumed by the engine
//!
//! The engine never touches node storage directly. It drives an
//! [`AssetStore`] for structure and a [`PropertyAccessor`] for fields.

use crate::field::{FieldKind, FieldValue, FieldWalk, NodeFlags};
use crate::id::{AssetGuid, NodeHandle, StableId};
use crate::path::PropertyPath;

/// Structural access to persisted containers and their sub-nodes
pub trait AssetStore {
    /// Whether `node` still refers to a live node
    fn is_alive(&self, node: NodeHandle) -> bool;

    /// Persisted identity of `node`
    ///
    /// `None` if the node is dead or not part of a persisted container.
    fn stable_id(&self, node: NodeHandle) -> Option<StableId>;

    /// Whether `node` belongs to a persisted container
    #[inline]
    fn is_persistent(&self, node: NodeHandle) -> bool {
        self.stable_id(node).is_some()
    }

    /// Container `node` belongs to
    #[inline]
    fn container_of(&self, node: NodeHandle) -> Option<AssetGuid> {
        self.stable_id(node).map(|id| id.container)
    }

    /// Schema type name of `node`
    fn type_name(&self, node: NodeHandle) -> Option<String>;

    /// Every node of a container, primary node included, in storage order
    fn enumerate_sub_nodes(&self, container: &AssetGuid) -> Vec<NodeHandle>;

    /// Whether `node` is the primary node of its container
    fn is_primary_node(&self, node: NodeHandle) -> bool;

    fn flags(&self, node: NodeHandle) -> Result<NodeFlags, StoreError>;

    fn set_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), StoreError>;

    /// Attach a transient node to a container, assigning its stable id
    ///
    /// # Errors
    /// Fails if the container is unknown or the node already belongs to one
    fn add_sub_node(
        &mut self,
        container: &AssetGuid,
        node: NodeHandle,
    ) -> Result<StableId, StoreError>;

    /// Detach `node` from its container; the node stays alive but transient
    fn remove_sub_node(&mut self, node: NodeHandle) -> Result<(), StoreError>;

    /// Destroy `node`; its handle is dead afterwards
    fn destroy(&mut self, node: NodeHandle) -> Result<(), StoreError>;

    /// Create a transient deep copy of `node` (fields and type, no identity)
    fn instantiate_copy(&mut self, node: NodeHandle) -> Result<NodeHandle, StoreError>;

    /// Flush the node's modified fields to storage without an undo record
    fn persist(&mut self, node: NodeHandle) -> Result<(), StoreError>;
}

/// Field-level access to a node
pub trait PropertyAccessor {
    /// Depth-first cursor over a snapshot of the node's fields
    fn iterate(&self, node: NodeHandle) -> Result<FieldWalk, StoreError>;

    /// Value at `path`, `None` if the path does not exist
    fn get(&self, node: NodeHandle, path: &PropertyPath) -> Option<FieldValue>;

    /// Assign the value at an existing `path`
    ///
    /// Assigning a [`FieldValue::Length`] resizes the sequence so that the
    /// element paths exist afterwards.
    fn set(
        &mut self,
        node: NodeHandle,
        path: &PropertyPath,
        value: FieldValue,
    ) -> Result<(), StoreError>;

    /// Kind of the field at `path`, `None` if the path does not exist
    fn kind_of(&self, node: NodeHandle, path: &PropertyPath) -> Option<FieldKind>;
}

/// Everything the engine needs from a store
pub trait Store: AssetStore + PropertyAccessor {}

impl<T: AssetStore + PropertyAccessor> Store for T {}

/// Container and node creation, used only when bootstrapping a variant
pub trait AssetFactory: Store {
    /// Create an empty container at `path`
    ///
    /// # Errors
    /// Fails if a container already exists at `path`
    fn create_container(&mut self, path: &str) -> Result<AssetGuid, StoreError>;

    /// Create a transient node of `type_name` with no fields
    fn create_node(&mut self, type_name: &str) -> NodeHandle;

    /// Asset path of a container
    fn asset_path(&self, container: &AssetGuid) -> Option<String>;

    /// Turn `path` into a path no existing container uses
    fn unique_asset_path(&self, path: &str) -> String;

    /// Mark `node` as the primary node of its container
    fn set_primary(&mut self, node: NodeHandle) -> Result<(), StoreError>;

    /// Node display name
    fn name(&self, node: NodeHandle) -> Option<String>;

    fn set_name(&mut self, node: NodeHandle, name: &str) -> Result<(), StoreError>;

    /// Declare a new top-level field on a node
    fn define_field(
        &mut self,
        node: NodeHandle,
        name: &str,
        value: FieldValue,
    ) -> Result<(), StoreError>;
}

/// Errors raised by store collaborators
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Handle does not refer to a live node
    #[error("dead node handle: {0}")]
    DeadNode(NodeHandle),

    /// Container is not known to the store
    #[error("unknown container: {0}")]
    UnknownContainer(AssetGuid),

    /// Container already exists
    #[error("container already exists at {0}")]
    ContainerExists(String),

    /// Node already belongs to a container
    #[error("node {0} already belongs to a container")]
    AlreadyAttached(NodeHandle),

    /// Node does not belong to any container
    #[error("node {0} is not attached to a container")]
    NotAttached(NodeHandle),

    /// Field path does not exist on the node
    #[error("no field at '{path}' on node {node}")]
    MissingField { node: NodeHandle, path: PropertyPath },

    /// Value kind does not match the field kind
    #[error("cannot assign {actual:?} to {expected:?} field '{path}'")]
    KindMismatch {
        path: PropertyPath,
        expected: FieldKind,
        actual: FieldKind,
    },

    /// Field is already defined
    #[error("field '{0}' already defined")]
    DuplicateField(String),

    /// Store file could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data is inconsistent
    #[error("corrupt store: {0}")]
    Corrupt(String),
}
