//! In-memory reference store
//!
//! [`MemoryStore`] implements every collaborator trait over an arena of
//! nodes grouped in containers. It round-trips through JSON, which is the
//! store file format of the command line front end.

use crate::field::{FieldKind, FieldStep, FieldValue, FieldWalk, NodeFlags};
use crate::id::{AssetGuid, LocalId, NodeHandle, StableId};
use crate::path::{PathSegment, PropertyPath};
use crate::store::{AssetFactory, AssetStore, PropertyAccessor, StoreError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Field names treated as structural unless the schema says otherwise
pub const DEFAULT_STRUCTURAL_FIELDS: &[&str] = &["script", "version", "editor_class"];

/// Stored field tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldNode {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Reference(Option<StableId>),
    Data(serde_json::Value),
    Polymorphic(serde_json::Value),
    Struct(IndexMap<String, FieldNode>),
    /// Sequence; `element` is the schema default for grown slots
    Array {
        element: Box<FieldNode>,
        items: Vec<FieldNode>,
    },
}

impl FieldNode {
    /// Convenience constructor for a struct field
    #[must_use]
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldNode)>,
        K: Into<String>,
    {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convenience constructor for a sequence field
    #[must_use]
    pub fn array(element: FieldNode, items: Vec<FieldNode>) -> Self {
        Self::Array {
            element: Box::new(element),
            items,
        }
    }

    fn kind(&self) -> FieldKind {
        match self {
            Self::Struct(_) | Self::Array { .. } => FieldKind::Container,
            Self::String(_) => FieldKind::String,
            Self::Reference(_) => FieldKind::Reference,
            Self::Polymorphic(_) => FieldKind::Polymorphic,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Data(_) => FieldKind::Leaf,
        }
    }

    fn value(&self) -> FieldValue {
        match self {
            Self::Struct(_) | Self::Array { .. } => FieldValue::Container,
            Self::Bool(v) => FieldValue::Bool(*v),
            Self::Int(v) => FieldValue::Int(*v),
            Self::Float(v) => FieldValue::Float(*v),
            Self::String(v) => FieldValue::String(v.clone()),
            Self::Reference(v) => FieldValue::Reference(*v),
            Self::Data(v) => FieldValue::Data(v.clone()),
            Self::Polymorphic(v) => FieldValue::Polymorphic(v.clone()),
        }
    }

    fn from_value(path: &PropertyPath, value: FieldValue) -> Result<Self, StoreError> {
        Ok(match value {
            FieldValue::Bool(v) => Self::Bool(v),
            FieldValue::Int(v) => Self::Int(v),
            FieldValue::Float(v) => Self::Float(v),
            FieldValue::String(v) => Self::String(v),
            FieldValue::Reference(v) => Self::Reference(v),
            FieldValue::Data(v) => Self::Data(v),
            FieldValue::Polymorphic(v) => Self::Polymorphic(v),
            other @ (FieldValue::Container | FieldValue::Length(_)) => {
                return Err(StoreError::KindMismatch {
                    path: path.clone(),
                    expected: FieldKind::Leaf,
                    actual: other.kind(),
                })
            }
        })
    }

    /// Overwrite a leaf in place, keeping its declared representation
    fn assign(&mut self, path: &PropertyPath, value: FieldValue) -> Result<(), StoreError> {
        let mismatch = |node: &FieldNode, value: &FieldValue| StoreError::KindMismatch {
            path: path.clone(),
            expected: node.kind(),
            actual: value.kind(),
        };
        match (&mut *self, value) {
            (Self::Bool(slot), FieldValue::Bool(v)) => *slot = v,
            (Self::Int(slot), FieldValue::Int(v)) => *slot = v,
            (Self::Float(slot), FieldValue::Float(v)) => *slot = v,
            (Self::String(slot), FieldValue::String(v)) => *slot = v,
            (Self::Reference(slot), FieldValue::Reference(v)) => *slot = v,
            (Self::Data(slot), FieldValue::Data(v)) => *slot = v,
            (Self::Polymorphic(slot), FieldValue::Polymorphic(v)) => *slot = v,
            (node, value) => return Err(mismatch(node, &value)),
        }
        Ok(())
    }
}

/// Where a path lands inside a field tree
enum Target<'a> {
    Field(&'a FieldNode),
    Length(usize),
}

fn locate<'a>(
    fields: &'a IndexMap<String, FieldNode>,
    path: &PropertyPath,
) -> Option<Target<'a>> {
    let mut segments = path.iter();
    let mut current = match segments.next()? {
        PathSegment::Field(name) => fields.get(name)?,
        _ => return None,
    };
    for seg in segments {
        current = match (seg, current) {
            (PathSegment::Field(name), FieldNode::Struct(children)) => children.get(name)?,
            (PathSegment::Index(i), FieldNode::Array { items, .. }) => items.get(*i)?,
            (PathSegment::Length, FieldNode::Array { items, .. }) => {
                return Some(Target::Length(items.len()))
            }
            _ => return None,
        };
    }
    Some(Target::Field(current))
}

fn locate_mut<'a>(
    fields: &'a mut IndexMap<String, FieldNode>,
    segments: &[PathSegment],
) -> Option<&'a mut FieldNode> {
    let (first, rest) = segments.split_first()?;
    let mut current = match first {
        PathSegment::Field(name) => fields.get_mut(name)?,
        _ => return None,
    };
    for seg in rest {
        current = match (seg, current) {
            (PathSegment::Field(name), FieldNode::Struct(children)) => children.get_mut(name)?,
            (PathSegment::Index(i), FieldNode::Array { items, .. }) => items.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Per-node storage
#[derive(Debug, Clone, PartialEq)]
struct NodeData {
    type_name: String,
    name: String,
    flags: NodeFlags,
    primary: bool,
    fields: IndexMap<String, FieldNode>,
    id: Option<StableId>,
    revision: u64,
}

#[derive(Debug, Clone)]
struct ContainerData {
    path: String,
    next_local: u64,
    members: Vec<NodeHandle>,
}

/// In-memory implementation of the store collaborators
#[derive(Debug, Clone)]
pub struct MemoryStore {
    structural: BTreeSet<String>,
    containers: IndexMap<AssetGuid, ContainerData>,
    nodes: HashMap<NodeHandle, NodeData>,
    next_handle: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with the default structural field set
    #[must_use]
    pub fn new() -> Self {
        Self::with_structural_fields(DEFAULT_STRUCTURAL_FIELDS.iter().copied())
    }

    /// Empty store whose schema classifies `names` as structural
    #[must_use]
    pub fn with_structural_fields<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            structural: names.into_iter().map(str::to_string).collect(),
            containers: IndexMap::new(),
            nodes: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Whether the schema classifies `name` as structural
    #[inline]
    #[must_use]
    pub fn is_structural(&self, name: &str) -> bool {
        self.structural.contains(name)
    }

    /// Create a node with fields and attach it to `container`
    ///
    /// # Errors
    /// Fails if the container does not exist
    pub fn insert_node(
        &mut self,
        container: &AssetGuid,
        type_name: &str,
        name: &str,
        fields: IndexMap<String, FieldNode>,
    ) -> Result<NodeHandle, StoreError> {
        let handle = self.alloc(NodeData {
            type_name: type_name.to_string(),
            name: name.to_string(),
            flags: NodeFlags::default(),
            primary: false,
            fields,
            id: None,
            revision: 0,
        });
        self.add_sub_node(container, handle)?;
        Ok(handle)
    }

    /// Containers in creation order
    pub fn containers(&self) -> impl Iterator<Item = (&AssetGuid, &str)> {
        self.containers.iter().map(|(g, c)| (g, c.path.as_str()))
    }

    /// Container registered at `path`
    #[must_use]
    pub fn container_at(&self, path: &str) -> Option<AssetGuid> {
        self.containers
            .iter()
            .find(|(_, c)| c.path == path)
            .map(|(g, _)| *g)
    }

    /// Primary node of a container
    #[must_use]
    pub fn primary_node(&self, container: &AssetGuid) -> Option<NodeHandle> {
        self.containers.get(container)?.members.iter().copied().find(|h| {
            self.nodes.get(h).is_some_and(|n| n.primary)
        })
    }

    /// Number of times `node` has been persisted
    #[must_use]
    pub fn revision(&self, node: NodeHandle) -> Option<u64> {
        self.nodes.get(&node).map(|n| n.revision)
    }

    /// Raw field tree of `node`
    #[must_use]
    pub fn fields(&self, node: NodeHandle) -> Option<&IndexMap<String, FieldNode>> {
        self.nodes.get(&node).map(|n| &n.fields)
    }

    /// Mutable raw field tree of `node`, bypassing kind checks
    pub fn fields_mut(&mut self, node: NodeHandle) -> Option<&mut IndexMap<String, FieldNode>> {
        self.nodes.get_mut(&node).map(|n| &mut n.fields)
    }

    /// Serialize the store to its JSON file format
    ///
    /// Transient (unattached) nodes are not saved.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, StoreError> {
        let file = StoreFile {
            structural: self.structural.iter().cloned().collect(),
            containers: self
                .containers
                .iter()
                .map(|(guid, c)| ContainerFile {
                    guid: *guid,
                    path: c.path.clone(),
                    next_local: c.next_local,
                    nodes: c
                        .members
                        .iter()
                        .filter_map(|h| self.nodes.get(h))
                        .filter(|n| !n.flags.transient)
                        .filter_map(|n| {
                            Some(NodeFile {
                                local: n.id?.local,
                                type_name: n.type_name.clone(),
                                name: n.name.clone(),
                                flags: n.flags,
                                primary: n.primary,
                                fields: n.fields.clone(),
                            })
                        })
                        .collect(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Load a store from its JSON file format, assigning fresh handles
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or ids collide
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let file: StoreFile = serde_json::from_str(json)?;
        let mut store = Self::with_structural_fields(file.structural.iter().map(String::as_str));
        for container in file.containers {
            if store.containers.contains_key(&container.guid) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate container {}",
                    container.guid
                )));
            }
            let mut members = Vec::with_capacity(container.nodes.len());
            let mut seen = BTreeSet::new();
            for node in container.nodes {
                if !seen.insert(node.local) {
                    return Err(StoreError::Corrupt(format!(
                        "duplicate local id {} in {}",
                        node.local, container.path
                    )));
                }
                let handle = store.alloc(NodeData {
                    type_name: node.type_name,
                    name: node.name,
                    flags: node.flags,
                    primary: node.primary,
                    fields: node.fields,
                    id: Some(StableId::new(container.guid, node.local)),
                    revision: 0,
                });
                members.push(handle);
            }
            let next_local = seen
                .iter()
                .next_back()
                .map_or(container.next_local, |max| container.next_local.max(max.0 + 1));
            store.containers.insert(
                container.guid,
                ContainerData {
                    path: container.path,
                    next_local,
                    members,
                },
            );
        }
        Ok(store)
    }

    fn alloc(&mut self, data: NodeData) -> NodeHandle {
        let handle = NodeHandle(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(handle, data);
        handle
    }

    fn node(&self, node: NodeHandle) -> Result<&NodeData, StoreError> {
        self.nodes.get(&node).ok_or(StoreError::DeadNode(node))
    }

    fn node_mut(&mut self, node: NodeHandle) -> Result<&mut NodeData, StoreError> {
        self.nodes.get_mut(&node).ok_or(StoreError::DeadNode(node))
    }

    fn collect_steps(
        &self,
        path: &PropertyPath,
        field: &FieldNode,
        depth: usize,
        structural: bool,
        out: &mut Vec<FieldStep>,
    ) {
        out.push(FieldStep {
            path: path.clone(),
            kind: field.kind(),
            value: field.value(),
            depth,
            structural,
        });
        match field {
            FieldNode::Struct(children) => {
                for (name, child) in children {
                    let structural = self.is_structural(name);
                    self.collect_steps(&path.child(name), child, depth + 1, structural, out);
                }
            }
            FieldNode::Array { items, .. } => {
                out.push(FieldStep {
                    path: path.length(),
                    kind: FieldKind::SequenceLength,
                    value: FieldValue::Length(items.len()),
                    depth: depth + 1,
                    structural: false,
                });
                for (i, item) in items.iter().enumerate() {
                    self.collect_steps(&path.index(i), item, depth + 1, false, out);
                }
            }
            _ => {}
        }
    }
}

impl AssetStore for MemoryStore {
    fn is_alive(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(&node)
    }

    fn stable_id(&self, node: NodeHandle) -> Option<StableId> {
        self.nodes.get(&node)?.id
    }

    fn type_name(&self, node: NodeHandle) -> Option<String> {
        self.nodes.get(&node).map(|n| n.type_name.clone())
    }

    fn enumerate_sub_nodes(&self, container: &AssetGuid) -> Vec<NodeHandle> {
        self.containers
            .get(container)
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }

    fn is_primary_node(&self, node: NodeHandle) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.primary)
    }

    fn flags(&self, node: NodeHandle) -> Result<NodeFlags, StoreError> {
        Ok(self.node(node)?.flags)
    }

    fn set_flags(&mut self, node: NodeHandle, flags: NodeFlags) -> Result<(), StoreError> {
        self.node_mut(node)?.flags = flags;
        Ok(())
    }

    fn add_sub_node(
        &mut self,
        container: &AssetGuid,
        node: NodeHandle,
    ) -> Result<StableId, StoreError> {
        if self.node(node)?.id.is_some() {
            return Err(StoreError::AlreadyAttached(node));
        }
        let data = self
            .containers
            .get_mut(container)
            .ok_or(StoreError::UnknownContainer(*container))?;
        let id = StableId::new(*container, LocalId(data.next_local));
        data.next_local += 1;
        data.members.push(node);
        self.node_mut(node)?.id = Some(id);
        Ok(id)
    }

    fn remove_sub_node(&mut self, node: NodeHandle) -> Result<(), StoreError> {
        let id = self.node(node)?.id.ok_or(StoreError::NotAttached(node))?;
        if let Some(container) = self.containers.get_mut(&id.container) {
            container.members.retain(|h| *h != node);
        }
        let data = self.node_mut(node)?;
        data.id = None;
        data.primary = false;
        Ok(())
    }

    fn destroy(&mut self, node: NodeHandle) -> Result<(), StoreError> {
        let data = self.nodes.remove(&node).ok_or(StoreError::DeadNode(node))?;
        if let Some(id) = data.id {
            if let Some(container) = self.containers.get_mut(&id.container) {
                container.members.retain(|h| *h != node);
            }
        }
        Ok(())
    }

    fn instantiate_copy(&mut self, node: NodeHandle) -> Result<NodeHandle, StoreError> {
        let source = self.node(node)?;
        let copy = NodeData {
            type_name: source.type_name.clone(),
            name: source.name.clone(),
            flags: NodeFlags::default(),
            primary: false,
            fields: source.fields.clone(),
            id: None,
            revision: 0,
        };
        Ok(self.alloc(copy))
    }

    fn persist(&mut self, node: NodeHandle) -> Result<(), StoreError> {
        self.node_mut(node)?.revision += 1;
        Ok(())
    }
}

impl PropertyAccessor for MemoryStore {
    fn iterate(&self, node: NodeHandle) -> Result<FieldWalk, StoreError> {
        let data = self.node(node)?;
        let mut steps = Vec::new();
        for (name, field) in &data.fields {
            let structural = self.is_structural(name);
            self.collect_steps(&PropertyPath::field(name), field, 0, structural, &mut steps);
        }
        Ok(FieldWalk::new(steps))
    }

    fn get(&self, node: NodeHandle, path: &PropertyPath) -> Option<FieldValue> {
        match locate(&self.nodes.get(&node)?.fields, path)? {
            Target::Field(field) => Some(field.value()),
            Target::Length(len) => Some(FieldValue::Length(len)),
        }
    }

    fn set(
        &mut self,
        node: NodeHandle,
        path: &PropertyPath,
        value: FieldValue,
    ) -> Result<(), StoreError> {
        let data = self.node_mut(node)?;
        let missing = || StoreError::MissingField {
            node,
            path: path.clone(),
        };

        if let Some(PathSegment::Length) = path.last() {
            let len = match value {
                FieldValue::Length(len) => len,
                other => {
                    return Err(StoreError::KindMismatch {
                        path: path.clone(),
                        expected: FieldKind::SequenceLength,
                        actual: other.kind(),
                    })
                }
            };
            let segments = &path.segments()[..path.len() - 1];
            return match locate_mut(&mut data.fields, segments) {
                Some(FieldNode::Array { element, items }) => {
                    if len < items.len() {
                        items.truncate(len);
                    } else {
                        let default = (**element).clone();
                        items.resize(len, default);
                    }
                    Ok(())
                }
                _ => Err(missing()),
            };
        }

        let field = locate_mut(&mut data.fields, path.segments()).ok_or_else(missing)?;
        field.assign(path, value)
    }

    fn kind_of(&self, node: NodeHandle, path: &PropertyPath) -> Option<FieldKind> {
        match locate(&self.nodes.get(&node)?.fields, path)? {
            Target::Field(field) => Some(field.kind()),
            Target::Length(_) => Some(FieldKind::SequenceLength),
        }
    }
}

impl AssetFactory for MemoryStore {
    fn create_container(&mut self, path: &str) -> Result<AssetGuid, StoreError> {
        let guid = AssetGuid::for_path(path);
        if self.containers.contains_key(&guid) || self.container_at(path).is_some() {
            return Err(StoreError::ContainerExists(path.to_string()));
        }
        self.containers.insert(
            guid,
            ContainerData {
                path: path.to_string(),
                next_local: 1,
                members: Vec::new(),
            },
        );
        Ok(guid)
    }

    fn create_node(&mut self, type_name: &str) -> NodeHandle {
        self.alloc(NodeData {
            type_name: type_name.to_string(),
            name: String::new(),
            flags: NodeFlags::default(),
            primary: false,
            fields: IndexMap::new(),
            id: None,
            revision: 0,
        })
    }

    fn asset_path(&self, container: &AssetGuid) -> Option<String> {
        self.containers.get(container).map(|c| c.path.clone())
    }

    fn unique_asset_path(&self, path: &str) -> String {
        if self.container_at(path).is_none() {
            return path.to_string();
        }
        let (stem, ext) = match path.rfind('.') {
            Some(dot) if !path[dot..].contains('/') => path.split_at(dot),
            _ => (path, ""),
        };
        (1u32..)
            .map(|n| format!("{stem} {n}{ext}"))
            .find(|candidate| self.container_at(candidate).is_none())
            .unwrap_or_else(|| path.to_string())
    }

    fn set_primary(&mut self, node: NodeHandle) -> Result<(), StoreError> {
        let id = self.node(node)?.id.ok_or(StoreError::NotAttached(node))?;
        let members = self.enumerate_sub_nodes(&id.container);
        for member in members {
            if let Some(data) = self.nodes.get_mut(&member) {
                data.primary = member == node;
            }
        }
        Ok(())
    }

    fn name(&self, node: NodeHandle) -> Option<String> {
        self.nodes.get(&node).map(|n| n.name.clone())
    }

    fn set_name(&mut self, node: NodeHandle, name: &str) -> Result<(), StoreError> {
        self.node_mut(node)?.name = name.to_string();
        Ok(())
    }

    fn define_field(
        &mut self,
        node: NodeHandle,
        name: &str,
        value: FieldValue,
    ) -> Result<(), StoreError> {
        let field = FieldNode::from_value(&PropertyPath::field(name), value)?;
        let data = self.node_mut(node)?;
        if data.fields.contains_key(name) {
            return Err(StoreError::DuplicateField(name.to_string()));
        }
        data.fields.insert(name.to_string(), field);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    structural: Vec<String>,
    containers: Vec<ContainerFile>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContainerFile {
    guid: AssetGuid,
    path: String,
    #[serde(default = "first_local")]
    next_local: u64,
    nodes: Vec<NodeFile>,
}

fn first_local() -> u64 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeFile {
    local: LocalId,
    type_name: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    flags: NodeFlags,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    fields: IndexMap<String, FieldNode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn clip(start: f64) -> FieldNode {
        FieldNode::record([
            ("start", FieldNode::Float(start)),
            ("label", FieldNode::String(String::new())),
        ])
    }

    fn setup() -> (MemoryStore, AssetGuid, NodeHandle) {
        let mut store = MemoryStore::new();
        let guid = store.create_container("Assets/Intro.playable").unwrap();
        let mut fields = IndexMap::new();
        fields.insert("title".to_string(), FieldNode::String("Intro".into()));
        fields.insert("version".to_string(), FieldNode::Int(3));
        fields.insert(
            "clips".to_string(),
            FieldNode::array(clip(0.0), vec![clip(1.0), clip(2.0)]),
        );
        let node = store.insert_node(&guid, "Track", "Track A", fields).unwrap();
        (store, guid, node)
    }

    #[test]
    fn insert_assigns_stable_ids_in_order() {
        let (mut store, guid, first) = setup();
        let second = store
            .insert_node(&guid, "Track", "Track B", IndexMap::new())
            .unwrap();
        assert_eq!(store.stable_id(first).unwrap().local, LocalId(1));
        assert_eq!(store.stable_id(second).unwrap().local, LocalId(2));
        assert_eq!(store.enumerate_sub_nodes(&guid), vec![first, second]);
    }

    #[test]
    fn iterate_emits_length_before_elements() {
        let (store, _, node) = setup();
        let mut walk = store.iterate(node).unwrap();
        let mut paths = Vec::new();
        while let Some(step) = walk.next(true) {
            paths.push((step.path.to_string(), step.kind, step.structural));
        }
        assert_eq!(paths[0], ("title".into(), FieldKind::String, false));
        assert_eq!(paths[1], ("version".into(), FieldKind::Leaf, true));
        assert_eq!(paths[2], ("clips".into(), FieldKind::Container, false));
        assert_eq!(
            paths[3],
            ("clips.$len".into(), FieldKind::SequenceLength, false)
        );
        assert_eq!(paths[4], ("clips[0]".into(), FieldKind::Container, false));
        assert_eq!(paths[5], ("clips[0].start".into(), FieldKind::Leaf, false));
        assert_eq!(paths.len(), 10);
    }

    #[test]
    fn get_and_set_nested_leaf() {
        let (mut store, _, node) = setup();
        let path: PropertyPath = "clips[1].start".parse().unwrap();
        assert_eq!(store.get(node, &path), Some(FieldValue::Float(2.0)));
        store.set(node, &path, FieldValue::Float(4.5)).unwrap();
        assert_eq!(store.get(node, &path), Some(FieldValue::Float(4.5)));
    }

    #[test]
    fn set_length_grows_with_schema_default_and_truncates() {
        let (mut store, _, node) = setup();
        let len: PropertyPath = "clips.$len".parse().unwrap();
        store.set(node, &len, FieldValue::Length(3)).unwrap();
        assert_eq!(store.get(node, &len), Some(FieldValue::Length(3)));
        assert_eq!(
            store.get(node, &"clips[2].start".parse().unwrap()),
            Some(FieldValue::Float(0.0))
        );
        store.set(node, &len, FieldValue::Length(1)).unwrap();
        assert_eq!(store.kind_of(node, &"clips[1]".parse().unwrap()), None);
    }

    #[test]
    fn set_rejects_kind_mismatch_and_missing_path() {
        let (mut store, _, node) = setup();
        let result = store.set(node, &PropertyPath::field("title"), FieldValue::Int(1));
        assert!(matches!(result, Err(StoreError::KindMismatch { .. })));
        let result = store.set(node, &PropertyPath::field("nope"), FieldValue::Int(1));
        assert!(matches!(result, Err(StoreError::MissingField { .. })));
    }

    #[test]
    fn copy_is_transient_until_attached() {
        let (mut store, guid, node) = setup();
        let copy = store.instantiate_copy(node).unwrap();
        assert!(!store.is_persistent(copy));
        assert_eq!(store.fields(copy), store.fields(node));
        let id = store.add_sub_node(&guid, copy).unwrap();
        assert_eq!(store.stable_id(copy), Some(id));
        assert!(matches!(
            store.add_sub_node(&guid, copy),
            Err(StoreError::AlreadyAttached(_))
        ));
    }

    #[test]
    fn destroy_detaches_and_kills_handle() {
        let (mut store, guid, node) = setup();
        store.destroy(node).unwrap();
        assert!(!store.is_alive(node));
        assert!(store.enumerate_sub_nodes(&guid).is_empty());
        assert!(store.stable_id(node).is_none());
    }

    #[test]
    fn json_round_trip_preserves_ids_and_fields() {
        let (mut store, guid, node) = setup();
        store.set_primary(node).unwrap();
        let json = store.to_json().unwrap();
        let loaded = MemoryStore::from_json(&json).unwrap();

        let nodes = loaded.enumerate_sub_nodes(&guid);
        assert_eq!(nodes.len(), 1);
        assert_eq!(loaded.stable_id(nodes[0]), store.stable_id(node));
        assert_eq!(loaded.fields(nodes[0]), store.fields(node));
        assert!(loaded.is_primary_node(nodes[0]));
        assert!(loaded.is_structural("version"));
    }

    #[test]
    fn from_json_rejects_duplicate_local_ids() {
        let guid = AssetGuid::for_path("a");
        let json = serde_json::json!({
            "containers": [{
                "guid": guid.to_string(),
                "path": "a",
                "nodes": [
                    {"local": 1, "type_name": "T"},
                    {"local": 1, "type_name": "T"}
                ]
            }]
        });
        let result = MemoryStore::from_json(&json.to_string());
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn unique_asset_path_appends_counter() {
        let (mut store, _, _) = setup();
        assert_eq!(
            store.unique_asset_path("Assets/Intro.playable"),
            "Assets/Intro 1.playable"
        );
        store.create_container("Assets/Intro 1.playable").unwrap();
        assert_eq!(
            store.unique_asset_path("Assets/Intro.playable"),
            "Assets/Intro 2.playable"
        );
        assert_eq!(store.unique_asset_path("Assets/Other"), "Assets/Other");
    }

    #[test]
    fn define_field_rejects_duplicates() {
        let (mut store, _, node) = setup();
        store
            .define_field(node, "speed", FieldValue::Float(1.0))
            .unwrap();
        assert!(matches!(
            store.define_field(node, "speed", FieldValue::Float(2.0)),
            Err(StoreError::DuplicateField(_))
        ));
    }
}
