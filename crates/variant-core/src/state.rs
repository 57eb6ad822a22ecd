//! Persisted per-variant state
//!
//! The state lives as JSON in the `state` field of the variant container's
//! bookkeeping node. That node is hidden and skipped by every enumeration.

use crate::error::{Result, VariantError};
use serde::{Deserialize, Serialize};
use variant_model::{AssetGuid, FieldValue, NodeHandle, PropertyPath, Store};
use variant_ref::StableReference;
use variant_sync::Customizations;

/// Name of the bookkeeping field holding the state
pub const STATE_FIELD: &str = "state";

/// Everything the engine persists for one variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantState {
    /// Primary node of the base container
    pub base: StableReference,
    #[serde(flatten)]
    pub customizations: Customizations,
}

impl VariantState {
    #[must_use]
    pub fn new(base: StableReference) -> Self {
        Self {
            base,
            customizations: Customizations::new(),
        }
    }

    /// Serialize to the JSON stored in the bookkeeping node
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse stored JSON, rejecting tables that violate the bijection
    ///
    /// # Errors
    /// Returns [`VariantError::CorruptState`] on malformed state
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Read the state stored on `bookkeeping`
    ///
    /// # Errors
    /// Returns [`VariantError::CorruptState`] if the field is missing or
    /// malformed
    pub fn load<S: Store + ?Sized>(store: &S, bookkeeping: NodeHandle) -> Result<Self> {
        match store.get(bookkeeping, &state_path()) {
            Some(FieldValue::Data(value)) => Self::from_value(value),
            Some(other) => Err(VariantError::CorruptState(format!(
                "'{STATE_FIELD}' holds {:?}, expected data",
                other.kind()
            ))),
            None => Err(VariantError::CorruptState(format!(
                "bookkeeping node has no '{STATE_FIELD}' field"
            ))),
        }
    }

    /// Write the state to `bookkeeping` and persist it
    ///
    /// # Errors
    /// Returns error if serialization or the store fails
    pub fn save<S: Store + ?Sized>(&self, store: &mut S, bookkeeping: NodeHandle) -> Result<()> {
        store.set(bookkeeping, &state_path(), FieldValue::Data(self.to_value()?))?;
        store.persist(bookkeeping)?;
        Ok(())
    }
}

fn state_path() -> PropertyPath {
    PropertyPath::field(STATE_FIELD)
}

/// Find the bookkeeping node of a container
pub fn find_bookkeeping<S: Store + ?Sized>(
    store: &S,
    container: &AssetGuid,
    type_name: &str,
) -> Option<NodeHandle> {
    store
        .enumerate_sub_nodes(container)
        .into_iter()
        .find(|&node| store.type_name(node).as_deref() == Some(type_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use variant_model::{AssetFactory, AssetStore, LocalId, MemoryStore, StableId};
    use variant_sync::PropertyOverride;

    fn sample() -> VariantState {
        let base = StableId::new(AssetGuid::new([1; 16]), LocalId(1));
        let variant = StableId::new(AssetGuid::new([2; 16]), LocalId(1));
        let mut state = VariantState::new(base.into());
        state
            .customizations
            .table
            .upsert(base.into(), variant.into())
            .unwrap();
        state
            .customizations
            .overrides
            .insert(PropertyOverride::capture(base.into(), PropertyPath::field("label"), &"B".into()).unwrap());
        state
    }

    #[test]
    fn json_round_trip() {
        let state = sample();
        let back = VariantState::from_value(state.to_value().unwrap()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn json_layout_is_flat() {
        let json = sample().to_value().unwrap();
        assert!(json.get("base").is_some());
        assert!(json.get("table").is_some());
        assert!(json.get("overrides").is_some());
        assert!(json.get("customizations").is_none());
    }

    #[test]
    fn rejects_bijection_violation() {
        let a = StableId::new(AssetGuid::new([1; 16]), LocalId(1));
        let b = StableId::new(AssetGuid::new([1; 16]), LocalId(2));
        let t = StableId::new(AssetGuid::new([2; 16]), LocalId(9));
        let json = serde_json::json!({
            "base": a,
            "table": [
                {"source": a, "target": t},
                {"source": b, "target": t}
            ]
        });
        assert!(matches!(
            VariantState::from_value(json),
            Err(VariantError::CorruptState(_))
        ));
    }

    #[test]
    fn save_then_load_through_store() {
        let mut store = MemoryStore::new();
        let guid = store.create_container("Assets/V.playable").unwrap();
        let node = store.create_node("VariantData");
        store
            .define_field(node, STATE_FIELD, FieldValue::Data(serde_json::Value::Null))
            .unwrap();
        store.add_sub_node(&guid, node).unwrap();

        let state = sample();
        state.save(&mut store, node).unwrap();
        assert_eq!(VariantState::load(&store, node).unwrap(), state);
        assert_eq!(find_bookkeeping(&store, &guid, "VariantData"), Some(node));
        assert_eq!(find_bookkeeping(&store, &guid, "Other"), None);
    }

    #[test]
    fn load_without_state_field_is_corrupt() {
        let mut store = MemoryStore::new();
        let guid = store.create_container("Assets/V.playable").unwrap();
        let node = store.create_node("VariantData");
        store.add_sub_node(&guid, node).unwrap();
        assert!(matches!(
            VariantState::load(&store, node),
            Err(VariantError::CorruptState(_))
        ));
    }
}
