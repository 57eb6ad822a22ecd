//! StableReference - persisted node identity with a cached live handle
//!
//! Provides [`StableReference`], the identity handle stored in
//! correspondence tables, added/removed sets and override payloads.

use std::cell::Cell;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use variant_model::{AssetStore, NodeHandle, StableId};

/// Reference to a node in either graph
///
/// Equality, hashing and serialization use the [`StableId`] only. The live
/// handle found by [`StableReference::resolve`] is cached in a [`Cell`] and
/// revalidated on every use, so a destroyed node resolves to `None`.
///
/// An absent reference (no id) means "not yet created" or "deliberately
/// removed" depending on where it is stored.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "Option<StableId>", into = "Option<StableId>")]
pub struct StableReference {
    id: Option<StableId>,
    cached: Cell<Option<NodeHandle>>,
}

impl StableReference {
    /// The absent reference
    #[inline]
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Reference to a known id, with nothing cached
    #[inline]
    #[must_use]
    pub fn from_id(id: StableId) -> Self {
        Self {
            id: Some(id),
            cached: Cell::new(None),
        }
    }

    /// Identify a live node
    ///
    /// Fails soft: a dead node or a node outside any persisted container
    /// yields the absent reference.
    #[must_use]
    pub fn identify<S: AssetStore + ?Sized>(store: &S, node: NodeHandle) -> Self {
        match store.stable_id(node) {
            Some(id) => Self {
                id: Some(id),
                cached: Cell::new(Some(node)),
            },
            None => Self::absent(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<StableId> {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.id.is_none()
    }

    /// Resolve to a live node
    ///
    /// Uses the cached handle while it is alive and still carries this id;
    /// otherwise scans the id's container and caches the hit.
    /// O(container size) on a cache miss.
    pub fn resolve<S: AssetStore + ?Sized>(&self, store: &S) -> Option<NodeHandle> {
        let id = self.id?;
        if let Some(handle) = self.cached.get() {
            if store.is_alive(handle) && store.stable_id(handle) == Some(id) {
                return Some(handle);
            }
            self.cached.set(None);
        }

        let found = store
            .enumerate_sub_nodes(&id.container)
            .into_iter()
            .find(|node| store.stable_id(*node) == Some(id))?;
        self.cached.set(Some(found));
        Some(found)
    }

    /// Whether this reference resolves to a live node
    #[inline]
    pub fn is_present<S: AssetStore + ?Sized>(&self, store: &S) -> bool {
        self.resolve(store).is_some()
    }
}

impl PartialEq for StableReference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StableReference {}

impl Hash for StableReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialEq<StableId> for StableReference {
    fn eq(&self, other: &StableId) -> bool {
        self.id == Some(*other)
    }
}

impl From<Option<StableId>> for StableReference {
    fn from(id: Option<StableId>) -> Self {
        Self {
            id,
            cached: Cell::new(None),
        }
    }
}

impl From<StableId> for StableReference {
    fn from(id: StableId) -> Self {
        Self::from_id(id)
    }
}

impl From<StableReference> for Option<StableId> {
    fn from(reference: StableReference) -> Self {
        reference.id
    }
}

impl Debug for StableReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "StableReference({id})"),
            None => f.write_str("StableReference(absent)"),
        }
    }
}

impl Display for StableReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => Display::fmt(&id, f),
            None => f.write_str("absent"),
        }
    }
}
