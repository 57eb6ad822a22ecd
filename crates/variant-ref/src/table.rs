//! Correspondence table between base and variant nodes
//!
//! Provides [`CorrespondenceTable`], a partial bijection between base
//! sub-nodes and variant sub-nodes with lookup from either side.

use crate::reference::StableReference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use variant_model::StableId;

/// One `(source, target)` pair
///
/// `source` is the base-side node, `target` the variant-side node. An
/// absent target with a present source is a tombstone: the base node was
/// removed from the variant on purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub source: StableReference,
    pub target: StableReference,
}

impl Mapping {
    #[inline]
    #[must_use]
    pub fn new(source: StableReference, target: StableReference) -> Self {
        Self { source, target }
    }

    #[inline]
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        !self.source.is_absent() && self.target.is_absent()
    }
}

/// Partial bijection between base and variant nodes
///
/// Entries keep insertion order. Two hash indexes (`source → entry`,
/// `target → entry`) are maintained together with the entries, and every
/// mutation rejects a second entry for an already-mapped source or target.
///
/// Serialized as the plain list of mappings; deserialization rebuilds the
/// indexes and fails on a list that violates the bijection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Mapping>", into = "Vec<Mapping>")]
pub struct CorrespondenceTable {
    entries: Vec<Mapping>,
    by_source: HashMap<StableId, usize>,
    by_target: HashMap<StableId, usize>,
}

impl CorrespondenceTable {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.entries.iter()
    }

    /// Entry whose source is `id`
    #[inline]
    #[must_use]
    pub fn by_source(&self, id: &StableId) -> Option<&Mapping> {
        self.by_source.get(id).map(|&i| &self.entries[i])
    }

    /// Entry whose target is `id`
    #[inline]
    #[must_use]
    pub fn by_target(&self, id: &StableId) -> Option<&Mapping> {
        self.by_target.get(id).map(|&i| &self.entries[i])
    }

    #[inline]
    #[must_use]
    pub fn contains_source(&self, id: &StableId) -> bool {
        self.by_source.contains_key(id)
    }

    #[inline]
    #[must_use]
    pub fn contains_target(&self, id: &StableId) -> bool {
        self.by_target.contains_key(id)
    }

    /// Insert `source → target` unless `source` is already mapped
    ///
    /// Returns `true` if an entry was added.
    ///
    /// # Errors
    /// Fails if `source` is absent or `target` is already mapped
    pub fn ensure(
        &mut self,
        source: StableReference,
        target: StableReference,
    ) -> Result<bool, CorrespondenceError> {
        let id = source.id().ok_or(CorrespondenceError::AbsentSource)?;
        if self.by_source.contains_key(&id) {
            return Ok(false);
        }
        self.upsert(source, target)?;
        Ok(true)
    }

    /// Update the entry for `source` in place, or append a new one
    ///
    /// # Errors
    /// Fails if `source` is absent, or if `target` is already the target of
    /// a different entry
    pub fn upsert(
        &mut self,
        source: StableReference,
        target: StableReference,
    ) -> Result<(), CorrespondenceError> {
        let source_id = source.id().ok_or(CorrespondenceError::AbsentSource)?;
        let slot = self.by_source.get(&source_id).copied();

        if let Some(target_id) = target.id() {
            if let Some(&owner) = self.by_target.get(&target_id) {
                if Some(owner) != slot {
                    return Err(CorrespondenceError::TargetAlreadyMapped {
                        target: target_id,
                        owner: self.entries[owner].source.id(),
                    });
                }
            }
        }

        match slot {
            Some(index) => {
                if let Some(old) = self.entries[index].target.id() {
                    self.by_target.remove(&old);
                }
                if let Some(new) = target.id() {
                    self.by_target.insert(new, index);
                }
                self.entries[index] = Mapping::new(source, target);
            }
            None => {
                let index = self.entries.len();
                self.by_source.insert(source_id, index);
                if let Some(new) = target.id() {
                    self.by_target.insert(new, index);
                }
                self.entries.push(Mapping::new(source, target));
            }
        }
        Ok(())
    }

    /// The node on the other side of `reference`
    ///
    /// If `reference` is the source of an entry, that entry's target; if it
    /// is the target of an entry, that entry's source; otherwise `reference`
    /// itself. When both match different entries, the earlier entry wins.
    /// Absent references pass through.
    #[must_use]
    pub fn correspond(&self, reference: &StableReference) -> StableReference {
        let Some(id) = reference.id() else {
            return reference.clone();
        };
        match (self.by_source.get(&id), self.by_target.get(&id)) {
            (Some(&s), Some(&t)) if t < s => self.entries[t].source.clone(),
            (Some(&s), _) => self.entries[s].target.clone(),
            (None, Some(&t)) => self.entries[t].source.clone(),
            (None, None) => reference.clone(),
        }
    }
}

impl PartialEq for CorrespondenceTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for CorrespondenceTable {}

impl TryFrom<Vec<Mapping>> for CorrespondenceTable {
    type Error = CorrespondenceError;

    fn try_from(entries: Vec<Mapping>) -> Result<Self, Self::Error> {
        let mut table = Self::new();
        for mapping in entries {
            let source = mapping.source.id().ok_or(CorrespondenceError::AbsentSource)?;
            if table.by_source.contains_key(&source) {
                return Err(CorrespondenceError::SourceAlreadyMapped(source));
            }
            table.upsert(mapping.source, mapping.target)?;
        }
        Ok(table)
    }
}

impl From<CorrespondenceTable> for Vec<Mapping> {
    fn from(table: CorrespondenceTable) -> Self {
        table.entries
    }
}

/// Violations of the correspondence bijection
#[derive(Debug, thiserror::Error)]
pub enum CorrespondenceError {
    /// Entries are keyed by source; an absent source cannot be stored
    #[error("mapping source is absent")]
    AbsentSource,

    /// Two entries share a source
    #[error("source {0} is mapped twice")]
    SourceAlreadyMapped(StableId),

    /// Two entries share a target
    #[error("target {target} is already mapped from {}", display_owner(.owner))]
    TargetAlreadyMapped {
        target: StableId,
        owner: Option<StableId>,
    },
}

fn display_owner(owner: &Option<StableId>) -> String {
    owner.map_or_else(|| "absent".to_string(), |id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use variant_model::{AssetGuid, LocalId};

    fn base(n: u64) -> StableReference {
        StableReference::from_id(StableId::new(AssetGuid::new([1; 16]), LocalId(n)))
    }

    fn variant(n: u64) -> StableReference {
        StableReference::from_id(StableId::new(AssetGuid::new([2; 16]), LocalId(n)))
    }

    #[test]
    fn correspond_both_directions() {
        let mut table = CorrespondenceTable::new();
        table.upsert(base(1), variant(10)).unwrap();
        assert_eq!(table.correspond(&base(1)), variant(10));
        assert_eq!(table.correspond(&variant(10)), base(1));
    }

    #[test]
    fn correspond_unmapped_passes_through() {
        let table = CorrespondenceTable::new();
        assert_eq!(table.correspond(&base(5)), base(5));
        assert!(table.correspond(&StableReference::absent()).is_absent());
    }

    #[test]
    fn correspond_tombstone_yields_absent() {
        let mut table = CorrespondenceTable::new();
        table.upsert(base(1), StableReference::absent()).unwrap();
        assert!(table.correspond(&base(1)).is_absent());
        assert!(table.iter().next().unwrap().is_tombstone());
        // absent never matches a tombstone's target
        assert!(table.correspond(&StableReference::absent()).is_absent());
    }

    #[test]
    fn correspond_earlier_entry_wins() {
        let mut table = CorrespondenceTable::new();
        // x is the target of entry 0 and the source of entry 1
        table.upsert(base(1), base(2)).unwrap();
        table.upsert(base(2), variant(3)).unwrap();
        assert_eq!(table.correspond(&base(2)), base(1));
    }

    #[test]
    fn upsert_updates_in_place() {
        let mut table = CorrespondenceTable::new();
        table.upsert(base(1), StableReference::absent()).unwrap();
        table.upsert(base(2), variant(20)).unwrap();
        table.upsert(base(1), variant(10)).unwrap();

        assert_eq!(table.len(), 2);
        let first = table.iter().next().unwrap();
        assert_eq!(first.source, base(1));
        assert_eq!(first.target, variant(10));
        assert!(table.contains_target(&variant(10).id().unwrap()));
    }

    #[test]
    fn upsert_retarget_releases_old_target() {
        let mut table = CorrespondenceTable::new();
        table.upsert(base(1), variant(10)).unwrap();
        table.upsert(base(1), variant(11)).unwrap();
        assert!(!table.contains_target(&variant(10).id().unwrap()));
        table.upsert(base(2), variant(10)).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn upsert_rejects_shared_target() {
        let mut table = CorrespondenceTable::new();
        table.upsert(base(1), variant(10)).unwrap();
        let err = table.upsert(base(2), variant(10)).unwrap_err();
        let CorrespondenceError::TargetAlreadyMapped { target, owner } = &err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(Some(*target), variant(10).id());
        assert_eq!(*owner, base(1).id());
        assert!(err.to_string().contains(&base(1).id().unwrap().to_string()));
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn upsert_rejects_absent_source() {
        let mut table = CorrespondenceTable::new();
        let result = table.upsert(StableReference::absent(), variant(1));
        assert!(matches!(result, Err(CorrespondenceError::AbsentSource)));
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut table = CorrespondenceTable::new();
        assert!(table.ensure(base(0), variant(0)).unwrap());
        assert!(!table.ensure(base(0), variant(0)).unwrap());
        assert!(!table.ensure(base(0), variant(9)).unwrap());
        assert_eq!(table.correspond(&base(0)), variant(0));
    }

    #[test]
    fn serde_round_trip_rebuilds_indexes() {
        let mut table = CorrespondenceTable::new();
        table.upsert(base(1), variant(10)).unwrap();
        table.upsert(base(2), StableReference::absent()).unwrap();

        let json = serde_json::to_string(&table).unwrap();
        let back: CorrespondenceTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.correspond(&variant(10)), base(1));
    }

    #[test]
    fn deserialize_rejects_duplicate_target() {
        let entries = vec![
            Mapping::new(base(1), variant(10)),
            Mapping::new(base(2), variant(10)),
        ];
        let json = serde_json::to_string(&entries).unwrap();
        let result: Result<CorrespondenceTable, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    #[test]
    fn deserialize_rejects_duplicate_source() {
        let entries = vec![
            Mapping::new(base(1), variant(10)),
            Mapping::new(base(1), variant(11)),
        ];
        let result = CorrespondenceTable::try_from(entries);
        assert!(matches!(
            result,
            Err(CorrespondenceError::SourceAlreadyMapped(_))
        ));
    }
}
