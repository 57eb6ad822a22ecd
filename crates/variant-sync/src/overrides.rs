//! Recorded field overrides
//!
//! A [`PropertyOverride`] is one field value that differs between a variant
//! node and its base counterpart, keyed by the *base* node so it survives
//! re-cloning. Scalar values are stored as JSON text and decoded back
//! against the destination field's current representation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use variant_model::{FieldKind, FieldValue, PropertyPath};
use variant_ref::StableReference;

/// JSON text of a scalar field value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalarBlob(String);

impl ScalarBlob {
    /// Encode a non-reference, non-container value
    ///
    /// # Errors
    /// Fails for containers and references, which have no scalar form
    pub fn encode(value: &FieldValue) -> Result<Self, OverrideError> {
        let json = match value {
            FieldValue::Bool(v) => serde_json::Value::from(*v),
            FieldValue::Int(v) => serde_json::Value::from(*v),
            FieldValue::Float(v) => encode_float(*v),
            FieldValue::String(v) => serde_json::Value::from(v.as_str()),
            FieldValue::Length(v) => serde_json::Value::from(*v),
            FieldValue::Data(v) | FieldValue::Polymorphic(v) => v.clone(),
            FieldValue::Container | FieldValue::Reference(_) => {
                return Err(OverrideError::NotScalar(value.kind()))
            }
        };
        Ok(Self(serde_json::to_string(&json)?))
    }

    /// Wrap already-encoded JSON text
    #[inline]
    #[must_use]
    pub fn from_json(json: impl Into<String>) -> Self {
        Self(json.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode into the representation of `like`
    ///
    /// `like` is the destination field's current value; only its variant is
    /// used. A number decoded into an `Int` field must be integral.
    ///
    /// # Errors
    /// Fails on malformed JSON or when the JSON does not fit the field
    pub fn decode(&self, like: &FieldValue) -> Result<FieldValue, OverrideError> {
        let json: serde_json::Value = serde_json::from_str(&self.0)?;
        let mismatch = || OverrideError::Decode {
            expected: like.kind(),
            blob: self.0.clone(),
        };
        Ok(match like {
            FieldValue::Bool(_) => FieldValue::Bool(json.as_bool().ok_or_else(mismatch)?),
            FieldValue::Int(_) => FieldValue::Int(json.as_i64().ok_or_else(mismatch)?),
            FieldValue::Float(_) => FieldValue::Float(decode_float(&json).ok_or_else(mismatch)?),
            FieldValue::String(_) => {
                FieldValue::String(json.as_str().ok_or_else(mismatch)?.to_string())
            }
            FieldValue::Length(_) => {
                let len = json.as_u64().ok_or_else(mismatch)?;
                FieldValue::Length(usize::try_from(len).map_err(|_| mismatch())?)
            }
            FieldValue::Data(_) => FieldValue::Data(json),
            FieldValue::Polymorphic(_) => FieldValue::Polymorphic(json),
            FieldValue::Container | FieldValue::Reference(_) => return Err(mismatch()),
        })
    }
}

/// JSON has no non-finite numbers; they travel as strings
const NAN_TOKEN: &str = "NaN";
const INF_TOKEN: &str = "inf";
const NEG_INF_TOKEN: &str = "-inf";

fn encode_float(v: f64) -> serde_json::Value {
    if v.is_nan() {
        NAN_TOKEN.into()
    } else if v == f64::INFINITY {
        INF_TOKEN.into()
    } else if v == f64::NEG_INFINITY {
        NEG_INF_TOKEN.into()
    } else {
        serde_json::Value::from(v)
    }
}

fn decode_float(json: &serde_json::Value) -> Option<f64> {
    match json.as_str() {
        Some(NAN_TOKEN) => Some(f64::NAN),
        Some(INF_TOKEN) => Some(f64::INFINITY),
        Some(NEG_INF_TOKEN) => Some(f64::NEG_INFINITY),
        Some(_) => None,
        None => json.as_f64(),
    }
}

/// Value carried by an override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OverridePayload {
    Scalar(ScalarBlob),
    /// Base-side reference; remapped into the variant on replay
    Reference(StableReference),
}

/// One recorded field override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOverride {
    /// Base node the override applies to
    pub source: StableReference,
    pub path: PropertyPath,
    pub payload: OverridePayload,
}

impl PropertyOverride {
    /// Capture a field value
    ///
    /// References become reference payloads as given; callers pass the
    /// base-side reference. Everything else is encoded as a scalar blob.
    ///
    /// # Errors
    /// Fails for container values
    pub fn capture(
        source: StableReference,
        path: PropertyPath,
        value: &FieldValue,
    ) -> Result<Self, OverrideError> {
        let payload = match value {
            FieldValue::Reference(id) => OverridePayload::Reference(StableReference::from(*id)),
            other => OverridePayload::Scalar(ScalarBlob::encode(other)?),
        };
        Ok(Self {
            source,
            path,
            payload,
        })
    }

    /// Short human-readable form of the payload
    #[must_use]
    pub fn payload_summary(&self) -> String {
        match &self.payload {
            OverridePayload::Scalar(blob) => blob.as_str().to_string(),
            OverridePayload::Reference(r) => format!("-> {r}"),
        }
    }
}

type OverrideKey = (StableReference, PropertyPath);

/// Overrides keyed by `(source, path)` in recording order
///
/// Inserting an override for an existing key replaces it in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PropertyOverride>", into = "Vec<PropertyOverride>")]
pub struct OverrideSet {
    entries: IndexMap<OverrideKey, PropertyOverride>,
}

impl OverrideSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replacing any override with the same source and path
    ///
    /// Returns the replaced override.
    pub fn insert(&mut self, value: PropertyOverride) -> Option<PropertyOverride> {
        let key = (value.source.clone(), value.path.clone());
        self.entries.insert(key, value)
    }

    #[must_use]
    pub fn get(&self, source: &StableReference, path: &PropertyPath) -> Option<&PropertyOverride> {
        self.entries.get(&(source.clone(), path.clone()))
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PropertyOverride> {
        self.entries.values()
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

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl From<Vec<PropertyOverride>> for OverrideSet {
    fn from(values: Vec<PropertyOverride>) -> Self {
        let mut set = Self::new();
        for value in values {
            set.insert(value);
        }
        set
    }
}

impl From<OverrideSet> for Vec<PropertyOverride> {
    fn from(set: OverrideSet) -> Self {
        set.entries.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a OverrideSet {
    type Item = &'a PropertyOverride;
    type IntoIter = indexmap::map::Values<'a, OverrideKey, PropertyOverride>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

/// Override encoding errors
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    /// Value has no scalar encoding
    #[error("{0:?} values cannot be stored as scalar overrides")]
    NotScalar(FieldKind),

    /// Blob does not fit the destination field
    #[error("cannot decode {blob} as {expected:?}")]
    Decode { expected: FieldKind, blob: String },

    /// Blob is not valid JSON
    #[error("malformed override blob: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use variant_model::{AssetGuid, LocalId, StableId};

    fn node(n: u64) -> StableReference {
        StableReference::from_id(StableId::new(AssetGuid::new([3; 16]), LocalId(n)))
    }

    fn path(s: &str) -> PropertyPath {
        s.parse().unwrap()
    }

    #[test]
    fn capture_string_as_scalar() {
        let ov = PropertyOverride::capture(node(1), path("title"), &"B".into()).unwrap();
        assert_eq!(ov.payload, OverridePayload::Scalar(ScalarBlob::from_json("\"B\"")));
        let OverridePayload::Scalar(blob) = &ov.payload else {
            panic!("expected scalar payload");
        };
        assert_eq!(
            blob.decode(&FieldValue::from("A")).unwrap(),
            FieldValue::from("B")
        );
    }

    #[test]
    fn capture_reference_keeps_reference() {
        let target = node(9).id();
        let ov =
            PropertyOverride::capture(node(1), path("track"), &FieldValue::Reference(target))
                .unwrap();
        assert_eq!(ov.payload, OverridePayload::Reference(node(9)));
        assert_eq!(ov.payload_summary(), format!("-> {}", node(9)));
    }

    #[test]
    fn capture_rejects_container() {
        let result = PropertyOverride::capture(node(1), path("clips"), &FieldValue::Container);
        assert!(matches!(
            result,
            Err(OverrideError::NotScalar(FieldKind::Container))
        ));
    }

    #[test]
    fn decode_uses_destination_representation() {
        let blob = ScalarBlob::encode(&FieldValue::Int(4)).unwrap();
        assert_eq!(blob.as_str(), "4");
        assert_eq!(
            blob.decode(&FieldValue::Float(0.0)).unwrap(),
            FieldValue::Float(4.0)
        );
        assert_eq!(
            blob.decode(&FieldValue::Length(0)).unwrap(),
            FieldValue::Length(4)
        );
        assert_eq!(
            blob.decode(&FieldValue::Data(serde_json::Value::Null)).unwrap(),
            FieldValue::Data(serde_json::json!(4))
        );
    }

    #[test]
    fn non_finite_floats_survive_encoding() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let blob = ScalarBlob::encode(&FieldValue::Float(v)).unwrap();
            let back = blob.decode(&FieldValue::Float(0.0)).unwrap();
            assert!(back.same_value(&FieldValue::Float(v)), "{v} came back as {back:?}");
        }
        assert_eq!(
            ScalarBlob::encode(&FieldValue::Float(f64::NAN)).unwrap().as_str(),
            r#""NaN""#
        );
        assert!(ScalarBlob::from_json(r#""fast""#)
            .decode(&FieldValue::Float(0.0))
            .is_err());
    }

    #[test]
    fn decode_rejects_fraction_into_int() {
        let blob = ScalarBlob::encode(&FieldValue::Float(1.5)).unwrap();
        assert!(matches!(
            blob.decode(&FieldValue::Int(0)),
            Err(OverrideError::Decode {
                expected: FieldKind::Leaf,
                ..
            })
        ));
    }

    #[test]
    fn decode_rejects_type_mismatch_and_garbage() {
        let blob = ScalarBlob::encode(&FieldValue::from("x")).unwrap();
        assert!(blob.decode(&FieldValue::Bool(false)).is_err());
        assert!(blob.decode(&FieldValue::Reference(None)).is_err());
        let garbage = ScalarBlob::from_json("{not json");
        assert!(matches!(
            garbage.decode(&FieldValue::Int(0)),
            Err(OverrideError::Json(_))
        ));
    }

    #[test]
    fn set_replaces_same_key_in_place() {
        let mut set = OverrideSet::new();
        set.insert(PropertyOverride::capture(node(1), path("a"), &1i64.into()).unwrap());
        set.insert(PropertyOverride::capture(node(2), path("a"), &2i64.into()).unwrap());
        let old = set.insert(PropertyOverride::capture(node(1), path("a"), &3i64.into()).unwrap());

        assert!(old.is_some());
        assert_eq!(set.len(), 2);
        let first = set.iter().next().unwrap();
        assert_eq!(first.source, node(1));
        assert_eq!(first.payload_summary(), "3");
        assert!(set.get(&node(2), &path("a")).is_some());
        assert!(set.get(&node(2), &path("b")).is_none());
    }

    #[test]
    fn set_serializes_as_list() {
        let mut set = OverrideSet::new();
        set.insert(PropertyOverride::capture(node(1), path("clips[0].start"), &2.5f64.into()).unwrap());
        set.insert(
            PropertyOverride::capture(node(1), path("target"), &FieldValue::Reference(None))
                .unwrap(),
        );
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0]["path"], "clips[0].start");
        assert_eq!(json[0]["payload"]["kind"], "scalar");
        assert_eq!(json[0]["payload"]["value"], "2.5");
        assert_eq!(json[1]["payload"]["kind"], "reference");
        assert!(json[1]["payload"]["value"].is_null());

        let back: OverrideSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn clear_empties_set() {
        let mut set = OverrideSet::new();
        set.insert(PropertyOverride::capture(node(1), path("a"), &true.into()).unwrap());
        set.clear();
        assert!(set.is_empty());
    }
}
