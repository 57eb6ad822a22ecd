//! Stable identity primitives
//!
//! Provides [`AssetGuid`], [`LocalId`] and [`StableId`], the persisted identity
//! of a node, and [`NodeHandle`], the transient handle to a live node.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 16-byte container identifier
///
/// Derived from the container's asset path when the container is created and
/// persisted with it afterwards, so it survives reloads and renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetGuid([u8; 16]);

impl AssetGuid {
    /// Create a guid from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Create guid from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 16 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdError> {
        if bytes.len() != 16 {
            return Err(IdError::InvalidLength {
                expected: 16,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Derive a guid from an asset path (Blake3, truncated to 16 bytes)
    #[inline]
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        let hash = blake3::hash(path.as_bytes());
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&hash.as_bytes()[..16]);
        Self(arr)
    }

    /// Short string representation (first 8 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Check if guid is all zeros
    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        let mut i = 0;
        while i < 16 {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }
}

impl Display for AssetGuid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for AssetGuid {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for AssetGuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for AssetGuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct GuidVisitor;

        impl<'de> serde::de::Visitor<'de> for GuidVisitor {
            type Value = AssetGuid;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 16-byte guid as hex string or byte array")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                AssetGuid::from_slice(value).map_err(serde::de::Error::custom)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut arr = [0u8; 16];
                for (i, byte) in arr.iter_mut().enumerate() {
                    *byte = seq
                        .next_element()?
                        .ok_or_else(|| serde::de::Error::invalid_length(i, &"16 bytes"))?;
                }
                Ok(AssetGuid::new(arr))
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(GuidVisitor)
        } else {
            deserializer.deserialize_bytes(GuidVisitor)
        }
    }
}

/// Node identifier, unique within its container
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct LocalId(pub u64);

impl Display for LocalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted identity of a node: `(container, local id)`
///
/// Stable across process restarts and graph reloads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct StableId {
    pub container: AssetGuid,
    pub local: LocalId,
}

impl StableId {
    #[inline]
    #[must_use]
    pub const fn new(container: AssetGuid, local: LocalId) -> Self {
        Self { container, local }
    }
}

impl Display for StableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.container.short(), self.local)
    }
}

/// Transient handle to a live node
///
/// Valid for the lifetime of the store session only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(pub u64);

impl Display for NodeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors that can occur when parsing identifiers
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid guid length
    #[error("invalid guid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
