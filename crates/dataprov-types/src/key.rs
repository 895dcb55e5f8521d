use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;

/// Key under which a data set stores an element.
///
/// By default this is the SHA-1 hex digest of the element's content, so two
/// content-equal elements share a key. Implementations may define another
/// unique key as long as it is stable for unchanged content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementKey(String);

impl ElementKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Checksum> for ElementKey {
    fn from(checksum: &Checksum) -> Self {
        Self(checksum.to_hex())
    }
}

impl From<&str> for ElementKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque key for key-value stores.
///
/// Keys are hashable, totally ordered, and serialize without loss so they
/// survive any store's persistence format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<&[u8]> for Key {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<&ElementKey> for Key {
    fn from(k: &ElementKey) -> Self {
        Self::Str(k.as_str().to_string())
    }
}
