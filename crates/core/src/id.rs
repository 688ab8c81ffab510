//! Record identifiers.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

const PROVISIONAL_PREFIX: &str = "tmp-";

/// Identifier of a record within its collection.
///
/// Persisted records carry the id assigned by the backend, which may arrive as a
/// JSON string or integer. Optimistic creates use a provisional id (see
/// [`RecordId::provisional`]) that is replaced once the backend answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a client-side placeholder id.
    ///
    /// Uses UUIDv7 (time-ordered) behind a `tmp-` prefix so it can never collide
    /// with a backend-assigned id.
    pub fn provisional() -> Self {
        Self(format!("{PROVISIONAL_PREFIX}{}", Uuid::now_v7()))
    }

    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("RecordId: empty"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawId::deserialize(deserializer)? {
            RawId::Text(s) => s.parse().map_err(serde::de::Error::custom),
            RawId::Signed(n) => Ok(Self(n.to_string())),
            RawId::Unsigned(n) => Ok(Self(n.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_string_and_integer() {
        let from_int: RecordId = serde_json::from_str("42").unwrap();
        let from_str: RecordId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_int, from_str);
        assert_eq!(from_int.as_str(), "42");
    }

    #[test]
    fn empty_string_is_rejected() {
        assert!(serde_json::from_str::<RecordId>("\"\"").is_err());
        assert!("   ".parse::<RecordId>().is_err());
    }

    #[test]
    fn provisional_ids_are_unique_and_flagged() {
        let a = RecordId::provisional();
        let b = RecordId::provisional();
        assert_ne!(a, b);
        assert!(a.is_provisional());
        assert!(!RecordId::from("7").is_provisional());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = RecordId::from(7u64);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");
    }
}
