//! Record identity: authoritative ids from the remote store and provisional
//! `temp-` ids issued locally before confirmation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// Reserved prefix marking a provisional id. Never used by the remote store.
pub const PROVISIONAL_PREFIX: &str = "temp-";

static LAST_ISSUED_MS: AtomicI64 = AtomicI64::new(0);

/// Identifier of a synchronizable record.
///
/// Authoritative ids arrive from the API as numbers or strings and are kept in
/// their textual form. Provisional ids are `temp-<timestamp>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    /// Issue a fresh provisional id (`temp-<monotonic ms timestamp>`).
    #[must_use]
    pub fn provisional() -> Self {
        Self(format!("{PROVISIONAL_PREFIX}{}", next_timestamp()))
    }

    /// Issue an authoritative-looking id (a monotonic ms timestamp), used for
    /// records written while online and expected to be confirmed right away.
    #[must_use]
    pub fn timestamped() -> Self {
        Self(next_timestamp().to_string())
    }

    /// Whether this id was issued locally and never confirmed.
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_PREFIX)
    }

    /// The provisional form of this id. Keeps the timestamp so the record is
    /// still recognisable in logs.
    #[must_use]
    pub fn to_provisional(&self) -> Self {
        if self.is_provisional() {
            self.clone()
        } else {
            Self(format!("{PROVISIONAL_PREFIX}{}", self.0))
        }
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Strictly increasing millisecond timestamps, so two ids issued within the
/// same millisecond never collide.
fn next_timestamp() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_ISSUED_MS.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_ISSUED_MS.compare_exchange_weak(
            last,
            candidate,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput("record id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(value) => Self::from(value),
            RawId::Text(value) => Self(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_ids_carry_reserved_prefix() {
        let id = RecordId::provisional();
        assert!(id.as_str().starts_with("temp-"));
        assert!(id.is_provisional());
        assert!(!RecordId::timestamped().is_provisional());
    }

    #[test]
    fn issued_ids_are_unique_within_a_millisecond() {
        let ids: Vec<RecordId> = (0..200).map(|_| RecordId::provisional()).collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn to_provisional_keeps_timestamp() {
        let id = RecordId::from(1_700_000_000_000);
        assert_eq!(id.to_provisional().as_str(), "temp-1700000000000");
        let temp = RecordId::from("temp-5");
        assert_eq!(temp.to_provisional(), temp);
    }

    #[test]
    fn deserializes_numeric_and_text_ids() {
        let numeric: RecordId = serde_json::from_str("42").unwrap();
        let text: RecordId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(numeric, text);
        assert_eq!(serde_json::to_string(&numeric).unwrap(), "\"42\"");
    }

    #[test]
    fn parse_rejects_blank_ids() {
        assert!("  ".parse::<RecordId>().is_err());
        assert_eq!(" 7 ".parse::<RecordId>().unwrap().as_str(), "7");
    }
}
