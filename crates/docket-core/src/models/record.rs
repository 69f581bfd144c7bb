//! Record types and identifier helpers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{CaseRecord, SummonsRecord};
use crate::error::Error;

/// The two record collections kept in sync with the remote workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Case,
    Summons,
}

impl RecordType {
    /// Record types in pull order (summonses reference cases).
    pub const ALL: [Self; 2] = [Self::Case, Self::Summons];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Summons => "summons",
        }
    }

    /// Local table holding records of this type
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Case => "cases",
            Self::Summons => "summons",
        }
    }

    const fn local_prefix(self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Summons => "summon",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "case" | "cases" => Ok(Self::Case),
            "summons" | "summon" | "summonses" => Ok(Self::Summons),
            other => Err(Error::InvalidInput(format!("Unknown record type: {other}"))),
        }
    }
}

/// Whether an identifier was assigned by the remote system.
///
/// Remote identifiers are UUIDs, in either hyphenated or 32-hex form.
/// Anything else is a local-pending identifier.
/// A record of either type, as staged by the reconciler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocalRecord {
    Case(CaseRecord),
    Summons(SummonsRecord),
}

impl LocalRecord {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Case(case) => &case.id,
            Self::Summons(summons) => &summons.id,
        }
    }

    #[must_use]
    pub const fn record_type(&self) -> RecordType {
        match self {
            Self::Case(_) => RecordType::Case,
            Self::Summons(_) => RecordType::Summons,
        }
    }

    #[must_use]
    pub const fn synced_at(&self) -> Option<i64> {
        match self {
            Self::Case(case) => case.synced_at,
            Self::Summons(summons) => summons.synced_at,
        }
    }
}

impl From<CaseRecord> for LocalRecord {
    fn from(case: CaseRecord) -> Self {
        Self::Case(case)
    }
}

impl From<SummonsRecord> for LocalRecord {
    fn from(summons: SummonsRecord) -> Self {
        Self::Summons(summons)
    }
}

#[must_use]
pub fn is_canonical_id(id: &str) -> bool {
    Uuid::try_parse(id.trim()).is_ok()
}

/// Generate a local-pending identifier for a record created before it was pushed.
///
/// The shape (`case-1700000000000-a1b2`) can never parse as a UUID.
#[must_use]
pub fn new_local_id(record_type: RecordType) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::now_v7().simple().to_string();
    let tail = &suffix[suffix.len() - 4..];
    format!("{}-{millis}-{tail}", record_type.local_prefix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ids_are_uuid_shaped() {
        assert!(is_canonical_id("8f14e45f-ceea-467f-a0e6-6a3d9b1c2d3e"));
        assert!(is_canonical_id("8f14e45fceea467fa0e66a3d9b1c2d3e"));
        assert!(!is_canonical_id("case-1700000000000"));
        assert!(!is_canonical_id(""));
    }

    #[test]
    fn local_ids_are_never_canonical() {
        let id = new_local_id(RecordType::Case);
        assert!(id.starts_with("case-"));
        assert!(!is_canonical_id(&id));

        let id = new_local_id(RecordType::Summons);
        assert!(id.starts_with("summon-"));
        assert!(!is_canonical_id(&id));
    }

    #[test]
    fn record_type_parses_aliases() {
        assert_eq!("Cases".parse::<RecordType>().unwrap(), RecordType::Case);
        assert_eq!("summon".parse::<RecordType>().unwrap(), RecordType::Summons);
        assert!("warrant".parse::<RecordType>().is_err());
    }
}
