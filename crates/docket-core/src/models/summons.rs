//! Summons model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::{new_local_id, RecordType};
use crate::error::Error;
use crate::status::infer_status;

/// Role label used when the remote workspace has none
pub const DEFAULT_PERSON_ROLE: &str = "Unknown";

/// Lifecycle stage of a summons, derived from its flags and dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SummonsStatus {
    #[default]
    #[serde(rename = "Draft")]
    Draft,
    #[serde(rename = "Issued")]
    Issued,
    #[serde(rename = "Awaiting Appearance")]
    AwaitingAppearance,
    #[serde(rename = "Rescheduled")]
    Rescheduled,
    #[serde(rename = "Statement In Progress")]
    StatementInProgress,
    #[serde(rename = "Statement Completed", alias = "Closed")]
    StatementCompleted,
}

impl SummonsStatus {
    pub const ALL: [Self; 6] = [
        Self::Draft,
        Self::Issued,
        Self::AwaitingAppearance,
        Self::Rescheduled,
        Self::StatementInProgress,
        Self::StatementCompleted,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Issued => "Issued",
            Self::AwaitingAppearance => "Awaiting Appearance",
            Self::Rescheduled => "Rescheduled",
            Self::StatementInProgress => "Statement In Progress",
            Self::StatementCompleted => "Statement Completed",
        }
    }
}

impl fmt::Display for SummonsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummonsStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("Closed") {
            return Ok(Self::StatementCompleted);
        }
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown summons status: {trimmed}")))
    }
}

/// Independent lifecycle flags as recorded by officers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummonsFlags {
    pub is_issued: bool,
    pub is_served: bool,
    pub requests_reschedule: bool,
    pub statement_ongoing: bool,
    pub statement_recorded: bool,
    pub rescheduled_date_communicated: bool,
    pub followup_required: bool,
}

/// Calendar dates attached to a summons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummonsDates {
    pub issue_date: Option<NaiveDate>,
    pub appearance_date: Option<NaiveDate>,
    pub rescheduled_date: Option<NaiveDate>,
    pub statement_date: Option<NaiveDate>,
}

/// A summons issued under a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonsRecord {
    /// Local-pending or canonical identifier
    pub id: String,
    /// Case this summons belongs to, if linked
    pub case_id: Option<String>,
    pub person_name: String,
    pub person_role: String,
    pub phone: String,
    pub email: String,
    pub dates: SummonsDates,
    pub flags: SummonsFlags,
    /// Local-owned free text
    pub notes: String,
    /// Local-owned
    pub mode_of_service: Vec<String>,
    /// Local-owned
    pub purpose: Vec<String>,
    pub status: SummonsStatus,
    /// Summons this one was re-issued from
    pub previous_summon_id: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Last time the record was seen by a pull or accepted by a push (Unix ms)
    pub synced_at: Option<i64>,
}

impl SummonsRecord {
    /// Create a new local-only draft summons, pending its first push
    #[must_use]
    pub fn new(person_name: impl Into<String>, case_id: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: new_local_id(RecordType::Summons),
            case_id,
            person_name: person_name.into(),
            person_role: DEFAULT_PERSON_ROLE.to_string(),
            phone: String::new(),
            email: String::new(),
            dates: SummonsDates::default(),
            flags: SummonsFlags::default(),
            notes: String::new(),
            mode_of_service: Vec::new(),
            purpose: Vec::new(),
            status: SummonsStatus::Draft,
            previous_summon_id: None,
            created_at: now,
            updated_at: now,
            synced_at: None,
        }
    }

    /// Recompute `status` from the current flags and dates
    pub fn refresh_status(&mut self) {
        self.status = infer_status(&self.flags, &self.dates);
    }

    /// Compare the fields owned by the remote workspace.
    ///
    /// Notes, mode of service, and purpose are local-owned and excluded.
    #[must_use]
    pub fn same_remote_fields(&self, other: &Self) -> bool {
        self.case_id == other.case_id
            && self.person_name == other.person_name
            && self.person_role == other.person_role
            && self.phone == other.phone
            && self.email == other.email
            && self.dates == other.dates
            && self.flags == other.flags
            && self.status == other.status
            && self.previous_summon_id == other.previous_summon_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_parse_back() {
        for status in SummonsStatus::ALL {
            assert_eq!(status.as_str().parse::<SummonsStatus>().unwrap(), status);
        }
        assert_eq!(
            "closed".parse::<SummonsStatus>().unwrap(),
            SummonsStatus::StatementCompleted
        );
        assert!("Archived".parse::<SummonsStatus>().is_err());
    }

    #[test]
    fn status_serializes_as_label() {
        let json = serde_json::to_string(&SummonsStatus::AwaitingAppearance).unwrap();
        assert_eq!(json, "\"Awaiting Appearance\"");
    }

    #[test]
    fn refresh_status_follows_flags() {
        let mut summons = SummonsRecord::new("A. Witness", None);
        assert_eq!(summons.status, SummonsStatus::Draft);

        summons.flags.is_issued = true;
        summons.refresh_status();
        assert_eq!(summons.status, SummonsStatus::Issued);
    }

    #[test]
    fn remote_field_comparison_ignores_local_owned_fields() {
        let summons = SummonsRecord::new("A. Witness", Some("case-1".to_string()));
        let mut other = summons.clone();
        other.notes = "confidential".to_string();
        other.purpose.push("Statement".to_string());
        other.mode_of_service.push("Email".to_string());
        assert!(summons.same_remote_fields(&other));

        other.flags.is_served = true;
        assert!(!summons.same_remote_fields(&other));
    }
}
