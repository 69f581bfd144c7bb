//! Case model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::record::{new_local_id, RecordType};

/// Status label used when the remote workspace has no status for a case
pub const DEFAULT_CASE_STATUS: &str = "Unknown";

/// Department label used when the remote workspace has none
pub const DEFAULT_DEPARTMENT: &str = "Unknown";

/// A case tracked in both the remote workspace and the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Local-pending or canonical identifier
    pub id: String,
    pub name: String,
    /// External reference number (e.g. a registration number)
    pub reference_number: String,
    pub status: String,
    pub assigned_officers: Vec<String>,
    pub activity_types: Vec<String>,
    pub department: String,
    pub amount_involved: Option<f64>,
    pub date_opened: Option<NaiveDate>,
    pub is_active: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Last time the record was seen by a pull or accepted by a push (Unix ms)
    pub synced_at: Option<i64>,
}

impl CaseRecord {
    /// Create a new local-only case, pending its first push
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: new_local_id(RecordType::Case),
            name: name.into(),
            reference_number: String::new(),
            status: DEFAULT_CASE_STATUS.to_string(),
            assigned_officers: Vec::new(),
            activity_types: Vec::new(),
            department: DEFAULT_DEPARTMENT.to_string(),
            amount_involved: None,
            date_opened: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            synced_at: None,
        }
    }

    /// Compare the fields owned by the remote workspace.
    ///
    /// Cases carry no local-owned fields besides timestamps and the sync marker.
    #[must_use]
    pub fn same_remote_fields(&self, other: &Self) -> bool {
        self.name == other.name
            && self.reference_number == other.reference_number
            && self.status == other.status
            && self.assigned_officers == other.assigned_officers
            && self.activity_types == other.activity_types
            && self.department == other.department
            && self.amount_involved == other.amount_involved
            && self.date_opened == other.date_opened
            && self.is_active == other.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::is_canonical_id;

    #[test]
    fn new_case_is_local_pending() {
        let case = CaseRecord::new("State v. Doe");
        assert!(!is_canonical_id(&case.id));
        assert!(case.synced_at.is_none());
        assert!(case.is_active);
        assert_eq!(case.status, DEFAULT_CASE_STATUS);
    }

    #[test]
    fn remote_field_comparison_ignores_timestamps() {
        let case = CaseRecord::new("State v. Doe");
        let mut other = case.clone();
        other.updated_at += 1000;
        other.synced_at = Some(42);
        assert!(case.same_remote_fields(&other));

        other.assigned_officers.push("Insp. Rao".to_string());
        assert!(!case.same_remote_fields(&other));
    }
}
