//! Sync outcome models returned to surrounding components

use serde::{Deserialize, Serialize};

/// Outcome of pulling one record type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub added: usize,
    pub updated: usize,
    /// Tombstoned local records
    pub deleted: usize,
    /// Records seen remotely that needed no local write
    pub unchanged: usize,
    /// Per-record failures; these never abort the pull
    pub errors: Vec<String>,
    /// Set when the pull as a whole failed (transport, auth, timeout)
    pub failure: Option<String>,
}

impl SyncResult {
    /// Result for a pull that could not fetch the remote snapshot at all
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// True when the pull completed and every record reconciled
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.errors.is_empty()
    }

    /// Number of local writes this pull performed
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

/// Outcome of a full sync run, one result per record type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub cases: SyncResult,
    pub summons: SyncResult,
}

impl SyncReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.cases.is_success() && self.summons.is_success()
    }
}

/// Outcome of pushing one local record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    pub success: bool,
    /// Identifier the push was requested for
    pub id: String,
    /// Canonical identifier assigned when the push created the remote record
    pub new_id: Option<String>,
    pub error: Option<String>,
}

impl PushResult {
    #[must_use]
    pub fn succeeded(id: impl Into<String>, new_id: Option<String>) -> Self {
        Self {
            success: true,
            id: id.into(),
            new_id,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: id.into(),
            new_id: None,
            error: Some(error.into()),
        }
    }

    /// Identifier the record lives under after the push
    #[must_use]
    pub fn current_id(&self) -> &str {
        self.new_id.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_is_not_success() {
        let result = SyncResult::failed("Remote error: unauthorized");
        assert!(!result.is_success());
        assert_eq!(result.writes(), 0);
    }

    #[test]
    fn record_errors_mark_result_unsuccessful() {
        let result = SyncResult {
            added: 2,
            errors: vec!["page abc: missing id".to_string()],
            ..SyncResult::default()
        };
        assert!(!result.is_success());
        assert_eq!(result.writes(), 2);
    }

    #[test]
    fn push_result_current_id_prefers_new_id() {
        let created = PushResult::succeeded("case-1", Some("8f14e45f".to_string()));
        assert_eq!(created.current_id(), "8f14e45f");

        let updated = PushResult::succeeded("8f14e45f", None);
        assert_eq!(updated.current_id(), "8f14e45f");
    }
}
