//! Sync orchestrator.

use super::locks::RecordLocks;
use super::{pull, push};
use crate::config::SyncSettings;
use crate::models::{PushResult, RecordType, SyncReport, SyncResult};
use crate::remote::RemoteStore;
use crate::services::DatabaseService;

/// Drives pulls and pushes against one local store and one remote.
///
/// Hard failures never escape as errors: they are folded into the returned
/// [`SyncResult`] / [`PushResult`] so callers always get both summaries.
pub struct SyncEngine<R> {
    db: DatabaseService,
    remote: R,
    settings: SyncSettings,
    pub(super) locks: RecordLocks,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(db: DatabaseService, remote: R, settings: SyncSettings) -> Self {
        Self {
            db,
            remote,
            settings,
            locks: RecordLocks::new(),
        }
    }

    pub const fn database(&self) -> &DatabaseService {
        &self.db
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Pull cases, then summonses (summonses reference cases).
    pub async fn sync_all(&self) -> SyncReport {
        let cases = self.pull(RecordType::Case).await;
        let summons = self.pull(RecordType::Summons).await;
        SyncReport { cases, summons }
    }

    /// Reconcile one record type against the full remote snapshot.
    pub async fn pull(&self, record_type: RecordType) -> SyncResult {
        match pull::pull(self, record_type).await {
            Ok(result) => result,
            Err(error) => {
                tracing::error!("Pull of {record_type} failed: {error}");
                SyncResult::failed(error.to_string())
            }
        }
    }

    /// Propagate one local record to the remote workspace.
    pub async fn push_one(&self, record_type: RecordType, id: &str) -> PushResult {
        match push::push(self, record_type, id).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!("Push of {record_type} {id} failed: {error}");
                PushResult::failed(id, error.to_string())
            }
        }
    }
}
