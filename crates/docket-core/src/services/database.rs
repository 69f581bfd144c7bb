//! Shared database service wrapper used by the sync engine and its callers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    self, CaseRepository, Database, LibSqlCaseRepository, LibSqlSummonsRepository, PullOp,
    SummonsRepository,
};
use crate::models::{CaseRecord, LocalRecord, RecordType, SummonsFlags, SummonsRecord};
use crate::{Error, Result};

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening local store at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem path of the store, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// List cases newest-first.
    pub async fn list_cases(&self, limit: usize, offset: usize) -> Result<Vec<CaseRecord>> {
        let db = self.db.lock().await;
        LibSqlCaseRepository::new(db.connection())
            .list(limit, offset)
            .await
    }

    /// Fetch a case by id.
    pub async fn get_case(&self, id: &str) -> Result<Option<CaseRecord>> {
        let db = self.db.lock().await;
        LibSqlCaseRepository::new(db.connection()).get(id).await
    }

    /// Create a local-pending case.
    pub async fn create_case(&self, case: &CaseRecord) -> Result<CaseRecord> {
        if case.name.trim().is_empty() {
            return Err(Error::InvalidInput("case name cannot be empty".to_string()));
        }

        let db = self.db.lock().await;
        let repo = LibSqlCaseRepository::new(db.connection());
        repo.insert(case).await?;
        repo.get(&case.id)
            .await?
            .ok_or_else(|| Error::NotFound(case.id.clone()))
    }

    /// Save a local edit to a case.
    pub async fn update_case(&self, case: &CaseRecord) -> Result<CaseRecord> {
        let db = self.db.lock().await;
        let repo = LibSqlCaseRepository::new(db.connection());
        if !repo.update(case).await? {
            return Err(Error::NotFound(case.id.clone()));
        }
        repo.get(&case.id)
            .await?
            .ok_or_else(|| Error::NotFound(case.id.clone()))
    }

    /// Delete a case and every summons referencing it.
    pub async fn delete_case(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        if db::delete_case_cascade(db.connection(), id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(id.to_string()))
        }
    }

    /// List summonses newest-first.
    pub async fn list_summons(&self, limit: usize, offset: usize) -> Result<Vec<SummonsRecord>> {
        let db = self.db.lock().await;
        LibSqlSummonsRepository::new(db.connection())
            .list(limit, offset)
            .await
    }

    /// List the summonses of one case.
    pub async fn list_summons_for_case(&self, case_id: &str) -> Result<Vec<SummonsRecord>> {
        let db = self.db.lock().await;
        LibSqlSummonsRepository::new(db.connection())
            .list_by_case(case_id)
            .await
    }

    /// Fetch a summons by id.
    pub async fn get_summons(&self, id: &str) -> Result<Option<SummonsRecord>> {
        let db = self.db.lock().await;
        LibSqlSummonsRepository::new(db.connection()).get(id).await
    }

    /// Create a local-pending summons; its status is derived from its flags.
    pub async fn create_summons(&self, summons: &SummonsRecord) -> Result<SummonsRecord> {
        let mut summons = summons.clone();
        summons.refresh_status();

        let db = self.db.lock().await;
        let repo = LibSqlSummonsRepository::new(db.connection());
        repo.insert(&summons).await?;
        repo.get(&summons.id)
            .await?
            .ok_or_else(|| Error::NotFound(summons.id.clone()))
    }

    /// Save a local edit to a summons.
    pub async fn update_summons(&self, summons: &SummonsRecord) -> Result<SummonsRecord> {
        let db = self.db.lock().await;
        let repo = LibSqlSummonsRepository::new(db.connection());
        if !repo.update(summons).await? {
            return Err(Error::NotFound(summons.id.clone()));
        }
        repo.get(&summons.id)
            .await?
            .ok_or_else(|| Error::NotFound(summons.id.clone()))
    }

    /// Replace a summons' lifecycle flags and recompute its status.
    pub async fn set_summons_flags(&self, id: &str, flags: SummonsFlags) -> Result<SummonsRecord> {
        let db = self.db.lock().await;
        let repo = LibSqlSummonsRepository::new(db.connection());
        let mut summons = repo
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        summons.flags = flags;
        summons.refresh_status();
        repo.update(&summons).await?;
        repo.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Edit notes, mode of service and purpose of a summons.
    pub async fn update_summons_local_fields(
        &self,
        id: &str,
        notes: &str,
        mode_of_service: &[String],
        purpose: &[String],
    ) -> Result<SummonsRecord> {
        let db = self.db.lock().await;
        let repo = LibSqlSummonsRepository::new(db.connection());
        if !repo
            .update_local_fields(id, notes, mode_of_service, purpose)
            .await?
        {
            return Err(Error::NotFound(id.to_string()));
        }
        repo.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Delete a single summons.
    pub async fn delete_summons(&self, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        if LibSqlSummonsRepository::new(db.connection())
            .delete(id)
            .await?
        {
            Ok(())
        } else {
            Err(Error::NotFound(id.to_string()))
        }
    }

    /// Fetch a record of either type.
    pub async fn get_record(&self, record_type: RecordType, id: &str) -> Result<Option<LocalRecord>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        Ok(match record_type {
            RecordType::Case => LibSqlCaseRepository::new(conn)
                .get(id)
                .await?
                .map(LocalRecord::Case),
            RecordType::Summons => LibSqlSummonsRepository::new(conn)
                .get(id)
                .await?
                .map(LocalRecord::Summons),
        })
    }

    /// Ids carrying a `synced_at` marker.
    pub async fn synced_ids(&self, record_type: RecordType) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        match record_type {
            RecordType::Case => LibSqlCaseRepository::new(conn).synced_ids().await,
            RecordType::Summons => LibSqlSummonsRepository::new(conn).synced_ids().await,
        }
    }

    /// Commit one batch of pull writes atomically.
    pub async fn apply_pull_batch(&self, ops: &[PullOp]) -> Result<()> {
        let db = self.db.lock().await;
        db::apply_pull_batch(db.connection(), ops).await
    }

    /// Atomically rename a record and rewrite its dependents.
    pub async fn migrate_identifier(
        &self,
        record_type: RecordType,
        old_id: &str,
        new_id: &str,
        synced_at: i64,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        db::migrate_identifier(db.connection(), record_type, old_id, new_id, synced_at).await
    }

    /// Stamp `synced_at` on a record.
    pub async fn mark_synced(&self, record_type: RecordType, id: &str, synced_at: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let conn = db.connection();
        match record_type {
            RecordType::Case => LibSqlCaseRepository::new(conn).mark_synced(id, synced_at).await,
            RecordType::Summons => {
                LibSqlSummonsRepository::new(conn)
                    .mark_synced(id, synced_at)
                    .await
            }
        }
    }
}
