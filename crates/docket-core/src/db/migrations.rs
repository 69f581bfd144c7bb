//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: cases and summons
///
/// Foreign keys are plain columns: a pulled summons may reference a case the
/// local store has not seen yet, and identifier migration rewrites them.
async fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS cases (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            reference_number TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            assigned_officers TEXT NOT NULL DEFAULT '[]',
            activity_types TEXT NOT NULL DEFAULT '[]',
            department TEXT NOT NULL,
            amount_involved REAL,
            date_opened TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            synced_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_cases_updated ON cases(updated_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_cases_synced ON cases(synced_at)",
        "CREATE TABLE IF NOT EXISTS summons (
            id TEXT PRIMARY KEY,
            case_id TEXT,
            person_name TEXT NOT NULL DEFAULT '',
            person_role TEXT NOT NULL,
            phone TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            issue_date TEXT,
            appearance_date TEXT,
            rescheduled_date TEXT,
            statement_date TEXT,
            is_issued INTEGER NOT NULL DEFAULT 0,
            is_served INTEGER NOT NULL DEFAULT 0,
            requests_reschedule INTEGER NOT NULL DEFAULT 0,
            statement_ongoing INTEGER NOT NULL DEFAULT 0,
            statement_recorded INTEGER NOT NULL DEFAULT 0,
            rescheduled_date_communicated INTEGER NOT NULL DEFAULT 0,
            followup_required INTEGER NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT '',
            mode_of_service TEXT NOT NULL DEFAULT '[]',
            purpose TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL,
            previous_summon_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            synced_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_summons_case ON summons(case_id)",
        "CREATE INDEX IF NOT EXISTS idx_summons_previous ON summons(previous_summon_id)",
        "CREATE INDEX IF NOT EXISTS idx_summons_updated ON summons(updated_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_summons_synced ON summons(synced_at)",
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
