//! Multi-statement operations that must commit atomically.

use libsql::params::Params;
use libsql::{Connection, Value};

use super::case_repository::{CaseRepository, LibSqlCaseRepository, CASE_DATA_COLUMNS};
use super::summons_repository::{
    LibSqlSummonsRepository, SummonsRepository, SUMMONS_DATA_COLUMNS,
};
use crate::error::{Error, Result};
use crate::models::{LocalRecord, RecordType};

/// A foreign-key column and the record type it points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
    pub references: RecordType,
}

/// Every column that stores another record's identifier
pub const DEPENDENTS: &[Dependent] = &[
    Dependent {
        table: "summons",
        column: "case_id",
        references: RecordType::Case,
    },
    Dependent {
        table: "summons",
        column: "previous_summon_id",
        references: RecordType::Summons,
    },
];

const fn data_columns(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::Case => CASE_DATA_COLUMNS,
        RecordType::Summons => SUMMONS_DATA_COLUMNS,
    }
}

/// One local write staged by the pull reconciler
#[derive(Debug, Clone, PartialEq)]
pub enum PullOp {
    /// New record, written with every field
    Insert(LocalRecord),
    /// Existing record, remote-owned fields only
    Update(LocalRecord),
    /// Tombstone delete
    Delete { record_type: RecordType, id: String },
}

async fn apply_op(conn: &Connection, op: &PullOp) -> Result<()> {
    match op {
        PullOp::Insert(LocalRecord::Case(case)) => LibSqlCaseRepository::new(conn).insert(case).await,
        PullOp::Insert(LocalRecord::Summons(summons)) => {
            LibSqlSummonsRepository::new(conn).insert(summons).await
        }
        PullOp::Update(LocalRecord::Case(case)) => LibSqlCaseRepository::new(conn)
            .update_remote_fields(case)
            .await
            .map(|_| ()),
        PullOp::Update(LocalRecord::Summons(summons)) => LibSqlSummonsRepository::new(conn)
            .update_remote_fields(summons)
            .await
            .map(|_| ()),
        PullOp::Delete {
            record_type: RecordType::Case,
            id,
        } => LibSqlCaseRepository::new(conn).delete(id).await.map(|_| ()),
        PullOp::Delete {
            record_type: RecordType::Summons,
            id,
        } => LibSqlSummonsRepository::new(conn)
            .delete(id)
            .await
            .map(|_| ()),
    }
}

/// Commit a batch of pull writes in one transaction
pub async fn apply_pull_batch(conn: &Connection, ops: &[PullOp]) -> Result<()> {
    if ops.is_empty() {
        return Ok(());
    }

    conn.execute("BEGIN IMMEDIATE TRANSACTION", ()).await?;

    for op in ops {
        if let Err(error) = apply_op(conn, op).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(error);
        }
    }

    if let Err(error) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(error.into());
    }

    tracing::debug!("Committed pull batch of {} operation(s)", ops.len());
    Ok(())
}

async fn migrate_rows(
    conn: &Connection,
    record_type: RecordType,
    old_id: &str,
    new_id: &str,
    synced_at: i64,
) -> Result<bool> {
    let table = record_type.table();
    let ids = || {
        Params::Positional(vec![
            Value::Text(new_id.to_string()),
            Value::Text(old_id.to_string()),
        ])
    };

    let columns = data_columns(record_type);
    let copied = conn
        .execute(
            &format!(
                "INSERT OR REPLACE INTO {table} (id, {columns})
                 SELECT ?1, {columns} FROM {table} WHERE id = ?2"
            ),
            ids(),
        )
        .await?;
    if copied == 0 {
        return Ok(false);
    }

    conn.execute(
        &format!("UPDATE {table} SET synced_at = ?1 WHERE id = ?2"),
        Params::Positional(vec![
            Value::Integer(synced_at),
            Value::Text(new_id.to_string()),
        ]),
    )
    .await?;
    conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [old_id])
        .await?;

    // Rewritten links are local changes the remote has not seen yet
    for dependent in DEPENDENTS
        .iter()
        .filter(|dependent| dependent.references == record_type)
    {
        let rewritten = conn
            .execute(
                &format!(
                    "UPDATE {table}
                     SET {column} = ?1,
                         updated_at = MAX(updated_at, ?3, COALESCE(synced_at, 0) + 1)
                     WHERE {column} = ?2",
                    table = dependent.table,
                    column = dependent.column
                ),
                Params::Positional(vec![
                    Value::Text(new_id.to_string()),
                    Value::Text(old_id.to_string()),
                    Value::Integer(synced_at),
                ]),
            )
            .await?;
        if rewritten > 0 {
            tracing::debug!(
                "Rewrote {rewritten} {}.{} reference(s) from {old_id} to {new_id}",
                dependent.table,
                dependent.column
            );
        }
    }

    Ok(true)
}

/// Rename a record from `old_id` to `new_id` and rewrite every foreign key
/// that pointed at it, all in one transaction.
///
/// Returns `Ok(false)` (and changes nothing) when no record exists under
/// `old_id`. Any failure rolls the whole migration back.
pub async fn migrate_identifier(
    conn: &Connection,
    record_type: RecordType,
    old_id: &str,
    new_id: &str,
    synced_at: i64,
) -> Result<bool> {
    let migration_error = |reason: String| Error::Migration {
        old_id: old_id.to_string(),
        new_id: new_id.to_string(),
        reason,
    };

    if old_id == new_id {
        return Err(migration_error("identifiers are equal".to_string()));
    }

    conn.execute("BEGIN IMMEDIATE TRANSACTION", ())
        .await
        .map_err(|error| migration_error(error.to_string()))?;

    match migrate_rows(conn, record_type, old_id, new_id, synced_at).await {
        Ok(true) => {
            if let Err(error) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(migration_error(error.to_string()));
            }
            tracing::info!("Migrated {record_type} {old_id} -> {new_id}");
            Ok(true)
        }
        Ok(false) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Ok(false)
        }
        Err(error) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(migration_error(error.to_string()))
        }
    }
}

/// Delete a case together with every summons that references it
pub async fn delete_case_cascade(conn: &Connection, case_id: &str) -> Result<bool> {
    conn.execute("BEGIN IMMEDIATE TRANSACTION", ()).await?;

    let outcome = async {
        conn.execute("DELETE FROM summons WHERE case_id = ?1", [case_id])
            .await?;
        let deleted = conn
            .execute("DELETE FROM cases WHERE id = ?1", [case_id])
            .await?;
        Ok::<_, Error>(deleted > 0)
    }
    .await;

    match outcome {
        Ok(deleted) => {
            if let Err(error) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(error.into());
            }
            Ok(deleted)
        }
        Err(error) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{CaseRecord, SummonsRecord};
    use pretty_assertions::assert_eq;

    const CANONICAL: &str = "8f14e45f-ceea-467f-a0e6-6a3d9b1c2d3e";

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_apply_pull_batch_commits_all_ops() {
        let db = setup().await;
        let conn = db.connection();
        let stale = CaseRecord::new("Stale");
        LibSqlCaseRepository::new(conn).insert(&stale).await.unwrap();

        let fresh = CaseRecord::new("Fresh");
        let summons = SummonsRecord::new("Witness", Some(fresh.id.clone()));
        let ops = vec![
            PullOp::Insert(fresh.clone().into()),
            PullOp::Insert(summons.clone().into()),
            PullOp::Delete {
                record_type: RecordType::Case,
                id: stale.id.clone(),
            },
        ];
        apply_pull_batch(conn, &ops).await.unwrap();

        let cases = LibSqlCaseRepository::new(conn).list_all().await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, fresh.id);
        assert!(LibSqlSummonsRepository::new(conn)
            .get(&summons.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_apply_pull_batch_rolls_back_on_failure() {
        let db = setup().await;
        let conn = db.connection();
        let existing = CaseRecord::new("Existing");
        LibSqlCaseRepository::new(conn).insert(&existing).await.unwrap();

        let fresh = CaseRecord::new("Fresh");
        // Second insert of the same id violates the primary key
        let ops = vec![
            PullOp::Insert(fresh.into()),
            PullOp::Insert(existing.clone().into()),
        ];
        assert!(apply_pull_batch(conn, &ops).await.is_err());

        let cases = LibSqlCaseRepository::new(conn).list_all().await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, existing.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrate_case_rewrites_dependents() {
        let db = setup().await;
        let conn = db.connection();
        let cases = LibSqlCaseRepository::new(conn);
        let summonses = LibSqlSummonsRepository::new(conn);

        let case = CaseRecord::new("State v. Doe");
        cases.insert(&case).await.unwrap();
        let first = SummonsRecord::new("Witness A", Some(case.id.clone()));
        let second = SummonsRecord::new("Witness B", Some(case.id.clone()));
        let other = SummonsRecord::new("Elsewhere", Some("case-other".to_string()));
        summonses.insert(&first).await.unwrap();
        summonses.insert(&second).await.unwrap();
        summonses.insert(&other).await.unwrap();

        let migrated = migrate_identifier(conn, RecordType::Case, &case.id, CANONICAL, 77)
            .await
            .unwrap();
        assert!(migrated);

        assert!(cases.get(&case.id).await.unwrap().is_none());
        let renamed = cases.get(CANONICAL).await.unwrap().unwrap();
        assert_eq!(renamed.name, case.name);
        assert_eq!(renamed.created_at, case.created_at);
        assert_eq!(renamed.synced_at, Some(77));

        assert!(summonses.list_by_case(&case.id).await.unwrap().is_empty());
        assert_eq!(summonses.list_by_case(CANONICAL).await.unwrap().len(), 2);
        let untouched = summonses.get(&other.id).await.unwrap().unwrap();
        assert_eq!(untouched.case_id.as_deref(), Some("case-other"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrate_marks_rewritten_dependents_unpushed() {
        let db = setup().await;
        let conn = db.connection();
        let cases = LibSqlCaseRepository::new(conn);
        let summonses = LibSqlSummonsRepository::new(conn);

        let case = CaseRecord::new("State v. Doe");
        cases.insert(&case).await.unwrap();
        let summons = SummonsRecord::new("Witness", Some(case.id.clone()));
        summonses.insert(&summons).await.unwrap();
        let far_future = summons.updated_at + 60_000;
        summonses.mark_synced(&summons.id, far_future).await.unwrap();

        migrate_identifier(conn, RecordType::Case, &case.id, CANONICAL, 77)
            .await
            .unwrap();

        let rewritten = summonses.get(&summons.id).await.unwrap().unwrap();
        assert_eq!(rewritten.case_id.as_deref(), Some(CANONICAL));
        assert!(rewritten.updated_at > far_future);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrate_summons_rewrites_previous_links() {
        let db = setup().await;
        let conn = db.connection();
        let summonses = LibSqlSummonsRepository::new(conn);

        let original = SummonsRecord::new("Witness", None);
        let mut follow_up = SummonsRecord::new("Witness", None);
        follow_up.previous_summon_id = Some(original.id.clone());
        summonses.insert(&original).await.unwrap();
        summonses.insert(&follow_up).await.unwrap();

        assert!(
            migrate_identifier(conn, RecordType::Summons, &original.id, CANONICAL, 5)
                .await
                .unwrap()
        );

        let follow_up = summonses.get(&follow_up.id).await.unwrap().unwrap();
        assert_eq!(follow_up.previous_summon_id.as_deref(), Some(CANONICAL));
        assert_eq!(summonses.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrate_missing_record_changes_nothing() {
        let db = setup().await;
        let conn = db.connection();
        let summons = SummonsRecord::new("Witness", Some("case-gone".to_string()));
        LibSqlSummonsRepository::new(conn).insert(&summons).await.unwrap();

        let migrated = migrate_identifier(conn, RecordType::Case, "case-gone", CANONICAL, 1)
            .await
            .unwrap();
        assert!(!migrated);

        let loaded = LibSqlSummonsRepository::new(conn)
            .get(&summons.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.case_id.as_deref(), Some("case-gone"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrate_rejects_identical_ids() {
        let db = setup().await;
        let error = migrate_identifier(db.connection(), RecordType::Case, CANONICAL, CANONICAL, 1)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Migration { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_case_cascade_removes_summonses() {
        let db = setup().await;
        let conn = db.connection();
        let case = CaseRecord::new("State v. Doe");
        LibSqlCaseRepository::new(conn).insert(&case).await.unwrap();
        let linked = SummonsRecord::new("Witness", Some(case.id.clone()));
        let unlinked = SummonsRecord::new("Other", None);
        let summonses = LibSqlSummonsRepository::new(conn);
        summonses.insert(&linked).await.unwrap();
        summonses.insert(&unlinked).await.unwrap();

        assert!(delete_case_cascade(conn, &case.id).await.unwrap());
        assert!(summonses.get(&linked.id).await.unwrap().is_none());
        assert!(summonses.get(&unlinked.id).await.unwrap().is_some());
        assert!(!delete_case_cascade(conn, &case.id).await.unwrap());
    }
}
