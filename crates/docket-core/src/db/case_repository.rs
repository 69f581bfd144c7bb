//! Case repository implementation

use libsql::params::Params;
use libsql::{Connection, Row, Value};

use super::columns;
use crate::error::Result;
use crate::models::CaseRecord;

/// Every column after `id`, in row order
pub(super) const CASE_DATA_COLUMNS: &str = "name, reference_number, status, assigned_officers, \
     activity_types, department, amount_involved, date_opened, is_active, created_at, \
     updated_at, synced_at";

/// Trait for case storage operations (async)
#[allow(async_fn_in_trait)]
pub trait CaseRepository {
    /// Get a case by id
    async fn get(&self, id: &str) -> Result<Option<CaseRecord>>;

    /// List cases, most recently updated first
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<CaseRecord>>;

    /// List every case
    async fn list_all(&self) -> Result<Vec<CaseRecord>>;

    /// Ids of cases that have been synchronized at least once
    async fn synced_ids(&self) -> Result<Vec<String>>;

    /// Insert a new case with all of its fields
    async fn insert(&self, case: &CaseRecord) -> Result<()>;

    /// Overwrite remote-owned fields and `synced_at`; returns whether a row matched
    async fn update_remote_fields(&self, case: &CaseRecord) -> Result<bool>;

    /// Save a local edit; returns whether a row matched
    async fn update(&self, case: &CaseRecord) -> Result<bool>;

    /// Delete a case (dependents are left untouched)
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Stamp `synced_at`
    async fn mark_synced(&self, id: &str, synced_at: i64) -> Result<bool>;
}

/// libSQL implementation of `CaseRepository`
pub struct LibSqlCaseRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlCaseRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_case(row: &Row) -> Result<CaseRecord> {
        Ok(CaseRecord {
            id: columns::text(row, 0)?,
            name: columns::text(row, 1)?,
            reference_number: columns::text(row, 2)?,
            status: columns::text(row, 3)?,
            assigned_officers: columns::set(row, 4)?,
            activity_types: columns::set(row, 5)?,
            department: columns::text(row, 6)?,
            amount_involved: columns::opt_real(row, 7)?,
            date_opened: columns::date(row, 8)?,
            is_active: columns::flag(row, 9)?,
            created_at: columns::integer(row, 10)?,
            updated_at: columns::integer(row, 11)?,
            synced_at: columns::opt_integer(row, 12)?,
        })
    }

    /// Remote-owned values, in `CASE_DATA_COLUMNS` order up to `is_active`
    fn content_values(case: &CaseRecord) -> Result<Vec<Value>> {
        Ok(vec![
            Value::Text(case.name.clone()),
            Value::Text(case.reference_number.clone()),
            Value::Text(case.status.clone()),
            Value::Text(columns::set_value(&case.assigned_officers)?),
            Value::Text(columns::set_value(&case.activity_types)?),
            Value::Text(case.department.clone()),
            columns::opt_real_value(case.amount_involved),
            columns::date_value(case.date_opened),
            Value::Integer(columns::flag_value(case.is_active)),
        ])
    }

    async fn query_cases(&self, sql: &str, params: Params) -> Result<Vec<CaseRecord>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut cases = Vec::new();
        while let Some(row) = rows.next().await? {
            cases.push(Self::parse_case(&row)?);
        }
        Ok(cases)
    }
}

impl CaseRepository for LibSqlCaseRepository<'_> {
    async fn get(&self, id: &str) -> Result<Option<CaseRecord>> {
        let sql = format!("SELECT id, {CASE_DATA_COLUMNS} FROM cases WHERE id = ?1");
        let cases = self
            .query_cases(&sql, Params::Positional(vec![Value::Text(id.to_string())]))
            .await?;
        Ok(cases.into_iter().next())
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<CaseRecord>> {
        let sql = format!(
            "SELECT id, {CASE_DATA_COLUMNS} FROM cases
             ORDER BY updated_at DESC, id ASC
             LIMIT ?1 OFFSET ?2"
        );
        self.query_cases(
            &sql,
            Params::Positional(vec![
                Value::Integer(limit as i64),
                Value::Integer(offset as i64),
            ]),
        )
        .await
    }

    async fn list_all(&self) -> Result<Vec<CaseRecord>> {
        let sql = format!("SELECT id, {CASE_DATA_COLUMNS} FROM cases ORDER BY id ASC");
        self.query_cases(&sql, Params::None).await
    }

    async fn synced_ids(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query("SELECT id FROM cases WHERE synced_at IS NOT NULL", ())
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(columns::text(&row, 0)?);
        }
        Ok(ids)
    }

    async fn insert(&self, case: &CaseRecord) -> Result<()> {
        let mut values = vec![Value::Text(case.id.clone())];
        values.extend(Self::content_values(case)?);
        values.push(Value::Integer(case.created_at));
        values.push(Value::Integer(case.updated_at));
        values.push(columns::opt_integer_value(case.synced_at));

        let sql = format!(
            "INSERT INTO cases (id, {CASE_DATA_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        );
        self.conn.execute(&sql, Params::Positional(values)).await?;
        Ok(())
    }

    async fn update_remote_fields(&self, case: &CaseRecord) -> Result<bool> {
        let mut values = Self::content_values(case)?;
        values.push(Value::Integer(case.updated_at));
        values.push(columns::opt_integer_value(case.synced_at));
        values.push(Value::Text(case.id.clone()));

        let changed = self
            .conn
            .execute(
                "UPDATE cases SET
                    name = ?1, reference_number = ?2, status = ?3, assigned_officers = ?4,
                    activity_types = ?5, department = ?6, amount_involved = ?7,
                    date_opened = ?8, is_active = ?9, updated_at = ?10, synced_at = ?11
                 WHERE id = ?12",
                Params::Positional(values),
            )
            .await?;
        Ok(changed > 0)
    }

    async fn update(&self, case: &CaseRecord) -> Result<bool> {
        let mut values = Self::content_values(case)?;
        values.push(Value::Integer(chrono::Utc::now().timestamp_millis()));
        values.push(Value::Text(case.id.clone()));

        let changed = self
            .conn
            .execute(
                "UPDATE cases SET
                    name = ?1, reference_number = ?2, status = ?3, assigned_officers = ?4,
                    activity_types = ?5, department = ?6, amount_involved = ?7,
                    date_opened = ?8, is_active = ?9, updated_at = ?10
                 WHERE id = ?11",
                Params::Positional(values),
            )
            .await?;
        Ok(changed > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM cases WHERE id = ?1", [id])
            .await?;
        Ok(changed > 0)
    }

    async fn mark_synced(&self, id: &str, synced_at: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE cases SET synced_at = ?1 WHERE id = ?2",
                Params::Positional(vec![
                    Value::Integer(synced_at),
                    Value::Text(id.to_string()),
                ]),
            )
            .await?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn sample_case() -> CaseRecord {
        let mut case = CaseRecord::new("State v. Doe");
        case.reference_number = "CR-2024-017".to_string();
        case.status = "Under Investigation".to_string();
        case.assigned_officers = vec!["Insp. Rao".to_string(), "SI Mehta".to_string()];
        case.activity_types = vec!["Fraud".to_string()];
        case.amount_involved = Some(125_000.5);
        case.date_opened = NaiveDate::from_ymd_opt(2024, 2, 11);
        case
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = LibSqlCaseRepository::new(db.connection());
        let case = sample_case();

        repo.insert(&case).await.unwrap();
        let loaded = repo.get(&case.id).await.unwrap().unwrap();
        assert_eq!(loaded, case);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_missing_returns_none() {
        let db = setup().await;
        let repo = LibSqlCaseRepository::new(db.connection());
        assert!(repo.get("case-missing").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_orders_by_updated_at() {
        let db = setup().await;
        let repo = LibSqlCaseRepository::new(db.connection());

        let mut older = CaseRecord::new("Older");
        older.updated_at = 1_000;
        let mut newer = CaseRecord::new("Newer");
        newer.updated_at = 2_000;
        repo.insert(&older).await.unwrap();
        repo.insert(&newer).await.unwrap();

        let names = repo
            .list(10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|case| case.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Newer", "Older"]);

        let page = repo.list(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Older");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_remote_fields_stamps_synced_at() {
        let db = setup().await;
        let repo = LibSqlCaseRepository::new(db.connection());
        let case = sample_case();
        repo.insert(&case).await.unwrap();

        let mut incoming = case.clone();
        incoming.status = "Closed".to_string();
        incoming.synced_at = Some(5_000);
        assert!(repo.update_remote_fields(&incoming).await.unwrap());

        let loaded = repo.get(&case.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, "Closed");
        assert_eq!(loaded.synced_at, Some(5_000));
        assert_eq!(loaded.created_at, case.created_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_synced_ids_and_delete() {
        let db = setup().await;
        let repo = LibSqlCaseRepository::new(db.connection());

        let pending = CaseRecord::new("Pending");
        let synced = CaseRecord::new("Synced");
        repo.insert(&pending).await.unwrap();
        repo.insert(&synced).await.unwrap();
        assert!(repo.mark_synced(&synced.id, 42).await.unwrap());

        assert_eq!(repo.synced_ids().await.unwrap(), vec![synced.id.clone()]);

        assert!(repo.delete(&synced.id).await.unwrap());
        assert!(!repo.delete(&synced.id).await.unwrap());
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_synced_missing_returns_false() {
        let db = setup().await;
        let repo = LibSqlCaseRepository::new(db.connection());
        assert!(!repo.mark_synced("case-missing", 1).await.unwrap());
    }
}
