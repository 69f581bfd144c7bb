//! Summons repository implementation

use libsql::params::Params;
use libsql::{Connection, Row, Value};

use super::columns;
use crate::error::Result;
use crate::models::{SummonsDates, SummonsFlags, SummonsRecord};
use crate::status::infer_status;

/// Every column after `id`, in row order
pub(super) const SUMMONS_DATA_COLUMNS: &str = "case_id, person_name, person_role, phone, email, \
     issue_date, appearance_date, rescheduled_date, statement_date, \
     is_issued, is_served, requests_reschedule, statement_ongoing, statement_recorded, \
     rescheduled_date_communicated, followup_required, \
     notes, mode_of_service, purpose, status, previous_summon_id, \
     created_at, updated_at, synced_at";

/// Trait for summons storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SummonsRepository {
    /// Get a summons by id
    async fn get(&self, id: &str) -> Result<Option<SummonsRecord>>;

    /// List summonses, most recently updated first
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<SummonsRecord>>;

    /// List every summons
    async fn list_all(&self) -> Result<Vec<SummonsRecord>>;

    /// Summonses referencing a case
    async fn list_by_case(&self, case_id: &str) -> Result<Vec<SummonsRecord>>;

    /// Ids of summonses that have been synchronized at least once
    async fn synced_ids(&self) -> Result<Vec<String>>;

    /// Insert a new summons with all of its fields
    async fn insert(&self, summons: &SummonsRecord) -> Result<()>;

    /// Overwrite remote-owned fields and `synced_at`, leaving notes,
    /// mode of service and purpose alone; returns whether a row matched
    async fn update_remote_fields(&self, summons: &SummonsRecord) -> Result<bool>;

    /// Save a local edit of every field; returns whether a row matched
    async fn update(&self, summons: &SummonsRecord) -> Result<bool>;

    /// Edit only the locally-owned fields
    async fn update_local_fields(
        &self,
        id: &str,
        notes: &str,
        mode_of_service: &[String],
        purpose: &[String],
    ) -> Result<bool>;

    /// Delete a summons
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Stamp `synced_at`
    async fn mark_synced(&self, id: &str, synced_at: i64) -> Result<bool>;
}

/// libSQL implementation of `SummonsRepository`
pub struct LibSqlSummonsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSummonsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_summons(row: &Row) -> Result<SummonsRecord> {
        let dates = SummonsDates {
            issue_date: columns::date(row, 6)?,
            appearance_date: columns::date(row, 7)?,
            rescheduled_date: columns::date(row, 8)?,
            statement_date: columns::date(row, 9)?,
        };
        let flags = SummonsFlags {
            is_issued: columns::flag(row, 10)?,
            is_served: columns::flag(row, 11)?,
            requests_reschedule: columns::flag(row, 12)?,
            statement_ongoing: columns::flag(row, 13)?,
            statement_recorded: columns::flag(row, 14)?,
            rescheduled_date_communicated: columns::flag(row, 15)?,
            followup_required: columns::flag(row, 16)?,
        };
        let status = columns::text(row, 20)?
            .parse()
            .unwrap_or_else(|_| infer_status(&flags, &dates));

        Ok(SummonsRecord {
            id: columns::text(row, 0)?,
            case_id: columns::opt_text(row, 1)?,
            person_name: columns::text(row, 2)?,
            person_role: columns::text(row, 3)?,
            phone: columns::text(row, 4)?,
            email: columns::text(row, 5)?,
            dates,
            flags,
            notes: columns::text(row, 17)?,
            mode_of_service: columns::set(row, 18)?,
            purpose: columns::set(row, 19)?,
            status,
            previous_summon_id: columns::opt_text(row, 21)?,
            created_at: columns::integer(row, 22)?,
            updated_at: columns::integer(row, 23)?,
            synced_at: columns::opt_integer(row, 24)?,
        })
    }

    /// Remote-owned values: relation, contact, dates, flags, derived status
    /// and back-reference
    fn remote_values(summons: &SummonsRecord) -> Vec<Value> {
        let flags = &summons.flags;
        let dates = &summons.dates;
        vec![
            columns::opt_text_value(summons.case_id.as_deref()),
            Value::Text(summons.person_name.clone()),
            Value::Text(summons.person_role.clone()),
            Value::Text(summons.phone.clone()),
            Value::Text(summons.email.clone()),
            columns::date_value(dates.issue_date),
            columns::date_value(dates.appearance_date),
            columns::date_value(dates.rescheduled_date),
            columns::date_value(dates.statement_date),
            Value::Integer(columns::flag_value(flags.is_issued)),
            Value::Integer(columns::flag_value(flags.is_served)),
            Value::Integer(columns::flag_value(flags.requests_reschedule)),
            Value::Integer(columns::flag_value(flags.statement_ongoing)),
            Value::Integer(columns::flag_value(flags.statement_recorded)),
            Value::Integer(columns::flag_value(flags.rescheduled_date_communicated)),
            Value::Integer(columns::flag_value(flags.followup_required)),
            Value::Text(infer_status(flags, dates).as_str().to_string()),
            columns::opt_text_value(summons.previous_summon_id.as_deref()),
        ]
    }

    fn local_values(
        notes: &str,
        mode_of_service: &[String],
        purpose: &[String],
    ) -> Result<Vec<Value>> {
        Ok(vec![
            Value::Text(notes.to_string()),
            Value::Text(columns::set_value(mode_of_service)?),
            Value::Text(columns::set_value(purpose)?),
        ])
    }

    async fn query_summons(&self, sql: &str, params: Params) -> Result<Vec<SummonsRecord>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut summonses = Vec::new();
        while let Some(row) = rows.next().await? {
            summonses.push(Self::parse_summons(&row)?);
        }
        Ok(summonses)
    }
}

const REMOTE_ASSIGNMENTS: &str = "case_id = ?1, person_name = ?2, person_role = ?3, phone = ?4, \
     email = ?5, issue_date = ?6, appearance_date = ?7, rescheduled_date = ?8, \
     statement_date = ?9, is_issued = ?10, is_served = ?11, requests_reschedule = ?12, \
     statement_ongoing = ?13, statement_recorded = ?14, rescheduled_date_communicated = ?15, \
     followup_required = ?16, status = ?17, previous_summon_id = ?18";

impl SummonsRepository for LibSqlSummonsRepository<'_> {
    async fn get(&self, id: &str) -> Result<Option<SummonsRecord>> {
        let sql = format!("SELECT id, {SUMMONS_DATA_COLUMNS} FROM summons WHERE id = ?1");
        let summonses = self
            .query_summons(&sql, Params::Positional(vec![Value::Text(id.to_string())]))
            .await?;
        Ok(summonses.into_iter().next())
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<SummonsRecord>> {
        let sql = format!(
            "SELECT id, {SUMMONS_DATA_COLUMNS} FROM summons
             ORDER BY updated_at DESC, id ASC
             LIMIT ?1 OFFSET ?2"
        );
        self.query_summons(
            &sql,
            Params::Positional(vec![
                Value::Integer(limit as i64),
                Value::Integer(offset as i64),
            ]),
        )
        .await
    }

    async fn list_all(&self) -> Result<Vec<SummonsRecord>> {
        let sql = format!("SELECT id, {SUMMONS_DATA_COLUMNS} FROM summons ORDER BY id ASC");
        self.query_summons(&sql, Params::None).await
    }

    async fn list_by_case(&self, case_id: &str) -> Result<Vec<SummonsRecord>> {
        let sql = format!(
            "SELECT id, {SUMMONS_DATA_COLUMNS} FROM summons
             WHERE case_id = ?1
             ORDER BY COALESCE(appearance_date, issue_date) ASC, id ASC"
        );
        self.query_summons(
            &sql,
            Params::Positional(vec![Value::Text(case_id.to_string())]),
        )
        .await
    }

    async fn synced_ids(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query("SELECT id FROM summons WHERE synced_at IS NOT NULL", ())
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(columns::text(&row, 0)?);
        }
        Ok(ids)
    }

    async fn insert(&self, summons: &SummonsRecord) -> Result<()> {
        let mut remote = Self::remote_values(summons);
        let previous = remote.pop().unwrap_or(Value::Null);
        let status = remote.pop().unwrap_or(Value::Null);

        let mut values = vec![Value::Text(summons.id.clone())];
        values.extend(remote);
        values.extend(Self::local_values(
            &summons.notes,
            &summons.mode_of_service,
            &summons.purpose,
        )?);
        values.push(status);
        values.push(previous);
        values.push(Value::Integer(summons.created_at));
        values.push(Value::Integer(summons.updated_at));
        values.push(columns::opt_integer_value(summons.synced_at));

        let placeholders = (1..=values.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO summons (id, {SUMMONS_DATA_COLUMNS}) VALUES ({placeholders})"
        );
        self.conn.execute(&sql, Params::Positional(values)).await?;
        Ok(())
    }

    async fn update_remote_fields(&self, summons: &SummonsRecord) -> Result<bool> {
        let mut values = Self::remote_values(summons);
        values.push(Value::Integer(summons.updated_at));
        values.push(columns::opt_integer_value(summons.synced_at));
        values.push(Value::Text(summons.id.clone()));

        let sql = format!(
            "UPDATE summons SET {REMOTE_ASSIGNMENTS}, updated_at = ?19, synced_at = ?20
             WHERE id = ?21"
        );
        let changed = self.conn.execute(&sql, Params::Positional(values)).await?;
        Ok(changed > 0)
    }

    async fn update(&self, summons: &SummonsRecord) -> Result<bool> {
        let mut values = Self::remote_values(summons);
        values.extend(Self::local_values(
            &summons.notes,
            &summons.mode_of_service,
            &summons.purpose,
        )?);
        values.push(Value::Integer(chrono::Utc::now().timestamp_millis()));
        values.push(Value::Text(summons.id.clone()));

        let sql = format!(
            "UPDATE summons SET {REMOTE_ASSIGNMENTS},
                notes = ?19, mode_of_service = ?20, purpose = ?21, updated_at = ?22
             WHERE id = ?23"
        );
        let changed = self.conn.execute(&sql, Params::Positional(values)).await?;
        Ok(changed > 0)
    }

    async fn update_local_fields(
        &self,
        id: &str,
        notes: &str,
        mode_of_service: &[String],
        purpose: &[String],
    ) -> Result<bool> {
        let mut values = Self::local_values(notes, mode_of_service, purpose)?;
        values.push(Value::Integer(chrono::Utc::now().timestamp_millis()));
        values.push(Value::Text(id.to_string()));

        let changed = self
            .conn
            .execute(
                "UPDATE summons SET notes = ?1, mode_of_service = ?2, purpose = ?3,
                    updated_at = ?4
                 WHERE id = ?5",
                Params::Positional(values),
            )
            .await?;
        Ok(changed > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM summons WHERE id = ?1", [id])
            .await?;
        Ok(changed > 0)
    }

    async fn mark_synced(&self, id: &str, synced_at: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE summons SET synced_at = ?1 WHERE id = ?2",
                Params::Positional(vec![
                    Value::Integer(synced_at),
                    Value::Text(id.to_string()),
                ]),
            )
            .await?;
        Ok(changed > 0)
    }
}
