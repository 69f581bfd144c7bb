use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use docket_core::{
    CaseRecord, DatabaseService, NotionClient, NotionConfig, PushResult, SummonsRecord,
    SyncEngine, SyncResult, SyncSettings,
};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct CaseListItem {
    pub id: String,
    pub name: String,
    pub reference_number: String,
    pub status: String,
    pub department: String,
    pub is_active: bool,
    pub updated_at: i64,
    pub synced_at: Option<i64>,
    pub pending_push: bool,
}

#[derive(Debug, Serialize)]
pub struct SummonsListItem {
    pub id: String,
    pub case_id: Option<String>,
    pub person_name: String,
    pub person_role: String,
    pub status: String,
    pub updated_at: i64,
    pub synced_at: Option<i64>,
    pub pending_push: bool,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("DOCKET_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docket")
        .join("docket.db")
}

pub async fn open_database(db_path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(db_path).await?)
}

/// Build an engine against the configured remote workspace
pub async fn open_engine(db_path: &Path) -> Result<SyncEngine<NotionClient>, CliError> {
    let config = NotionConfig::from_env()?.ok_or(CliError::SyncNotConfigured)?;
    let settings = SyncSettings::from(&config);
    let client = NotionClient::new(config)?;
    let db = open_database(db_path).await?;
    Ok(SyncEngine::new(db, client, settings))
}

pub fn normalize_record_id(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn case_to_list_item(case: &CaseRecord) -> CaseListItem {
    CaseListItem {
        id: case.id.clone(),
        name: case.name.clone(),
        reference_number: case.reference_number.clone(),
        status: case.status.clone(),
        department: case.department.clone(),
        is_active: case.is_active,
        updated_at: case.updated_at,
        synced_at: case.synced_at,
        pending_push: !docket_core::models::is_canonical_id(&case.id),
    }
}

pub fn summons_to_list_item(summons: &SummonsRecord) -> SummonsListItem {
    SummonsListItem {
        id: summons.id.clone(),
        case_id: summons.case_id.clone(),
        person_name: summons.person_name.clone(),
        person_role: summons.person_role.clone(),
        status: summons.status.to_string(),
        updated_at: summons.updated_at,
        synced_at: summons.synced_at,
        pending_push: !docket_core::models::is_canonical_id(&summons.id),
    }
}

pub fn format_case_lines(cases: &[CaseRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    cases
        .iter()
        .map(|case| {
            let name = truncate(&case.name, 32);
            let synced = format_synced(case.synced_at, now_ms);
            format!(
                "{:<36}  {name:<32}  {:<12}  {synced}",
                case.id,
                truncate(&case.status, 12)
            )
        })
        .collect()
}

pub fn format_summons_lines(summonses: &[SummonsRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    summonses
        .iter()
        .map(|summons| {
            let person = truncate(&summons.person_name, 24);
            let synced = format_synced(summons.synced_at, now_ms);
            format!(
                "{:<36}  {person:<24}  {:<26}  {synced}",
                summons.id, summons.status
            )
        })
        .collect()
}

pub fn format_sync_result_line(label: &str, result: &SyncResult) -> String {
    if let Some(failure) = &result.failure {
        return format!("{label}: failed ({failure})");
    }

    let mut line = format!(
        "{label}: {} added, {} updated, {} deleted, {} unchanged",
        result.added, result.updated, result.deleted, result.unchanged
    );
    if !result.errors.is_empty() {
        line.push_str(&format!(", {} errors", result.errors.len()));
    }
    line
}

pub fn format_push_line(result: &PushResult) -> String {
    match (&result.new_id, &result.error) {
        (_, Some(error)) => format!("{}: failed ({error})", result.id),
        (Some(new_id), None) => format!("{} -> {new_id}", result.id),
        (None, None) => format!("{}: up to date", result.id),
    }
}

pub fn format_synced(synced_at: Option<i64>, now_ms: i64) -> String {
    synced_at.map_or_else(
        || "pending".to_string(),
        |timestamp| format_relative_time(timestamp, now_ms),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
            || timestamp_ms.to_string(),
            |date_time| date_time.format("%Y-%m-%d").to_string(),
        )
    }
}

pub fn truncate(value: &str, max_chars: usize) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut truncated = collapsed
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
