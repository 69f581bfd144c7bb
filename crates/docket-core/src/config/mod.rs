//! Runtime configuration for the remote workspace and the sync engine.
//!
//! Values come from the environment (the CLI loads `.env` first). Parsing
//! goes through a lookup closure so it can be exercised without touching
//! the process environment.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::models::RecordType;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const ENV_TOKEN: &str = "NOTION_TOKEN";
const ENV_CASES_DATABASE_ID: &str = "NOTION_CASES_DATABASE_ID";
const ENV_SUMMONS_DATABASE_ID: &str = "NOTION_SUMMONS_DATABASE_ID";
const ENV_API_BASE_URL: &str = "NOTION_API_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "NOTION_TIMEOUT_SECS";

pub const DEFAULT_API_BASE_URL: &str = "https://api.notion.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Remote workspace configuration
#[derive(Clone, PartialEq, Eq)]
pub struct NotionConfig {
    /// Integration token
    pub token: String,
    /// Database holding case pages
    pub cases_database_id: String,
    /// Database holding summons pages
    pub summons_database_id: String,
    pub api_base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("NotionConfig")
            .field("token", &"[REDACTED]")
            .field("cases_database_id", &self.cases_database_id)
            .field("summons_database_id", &self.summons_database_id)
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NotionConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when none of the variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Database id holding pages of the given record type
    #[must_use]
    pub fn database_id(&self, record_type: RecordType) -> &str {
        match record_type {
            RecordType::Case => &self.cases_database_id,
            RecordType::Summons => &self.summons_database_id,
        }
    }
}

/// Tuning knobs for pull and push runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Maximum local operations committed per transaction during a pull;
    /// never zero
    batch_size: usize,
    /// Upper bound on any single remote call
    pub remote_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            remote_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 { 1 } else { batch_size };
        self
    }

    #[must_use]
    pub const fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }
}

impl From<&NotionConfig> for SyncSettings {
    fn from(config: &NotionConfig) -> Self {
        // Leave headroom over the HTTP timeout so transport errors surface first.
        Self::default().with_remote_timeout(config.timeout + Duration::from_secs(5))
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<NotionConfig>> {
    let token = normalize_text_option(lookup(ENV_TOKEN));
    let cases_database_id = normalize_text_option(lookup(ENV_CASES_DATABASE_ID));
    let summons_database_id = normalize_text_option(lookup(ENV_SUMMONS_DATABASE_ID));
    let api_base_url = normalize_text_option(lookup(ENV_API_BASE_URL));
    let timeout_secs = normalize_text_option(lookup(ENV_TIMEOUT_SECS));

    let any_present = token.is_some()
        || cases_database_id.is_some()
        || summons_database_id.is_some()
        || api_base_url.is_some()
        || timeout_secs.is_some();

    if !any_present {
        return Ok(None);
    }

    let mut missing = Vec::new();
    if token.is_none() {
        missing.push(ENV_TOKEN);
    }
    if cases_database_id.is_none() {
        missing.push(ENV_CASES_DATABASE_ID);
    }
    if summons_database_id.is_none() {
        missing.push(ENV_SUMMONS_DATABASE_ID);
    }

    let (Some(token), Some(cases_database_id), Some(summons_database_id)) =
        (token, cases_database_id, summons_database_id)
    else {
        return Err(Error::InvalidInput(format!(
            "Notion configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    };

    let api_base_url = normalize_api_base_url(api_base_url)?;
    let timeout = parse_timeout(timeout_secs)?;

    Ok(Some(NotionConfig {
        token,
        cases_database_id,
        summons_database_id,
        api_base_url,
        timeout,
    }))
}

fn normalize_api_base_url(value: Option<String>) -> Result<String> {
    let Some(value) = value else {
        return Ok(DEFAULT_API_BASE_URL.to_string());
    };
    if !is_http_url(&value) {
        return Err(Error::InvalidInput(format!(
            "{ENV_API_BASE_URL} must include http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_timeout(value: Option<String>) -> Result<Duration> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(Error::InvalidInput(format!(
            "{ENV_TIMEOUT_SECS} must be a positive number of seconds, got '{value}'"
        ))),
    }
}
