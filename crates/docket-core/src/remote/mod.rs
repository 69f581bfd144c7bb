//! Remote workspace access
//!
//! The sync engine talks to the remote system only through [`RemoteStore`],
//! so it can be driven by the HTTP client in production and by an in-memory
//! double in tests.

mod notion;

#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::models::RecordType;
use crate::property::PropertyMap;

pub use notion::{NotionClient, NOTION_VERSION};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("Remote API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// One page of a bulk query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    /// Raw page objects; mapping happens per record in the reconciler
    pub results: Vec<Value>,
    /// Cursor for the next page, `None` on the last page
    pub next_cursor: Option<String>,
}

/// Result of an in-place update.
///
/// `NotFound` is not an error: it is the signal to fall back to creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

/// Operations the sync engine needs from the remote system
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Fetch one page of all records of a type, starting at `cursor`
    async fn query_page(
        &self,
        record_type: RecordType,
        cursor: Option<&str>,
    ) -> RemoteResult<QueryPage>;

    /// Update an existing record in place
    async fn update_page(
        &self,
        page_id: &str,
        properties: &PropertyMap,
    ) -> RemoteResult<UpdateOutcome>;

    /// Create a record, returning its canonical identifier
    async fn create_page(
        &self,
        record_type: RecordType,
        properties: &PropertyMap,
    ) -> RemoteResult<String>;

    /// Find a live record previously created from the given local identifier
    async fn find_by_local_id(
        &self,
        record_type: RecordType,
        local_id: &str,
    ) -> RemoteResult<Option<String>>;
}
