use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] docket_core::Error),
    #[error(transparent)]
    Remote(#[from] docket_core::remote::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record id cannot be empty")]
    EmptyRecordId,
    #[error("Sync finished with errors")]
    SyncIncomplete,
    #[error("Push of {id} failed: {reason}")]
    PushFailed { id: String, reason: String },
    #[error(
        "Sync is not configured. Set NOTION_TOKEN, NOTION_CASES_DATABASE_ID and NOTION_SUMMONS_DATABASE_ID to enable `docket sync`."
    )]
    SyncNotConfigured,
}
