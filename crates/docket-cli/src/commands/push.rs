use std::path::Path;

use docket_core::{PushResult, RecordType, RemoteStore, SyncEngine};

use crate::commands::common::{format_push_line, normalize_record_id, open_engine};
use crate::error::CliError;

pub async fn run_push(
    record_type: RecordType,
    id: &str,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let engine = open_engine(db_path).await?;
    push_with(&engine, record_type, &id, as_json).await.map(|_| ())
}

pub async fn push_with<R: RemoteStore>(
    engine: &SyncEngine<R>,
    record_type: RecordType,
    id: &str,
    as_json: bool,
) -> Result<PushResult, CliError> {
    let result = engine.push_one(record_type, id).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_push_line(&result));
    }

    match &result.error {
        Some(reason) => Err(CliError::PushFailed {
            id: result.id.clone(),
            reason: reason.clone(),
        }),
        None => Ok(result),
    }
}
