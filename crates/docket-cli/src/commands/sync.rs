use std::path::Path;

use docket_core::{RecordType, RemoteStore, SyncEngine, SyncReport, SyncResult};

use crate::commands::common::{format_sync_result_line, open_engine};
use crate::error::CliError;

pub async fn run_sync(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let engine = open_engine(db_path).await?;
    sync_with(&engine, as_json).await.map(|_| ())
}

pub async fn run_pull(
    record_type: RecordType,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let engine = open_engine(db_path).await?;
    pull_with(&engine, record_type, as_json).await.map(|_| ())
}

pub async fn sync_with<R: RemoteStore>(
    engine: &SyncEngine<R>,
    as_json: bool,
) -> Result<SyncReport, CliError> {
    let report = engine.sync_all().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_sync_result_line("cases", &report.cases));
        println!("{}", format_sync_result_line("summons", &report.summons));
        print_record_errors(&report.cases);
        print_record_errors(&report.summons);
    }

    if report.is_success() {
        Ok(report)
    } else {
        Err(CliError::SyncIncomplete)
    }
}

pub async fn pull_with<R: RemoteStore>(
    engine: &SyncEngine<R>,
    record_type: RecordType,
    as_json: bool,
) -> Result<SyncResult, CliError> {
    let result = engine.pull(record_type).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_sync_result_line(record_type.table(), &result));
        print_record_errors(&result);
    }

    if result.is_success() {
        Ok(result)
    } else {
        Err(CliError::SyncIncomplete)
    }
}

fn print_record_errors(result: &SyncResult) {
    for error in &result.errors {
        eprintln!("  {error}");
    }
}
