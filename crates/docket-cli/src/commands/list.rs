use std::path::Path;

use docket_core::RecordType;

use crate::commands::common::{
    case_to_list_item, format_case_lines, format_summons_lines, open_database,
    summons_to_list_item, CaseListItem, SummonsListItem,
};
use crate::error::CliError;

pub async fn run_list(
    record_type: RecordType,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    for line in list_lines(record_type, limit, as_json, db_path).await? {
        println!("{line}");
    }
    Ok(())
}

pub async fn list_lines(
    record_type: RecordType,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<Vec<String>, CliError> {
    let db = open_database(db_path).await?;

    let lines = match record_type {
        RecordType::Case => {
            let cases = db.list_cases(limit, 0).await?;
            if as_json {
                let items = cases.iter().map(case_to_list_item).collect::<Vec<CaseListItem>>();
                vec![serde_json::to_string_pretty(&items)?]
            } else {
                format_case_lines(&cases)
            }
        }
        RecordType::Summons => {
            let summonses = db.list_summons(limit, 0).await?;
            if as_json {
                let items = summonses
                    .iter()
                    .map(summons_to_list_item)
                    .collect::<Vec<SummonsListItem>>();
                vec![serde_json::to_string_pretty(&items)?]
            } else {
                format_summons_lines(&summonses)
            }
        }
    };

    Ok(lines)
}
