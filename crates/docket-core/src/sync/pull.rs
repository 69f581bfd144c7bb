//! Pull reconciler: remote snapshot -> local store.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;

use super::engine::SyncEngine;
use super::with_timeout;
use crate::db::PullOp;
use crate::error::Result;
use crate::models::{is_canonical_id, LocalRecord, RecordType, SummonsRecord, SyncResult};
use crate::property::{map_case, map_summons, RemotePage};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};
use crate::util::unix_millis_now;

/// Fetch every page of a record type, following cursors to the end
async fn fetch_snapshot<R: RemoteStore>(
    remote: &R,
    record_type: RecordType,
    timeout: Duration,
) -> RemoteResult<Vec<Value>> {
    let mut results = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen_cursors = HashSet::new();

    loop {
        let page = with_timeout(timeout, remote.query_page(record_type, cursor.as_deref())).await?;
        results.extend(page.results);

        let Some(next) = page.next_cursor else {
            break;
        };
        if !seen_cursors.insert(next.clone()) {
            return Err(RemoteError::InvalidPayload(format!(
                "{record_type} query returned cursor {next} twice"
            )));
        }
        cursor = Some(next);
    }

    Ok(results)
}

/// Mapped remote state for one record type
#[derive(Debug, Default)]
struct Snapshot {
    records: Vec<LocalRecord>,
    /// Every live id the remote reported, including unmappable pages
    seen: HashSet<String>,
    errors: Vec<String>,
}

fn map_page(record_type: RecordType, page: &RemotePage) -> LocalRecord {
    match record_type {
        RecordType::Case => LocalRecord::Case(map_case(page)),
        RecordType::Summons => LocalRecord::Summons(map_summons(page)),
    }
}

fn map_snapshot(record_type: RecordType, pages: Vec<Value>) -> Snapshot {
    let mut snapshot = Snapshot::default();

    for raw in pages {
        let raw_id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);

        let page = match RemotePage::try_from(raw) {
            Ok(page) => page,
            Err(error) => {
                let label = raw_id.as_deref().unwrap_or("<no id>");
                tracing::warn!("Skipping unmappable {record_type} page {label}: {error}");
                snapshot
                    .errors
                    .push(format!("{record_type} {label}: {error}"));
                // Still present remotely, so it must not be tombstoned
                if let Some(id) = raw_id {
                    snapshot.seen.insert(id);
                }
                continue;
            }
        };

        if page.archived {
            continue;
        }
        if !snapshot.seen.insert(page.id.clone()) {
            tracing::warn!("Ignoring duplicate {record_type} page {}", page.id);
            continue;
        }
        snapshot.records.push(map_page(record_type, &page));
    }

    snapshot
}

/// Decide the local write for one incoming record; `None` when unchanged
/// Carry over local relations the remote has not received yet.
///
/// A link survives a remote page without that relation when it still points
/// at a pending id (push leaves those out) or when the summons has local
/// changes newer than its last sync (e.g. a link rewritten by an identifier
/// migration). Returns whether any link was kept.
fn keep_unpushed_links(incoming: &mut SummonsRecord, local: &SummonsRecord) -> bool {
    let has_unpushed_changes =
        !matches!(local.synced_at, Some(synced_at) if synced_at >= local.updated_at);
    let links = [
        (&mut incoming.case_id, &local.case_id),
        (&mut incoming.previous_summon_id, &local.previous_summon_id),
    ];

    let mut kept = false;
    for (remote_link, local_link) in links {
        if remote_link.is_some() {
            continue;
        }
        if let Some(link) = local_link {
            if has_unpushed_changes || !is_canonical_id(link) {
                *remote_link = Some(link.clone());
                kept = true;
            }
        }
    }
    kept
}

fn stage(incoming: &LocalRecord, local: Option<LocalRecord>, now: i64) -> Option<PullOp> {
    match (incoming, local) {
        (LocalRecord::Case(remote), None) => {
            let mut case = remote.clone();
            case.synced_at = Some(now);
            Some(PullOp::Insert(LocalRecord::Case(case)))
        }
        (LocalRecord::Summons(remote), None) => {
            let mut summons = remote.clone();
            summons.synced_at = Some(now);
            Some(PullOp::Insert(LocalRecord::Summons(summons)))
        }
        (LocalRecord::Case(remote), Some(LocalRecord::Case(local))) => {
            if local.synced_at.is_some() && remote.same_remote_fields(&local) {
                return None;
            }
            let mut case = remote.clone();
            case.created_at = local.created_at;
            case.synced_at = Some(now);
            Some(PullOp::Update(LocalRecord::Case(case)))
        }
        (LocalRecord::Summons(remote), Some(LocalRecord::Summons(local))) => {
            let mut summons = remote.clone();
            let links_pending = keep_unpushed_links(&mut summons, &local);
            if local.synced_at.is_some() && summons.same_remote_fields(&local) {
                return None;
            }
            summons.created_at = local.created_at;
            summons.notes = local.notes;
            summons.mode_of_service = local.mode_of_service;
            summons.purpose = local.purpose;
            if links_pending {
                // Still owes the remote its links; stays dirty until pushed.
                summons.updated_at = local.updated_at;
                summons.synced_at = local.synced_at;
            } else {
                summons.synced_at = Some(now);
            }
            Some(PullOp::Update(LocalRecord::Summons(summons)))
        }
        (_, Some(_)) => None,
    }
}

pub(super) async fn pull<R: RemoteStore>(
    engine: &SyncEngine<R>,
    record_type: RecordType,
) -> Result<SyncResult> {
    let settings = engine.settings();
    let db = engine.database();
    let started_at = unix_millis_now();

    let pages = fetch_snapshot(engine.remote(), record_type, settings.remote_timeout).await?;
    tracing::debug!("Fetched {} {record_type} page(s)", pages.len());

    let Snapshot {
        records,
        seen,
        errors,
    } = map_snapshot(record_type, pages);
    let mut result = SyncResult {
        errors,
        ..SyncResult::default()
    };

    for chunk in records.chunks(settings.batch_size()) {
        let ids = chunk.iter().map(LocalRecord::id).collect::<Vec<_>>();
        let _guard = engine.locks.acquire(record_type, &ids).await;
        let now = unix_millis_now();

        let mut ops = Vec::with_capacity(chunk.len());
        let (mut added, mut updated) = (0, 0);
        for incoming in chunk {
            let local = db.get_record(record_type, incoming.id()).await?;
            match stage(incoming, local, now) {
                Some(op @ PullOp::Insert(_)) => {
                    added += 1;
                    ops.push(op);
                }
                Some(op) => {
                    updated += 1;
                    ops.push(op);
                }
                None => result.unchanged += 1,
            }
        }

        db.apply_pull_batch(&ops).await?;
        result.added += added;
        result.updated += updated;
    }

    let stale = db
        .synced_ids(record_type)
        .await?
        .into_iter()
        .filter(|id| !seen.contains(id))
        .collect::<Vec<_>>();

    for chunk in stale.chunks(settings.batch_size()) {
        let ids = chunk.iter().map(String::as_str).collect::<Vec<_>>();
        let _guard = engine.locks.acquire(record_type, &ids).await;

        let mut ops = Vec::new();
        for id in chunk {
            // Records synced after the snapshot was taken (a concurrent push)
            // are not known to be gone yet.
            let synced_before_snapshot = db
                .get_record(record_type, id)
                .await?
                .and_then(|record| record.synced_at())
                .is_some_and(|synced_at| synced_at <= started_at);
            if synced_before_snapshot {
                ops.push(PullOp::Delete {
                    record_type,
                    id: id.clone(),
                });
            }
        }

        db.apply_pull_batch(&ops).await?;
        result.deleted += ops.len();
    }

    tracing::info!(
        "Pulled {record_type}: {} added, {} updated, {} deleted, {} unchanged, {} error(s)",
        result.added,
        result.updated,
        result.deleted,
        result.unchanged,
        result.errors.len()
    );
    Ok(result)
}
