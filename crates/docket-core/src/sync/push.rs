//! Push writer: one local record -> remote workspace.

use super::engine::SyncEngine;
use super::with_timeout;
use crate::error::{Error, Result};
use crate::models::{is_canonical_id, LocalRecord, PushResult, RecordType};
use crate::property::{case_properties, summons_properties, write, PropertyMap, LOCAL_ID_PROPERTY};
use crate::remote::{RemoteStore, UpdateOutcome};
use crate::util::unix_millis_now;

fn outgoing_properties(record: &LocalRecord) -> PropertyMap {
    match record {
        LocalRecord::Case(case) => case_properties(case),
        LocalRecord::Summons(summons) => {
            let pending_links = [
                ("case", summons.case_id.as_deref()),
                ("previous summons", summons.previous_summon_id.as_deref()),
            ];
            for (label, target) in pending_links {
                if let Some(target) = target.filter(|id| !is_canonical_id(id)) {
                    tracing::warn!(
                        "Summons {} links to unpushed {label} {target}; relation left out",
                        summons.id
                    );
                }
            }
            summons_properties(summons)
        }
    }
}

/// Find the page a previous attempt created for `local_id`, or create one.
async fn create_or_reuse<R: RemoteStore>(
    engine: &SyncEngine<R>,
    record_type: RecordType,
    local_id: &str,
    properties: &PropertyMap,
) -> Result<String> {
    let remote = engine.remote();
    let timeout = engine.settings().remote_timeout;

    if let Some(existing) =
        with_timeout(timeout, remote.find_by_local_id(record_type, local_id)).await?
    {
        let outcome = with_timeout(timeout, remote.update_page(&existing, properties)).await?;
        if outcome == UpdateOutcome::Updated {
            tracing::info!("Reusing remote {record_type} {existing} created earlier for {local_id}");
            return Ok(existing);
        }
    }

    let mut tagged = properties.clone();
    tagged.insert(LOCAL_ID_PROPERTY.to_string(), write::rich_text(local_id));
    let new_id = with_timeout(timeout, remote.create_page(record_type, &tagged)).await?;
    if !is_canonical_id(&new_id) {
        return Err(Error::InvalidInput(format!(
            "remote returned non-canonical id {new_id} for {record_type} {local_id}"
        )));
    }
    tracing::info!("Created remote {record_type} {new_id} for {local_id}");
    Ok(new_id)
}

pub(super) async fn push<R: RemoteStore>(
    engine: &SyncEngine<R>,
    record_type: RecordType,
    id: &str,
) -> Result<PushResult> {
    let db = engine.database();
    let timeout = engine.settings().remote_timeout;

    let new_id = {
        let _guard = engine.locks.acquire(record_type, &[id]).await;
        let record = db
            .get_record(record_type, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{record_type} {id}")))?;
        let properties = outgoing_properties(&record);

        if is_canonical_id(id) {
            let outcome =
                with_timeout(timeout, engine.remote().update_page(id, &properties)).await?;
            if outcome == UpdateOutcome::Updated {
                db.mark_synced(record_type, id, unix_millis_now()).await?;
                tracing::info!("Pushed {record_type} {id}");
                return Ok(PushResult::succeeded(id, None));
            }
            tracing::info!("Remote {record_type} {id} not found; creating it");
        }

        create_or_reuse(engine, record_type, id, &properties).await?
    };

    // The first guard is released so both ids can be taken in sorted order.
    let _guard = engine.locks.acquire(record_type, &[id, &new_id]).await;
    let migrated = db
        .migrate_identifier(record_type, id, &new_id, unix_millis_now())
        .await?;

    if !migrated {
        // A concurrent push of the same record finished the migration first.
        if db.get_record(record_type, &new_id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "{record_type} {id} disappeared before migrating to {new_id}"
            )));
        }
        tracing::debug!("{record_type} {id} was already migrated to {new_id}");
    }

    Ok(PushResult::succeeded(id, Some(new_id)))
}
