//! Bidirectional sync between the remote workspace and the local store.
//!
//! [`SyncEngine`] is the only entry point: `sync_all` pulls every record
//! type, `push_one` propagates a single local record.

mod engine;
mod locks;
mod pull;
mod push;

use std::future::Future;
use std::time::Duration;

pub use engine::SyncEngine;
pub use locks::{RecordGuard, RecordLocks};

use crate::remote::{RemoteError, RemoteResult};

/// Bound a remote call so a hung request surfaces as a failure
async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = RemoteResult<T>>,
) -> RemoteResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| RemoteError::Timeout(limit))?
}
