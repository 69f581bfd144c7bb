//! Per-record mutual exclusion between pulls and pushes.
//!
//! A caller acquires its whole key set in one call. Keys are locked in
//! sorted order and a holder never asks for more keys while holding some,
//! so two callers can never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::RecordType;

type LockKey = (RecordType, String);
type LockTable = HashMap<LockKey, Arc<AsyncMutex<()>>>;

#[derive(Clone, Default)]
pub struct RecordLocks {
    table: Arc<Mutex<LockTable>>,
}

/// Holds a set of record locks until dropped
pub struct RecordGuard {
    locks: RecordLocks,
    keys: Vec<LockKey>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl std::fmt::Debug for RecordGuard {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RecordGuard")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl RecordLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every id in `ids` (duplicates allowed) for `record_type`
    pub async fn acquire(&self, record_type: RecordType, ids: &[&str]) -> RecordGuard {
        let mut keys = ids
            .iter()
            .map(|id| (record_type, (*id).to_string()))
            .collect::<Vec<_>>();
        keys.sort();
        keys.dedup();

        let mutexes = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            keys.iter()
                .map(|key| Arc::clone(table.entry(key.clone()).or_default()))
                .collect::<Vec<_>>()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        RecordGuard {
            locks: self.clone(),
            keys,
            guards,
        }
    }

    fn release(&self, keys: &[LockKey]) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            // Only the table itself still references an idle lock
            if table
                .get(key)
                .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
            {
                table.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        self.guards.clear();
        self.locks.release(&self.keys);
    }
}
