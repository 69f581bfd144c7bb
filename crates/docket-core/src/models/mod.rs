//! Data models for Docket

mod case;
mod record;
mod summons;
mod sync_result;

pub use case::{CaseRecord, DEFAULT_CASE_STATUS, DEFAULT_DEPARTMENT};
pub use record::{is_canonical_id, new_local_id, LocalRecord, RecordType};
pub use summons::{
    SummonsDates, SummonsFlags, SummonsRecord, SummonsStatus, DEFAULT_PERSON_ROLE,
};
pub use sync_result::{PushResult, SyncReport, SyncResult};
