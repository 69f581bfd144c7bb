//! docket-core - Core library for Docket
//!
//! This crate contains the record models, the local store, the remote
//! workspace client and the bidirectional sync engine used by every Docket
//! interface.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod property;
pub mod remote;
pub mod services;
pub mod status;
pub mod sync;
pub mod util;

pub use config::{NotionConfig, SyncSettings};
pub use error::{Error, Result};
pub use models::{
    CaseRecord, PushResult, RecordType, SummonsRecord, SummonsStatus, SyncReport, SyncResult,
};
pub use remote::{NotionClient, RemoteStore};
pub use services::DatabaseService;
pub use status::infer_status;
pub use sync::SyncEngine;
