//! Services shared by the sync engine and its callers

mod database;

pub use database::DatabaseService;
