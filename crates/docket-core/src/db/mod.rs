//! Local store for Docket

mod case_repository;
mod columns;
mod connection;
mod migrations;
mod summons_repository;
mod transaction;

pub use case_repository::{CaseRepository, LibSqlCaseRepository};
pub use connection::Database;
pub use summons_repository::{LibSqlSummonsRepository, SummonsRepository};
pub use transaction::{
    apply_pull_batch, delete_case_cascade, migrate_identifier, Dependent, PullOp, DEPENDENTS,
};
