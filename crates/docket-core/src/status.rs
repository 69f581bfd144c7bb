//! Summons status inference
//!
//! The remote workspace stores a summons as independent checkboxes and dates.
//! [`infer_status`] collapses them into one lifecycle label. Both the pull
//! path and local flag edits go through it; no other code assigns a status.

use crate::models::{SummonsDates, SummonsFlags, SummonsStatus};

/// Derive the lifecycle status of a summons.
///
/// Precedence, highest first:
/// 1. statement recorded -> `Statement Completed`
/// 2. statement ongoing -> `Statement In Progress`
/// 3. reschedule requested, or an unresolved rescheduled date -> `Rescheduled`
/// 4. served -> `Awaiting Appearance`
/// 5. issued -> `Issued`
/// 6. otherwise -> `Draft`
#[must_use]
pub fn infer_status(flags: &SummonsFlags, dates: &SummonsDates) -> SummonsStatus {
    if flags.statement_recorded {
        SummonsStatus::StatementCompleted
    } else if flags.statement_ongoing {
        SummonsStatus::StatementInProgress
    } else if flags.requests_reschedule || has_pending_reschedule(dates) {
        SummonsStatus::Rescheduled
    } else if flags.is_served {
        SummonsStatus::AwaitingAppearance
    } else if flags.is_issued {
        SummonsStatus::Issued
    } else {
        SummonsStatus::Draft
    }
}

/// A rescheduled date is unresolved while it moves the appearance: there is
/// no appearance date yet, or it falls after the recorded appearance date.
fn has_pending_reschedule(dates: &SummonsDates) -> bool {
    match (dates.rescheduled_date, dates.appearance_date) {
        (Some(rescheduled), Some(appearance)) => rescheduled > appearance,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
