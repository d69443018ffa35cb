//! Completion classification
//!
//! Status vocabularies are inconsistent across task implementations, so
//! classification is an ordered, first-match-wins rule chain over synonym
//! tables. The tables are data: growing a vocabulary is an edit here, not a
//! control-flow change.

use crate::phase::Phase;
use relay_remote::TaskSnapshot;

/// Status strings that mean the task finished with a result
pub const COMPLETED_SYNONYMS: &[&str] = &[
    "completed",
    "complete",
    "finished",
    "done",
    "success",
    "successful",
];

/// Status strings that mean the task failed
pub const FAILED_SYNONYMS: &[&str] = &["failed", "error", "cancelled"];

/// Status strings that mean the task has not started yet
pub const PENDING_SYNONYMS: &[&str] = &["pending", "queued"];

/// Status strings that mean the task is known to still be working.
/// While one of these is reported, result data alone is never taken as
/// completion.
pub const IN_FLIGHT_STATUSES: &[&str] = &[
    "pending",
    "running",
    "in_progress",
    "active",
    "processing",
    "executing",
];

/// Map a snapshot onto a lifecycle phase
///
/// Rules, in order, first match wins:
/// 1. completed synonym -> `Completed`
/// 2. failed synonym -> `Failed`
/// 3. pending synonym -> `Pending`
/// 4. result data present while status is not a known in-flight value ->
///    `Completed` (some task implementations populate output before
///    updating status; known source of false positives, see
///    `EngineConfig::defensive_completion`)
/// 5. non-empty status -> `Running`, else `Unknown`
pub fn classify(snapshot: &TaskSnapshot, defensive_completion: bool) -> Phase {
    let status = snapshot.status_normalized();

    if COMPLETED_SYNONYMS.contains(&status.as_str()) {
        return Phase::Completed;
    }

    if FAILED_SYNONYMS.contains(&status.as_str()) {
        return Phase::Failed;
    }

    if PENDING_SYNONYMS.contains(&status.as_str()) {
        return Phase::Pending;
    }

    if defensive_completion
        && snapshot.is_result_bearing()
        && !IN_FLIGHT_STATUSES.contains(&status.as_str())
    {
        return Phase::Completed;
    }

    if snapshot.has_status() {
        Phase::Running
    } else {
        Phase::Unknown
    }
}
