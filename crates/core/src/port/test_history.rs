// Test History Tracker Port
// Retry policy consulted during result acceptance. Injected so the queue
// never hard-codes a retry strategy and tests can swap it out.

use crate::domain::{ExecutionBehavior, TestEntry, TestEntryResult};

/// Decides whether a failed test entry should be re-enqueued for another
/// attempt.
///
/// `failed_result` is the result being accepted right now; `history` is
/// every result previously recorded for the same entry within the job,
/// oldest first. `behavior` comes from the bucket the entry ran in.
pub trait TestHistoryTracker: Send + Sync {
    fn should_retry(
        &self,
        test_entry: &TestEntry,
        failed_result: &TestEntryResult,
        history: &[TestEntryResult],
        behavior: &ExecutionBehavior,
    ) -> bool;
}

/// Policy that never retries. Terminal failures are reported as-is.
pub struct NoRetryTestHistoryTracker;

impl TestHistoryTracker for NoRetryTestHistoryTracker {
    fn should_retry(
        &self,
        _test_entry: &TestEntry,
        _failed_result: &TestEntryResult,
        _history: &[TestEntryResult],
        _behavior: &ExecutionBehavior,
    ) -> bool {
        false
    }
}
