// Retry policy over accumulated test history

use tracing::{info, warn};

use crate::domain::{ExecutionBehavior, TestEntry, TestEntryResult};
use crate::port::TestHistoryTracker;

/// Retries a failed test entry while its recorded attempts stay below the
/// bucket's allowed attempts.
///
/// An attempt is one bucket execution that covered the entry; a lost result
/// (no runs recorded) still counts as an attempt, so a worker that keeps
/// crashing cannot retry an entry forever.
pub struct AttemptBoundedTestHistoryTracker;

impl AttemptBoundedTestHistoryTracker {
    pub fn new() -> Self {
        Self
    }

    fn attempts_made(failed_result: &TestEntryResult, history: &[TestEntryResult]) -> u32 {
        let runs_of = |result: &TestEntryResult| result.test_run_results.len().max(1) as u32;
        runs_of(failed_result) + history.iter().map(runs_of).sum::<u32>()
    }
}

impl Default for AttemptBoundedTestHistoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHistoryTracker for AttemptBoundedTestHistoryTracker {
    fn should_retry(
        &self,
        test_entry: &TestEntry,
        failed_result: &TestEntryResult,
        history: &[TestEntryResult],
        behavior: &ExecutionBehavior,
    ) -> bool {
        let attempts_made = Self::attempts_made(failed_result, history);

        if attempts_made >= behavior.allowed_attempts {
            warn!(
                test = %test_entry,
                attempts_made = attempts_made,
                allowed_attempts = behavior.allowed_attempts,
                "Not retrying: attempt allowance exhausted"
            );
            return false;
        }

        info!(
            test = %test_entry,
            attempts_made = attempts_made,
            allowed_attempts = behavior.allowed_attempts,
            "Scheduling retry for failed test"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TestRunResult;

    fn entry() -> TestEntry {
        TestEntry::new("ClassName", "testMethod", None)
    }

    fn failed_run() -> TestRunResult {
        TestRunResult::new(false, vec![], 100, 1000)
    }

    fn behavior(allowed_attempts: u32) -> ExecutionBehavior {
        ExecutionBehavior {
            test_timeout_ms: 600_000,
            allowed_attempts,
        }
    }

    #[test]
    fn first_failure_retries_when_allowance_remains() {
        let tracker = AttemptBoundedTestHistoryTracker::new();
        let failed = TestEntryResult::with_results(entry(), vec![failed_run()]);

        assert!(tracker.should_retry(&entry(), &failed, &[], &behavior(2)));
    }

    #[test]
    fn failure_does_not_retry_once_allowance_exhausted() {
        let tracker = AttemptBoundedTestHistoryTracker::new();
        let failed = TestEntryResult::with_results(entry(), vec![failed_run()]);
        let history = vec![TestEntryResult::with_results(entry(), vec![failed_run()])];

        assert!(!tracker.should_retry(&entry(), &failed, &history, &behavior(2)));
    }

    #[test]
    fn lost_result_counts_as_one_attempt() {
        let tracker = AttemptBoundedTestHistoryTracker::new();
        let lost = TestEntryResult::lost(entry());

        assert!(tracker.should_retry(&entry(), &lost, &[], &behavior(2)));
        let history = vec![TestEntryResult::lost(entry())];
        assert!(!tracker.should_retry(&entry(), &lost, &history, &behavior(2)));
    }

    #[test]
    fn single_attempt_allowance_never_retries() {
        let tracker = AttemptBoundedTestHistoryTracker::new();
        let failed = TestEntryResult::with_results(entry(), vec![failed_run()]);

        assert!(!tracker.should_retry(&entry(), &failed, &[], &behavior(1)));
    }
}
