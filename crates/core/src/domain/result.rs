// Testing Result Domain Model

use serde::{Deserialize, Serialize};

use super::bucket::{BucketId, TestEntry};

/// A failure raised inside a test body, pointing back at the test source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestException {
    pub reason: String,
    pub file_path_in_project: String,
    pub line_number: i32,
}

impl TestException {
    pub fn new(
        reason: impl Into<String>,
        file_path_in_project: impl Into<String>,
        line_number: i32,
    ) -> Self {
        Self {
            reason: reason.into(),
            file_path_in_project: file_path_in_project.into(),
            line_number,
        }
    }
}

/// Outcome of a single invocation of a single test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunResult {
    pub succeeded: bool,
    pub exceptions: Vec<TestException>,
    pub duration_ms: i64,
    pub start_timestamp: i64,
}

impl TestRunResult {
    pub fn new(
        succeeded: bool,
        exceptions: Vec<TestException>,
        duration_ms: i64,
        start_timestamp: i64,
    ) -> Self {
        Self {
            succeeded,
            exceptions,
            duration_ms,
            start_timestamp,
        }
    }
}

/// All runs of one test entry within one bucket execution.
///
/// An empty run list marks a lost result: the worker never produced an
/// outcome for the entry (crash, infrastructure failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntryResult {
    pub test_entry: TestEntry,
    pub test_run_results: Vec<TestRunResult>,
}

impl TestEntryResult {
    pub fn with_results(test_entry: TestEntry, test_run_results: Vec<TestRunResult>) -> Self {
        Self {
            test_entry,
            test_run_results,
        }
    }

    /// Lost result: no outcome was ever produced for this entry
    pub fn lost(test_entry: TestEntry) -> Self {
        Self {
            test_entry,
            test_run_results: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.test_run_results.iter().any(|run| run.succeeded)
    }

    pub fn is_lost(&self) -> bool {
        self.test_run_results.is_empty()
    }
}

/// Per-test outcomes for one executed bucket, attributable entry by entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingResult {
    pub bucket_id: BucketId,
    pub unfiltered_results: Vec<TestEntryResult>,
}

impl TestingResult {
    pub fn new(bucket_id: impl Into<String>, unfiltered_results: Vec<TestEntryResult>) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            unfiltered_results,
        }
    }

    pub fn successful_results(&self) -> Vec<&TestEntryResult> {
        self.unfiltered_results
            .iter()
            .filter(|r| r.succeeded())
            .collect()
    }

    pub fn failed_results(&self) -> Vec<&TestEntryResult> {
        self.unfiltered_results
            .iter()
            .filter(|r| !r.succeeded())
            .collect()
    }
}

/// What a worker reports back for a dequeued bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BucketResult {
    /// The bucket ran; per-test outcomes attached
    Testing(TestingResult),
    /// The bucket never ran: simulator boot failure, missing runtime, etc.
    InfrastructureFailure { bucket_id: BucketId, reason: String },
}

impl BucketResult {
    pub fn bucket_id(&self) -> &BucketId {
        match self {
            BucketResult::Testing(testing_result) => &testing_result.bucket_id,
            BucketResult::InfrastructureFailure { bucket_id, .. } => bucket_id,
        }
    }
}
