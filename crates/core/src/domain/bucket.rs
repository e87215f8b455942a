// Bucket Domain Model

use serde::{Deserialize, Serialize};

/// Bucket ID (unique per bucket, assigned by the splitting policy)
pub type BucketId = String;

/// A single test to run, as produced by the external splitting policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestEntry {
    pub class_name: String,
    pub method_name: String,
    pub case_id: Option<String>,
}

impl TestEntry {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        case_id: Option<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            case_id,
        }
    }

}

// `ClassName/methodName` form used in logs and result attribution
impl std::fmt::Display for TestEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.class_name, self.method_name)
    }
}

/// Execution context the bucket's tests must run against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTarget {
    pub platform: String,
    pub runtime: String,
}

impl TestTarget {
    pub fn new(platform: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            runtime: runtime.into(),
        }
    }
}

/// Per-bucket execution parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionBehavior {
    /// Timeout for a single test invocation (ms)
    pub test_timeout_ms: i64,
    /// Total attempts allowed per test entry, first run included
    pub allowed_attempts: u32,
}

impl Default for ExecutionBehavior {
    fn default() -> Self {
        Self {
            test_timeout_ms: 600_000,
            allowed_attempts: 2,
        }
    }
}

/// Immutable unit of work: an ordered, non-empty set of test entries plus
/// the context they run in. Identity is `bucket_id`; contents never change
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub bucket_id: BucketId,
    pub test_entries: Vec<TestEntry>,
    pub target: TestTarget,
    pub behavior: ExecutionBehavior,
}

impl Bucket {
    pub fn new(
        bucket_id: impl Into<String>,
        test_entries: Vec<TestEntry>,
        target: TestTarget,
        behavior: ExecutionBehavior,
    ) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            test_entries,
            target,
            behavior,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<bucket {} with {} entries>",
            self.bucket_id,
            self.test_entries.len()
        )
    }
}
