// Job Domain Model

use serde::{Deserialize, Serialize};

use super::queue::QueueState;
use super::result::TestingResult;

/// Job ID (opaque, chosen by the submitting client)
pub type JobId = String;

/// Job priority. Higher-priority jobs are served first by the balancing
/// queue whenever they have ready work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

/// A job as submitted for scheduling. Priority is fixed at the first
/// enqueue for a given job id; `analytics` is an opaque payload carried
/// through for reporting layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritizedJob {
    pub job_id: JobId,
    pub priority: Priority,
    #[serde(default)]
    pub analytics: serde_json::Value,
}

impl PrioritizedJob {
    pub fn new(job_id: impl Into<String>, priority: Priority) -> Self {
        Self {
            job_id: job_id.into(),
            priority,
            analytics: serde_json::Value::Null,
        }
    }
}

/// Snapshot of a job's queue counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobState {
    pub job_id: JobId,
    pub queue_state: QueueState,
}

impl JobState {
    pub fn new(job_id: impl Into<String>, queue_state: QueueState) -> Self {
        Self {
            job_id: job_id.into(),
            queue_state,
        }
    }
}

/// All testing results accumulated for a job so far, in acceptance order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResults {
    pub job_id: JobId,
    pub testing_results: Vec<TestingResult>,
}

impl JobResults {
    pub fn new(job_id: impl Into<String>, testing_results: Vec<TestingResult>) -> Self {
        Self {
            job_id: job_id.into(),
            testing_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn priority_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Priority::Medium).unwrap();
        assert_eq!(json, "\"MEDIUM\"");
    }
}
