// Queue Domain Model - enqueued/dequeued bucket records and queue snapshots

use serde::{Deserialize, Serialize};

use super::bucket::Bucket;
use super::result::BucketResult;
use super::worker::WorkerId;

/// Request ID identifying one polling attempt by a worker. Supplied by the
/// caller; retries of the same logical request must reuse the same value.
pub type RequestId = String;

/// A bucket sitting in a job queue, waiting to be handed out.
///
/// `unique_identifier` is assigned by the queue and disambiguates duplicate
/// buckets enqueued into the same job; bucket identity alone is not unique
/// within a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueuedBucket {
    pub bucket: Bucket,
    pub enqueue_timestamp: i64,
    pub unique_identifier: String,
}

impl EnqueuedBucket {
    pub fn new(bucket: Bucket, enqueue_timestamp: i64, unique_identifier: impl Into<String>) -> Self {
        Self {
            bucket,
            enqueue_timestamp,
            unique_identifier: unique_identifier.into(),
        }
    }
}

/// An outstanding, unresolved assignment: a bucket handed to a worker in
/// response to a specific request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DequeuedBucket {
    pub enqueued_bucket: EnqueuedBucket,
    pub worker_id: WorkerId,
    pub request_id: RequestId,
}

impl DequeuedBucket {
    pub fn new(
        enqueued_bucket: EnqueuedBucket,
        worker_id: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            enqueued_bucket,
            worker_id: worker_id.into(),
            request_id: request_id.into(),
        }
    }
}

/// Outcome of a worker's poll for work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DequeueResult {
    /// An assignment; the worker should run the bucket and report back
    Dequeued(DequeuedBucket),
    /// No work for this worker right now; poll again after the interval
    CheckAgainLater { check_after_ms: u64 },
}

/// Why a dequeued bucket was judged stuck during a recovery sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StuckBucketReason {
    /// The worker no longer reports the bucket as being processed
    BucketLost,
    /// The worker stopped heartbeating altogether
    WorkerSilent,
}

impl std::fmt::Display for StuckBucketReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StuckBucketReason::BucketLost => write!(f, "BUCKET_LOST"),
            StuckBucketReason::WorkerSilent => write!(f, "WORKER_SILENT"),
        }
    }
}

/// Report of one recovered assignment. Produced by a sweep, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StuckBucket {
    pub reason: StuckBucketReason,
    pub dequeued_bucket: DequeuedBucket,
}

impl StuckBucket {
    pub fn new(reason: StuckBucketReason, dequeued_bucket: DequeuedBucket) -> Self {
        Self {
            reason,
            dequeued_bucket,
        }
    }
}

/// Snapshot of a job queue's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub enqueued_bucket_count: usize,
    pub dequeued_bucket_count: usize,
}

impl QueueState {
    pub fn new(enqueued_bucket_count: usize, dequeued_bucket_count: usize) -> Self {
        Self {
            enqueued_bucket_count,
            dequeued_bucket_count,
        }
    }
}

/// Outcome of accepting a bucket result: the result itself plus any buckets
/// that were automatically re-enqueued to retry failed entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptResult {
    pub accepted_result: BucketResult,
    pub reenqueued_buckets: Vec<Bucket>,
}
