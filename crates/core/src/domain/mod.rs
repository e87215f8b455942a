// Domain Layer - Pure data model, no queue logic

pub mod bucket;
pub mod config;
pub mod error;
pub mod job;
pub mod queue;
pub mod result;
pub mod worker;

// Re-exports
pub use bucket::{Bucket, BucketId, ExecutionBehavior, TestEntry, TestTarget};
pub use config::QueueServerConfiguration;
pub use error::DomainError;
pub use job::{JobId, JobResults, JobState, PrioritizedJob, Priority};
pub use queue::{
    AcceptResult, DequeueResult, DequeuedBucket, EnqueuedBucket, QueueState, RequestId,
    StuckBucket, StuckBucketReason,
};
pub use result::{BucketResult, TestEntryResult, TestException, TestRunResult, TestingResult};
pub use worker::{AlivenessStatus, WorkerAliveness, WorkerId};
