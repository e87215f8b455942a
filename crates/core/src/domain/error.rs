// Domain Error Types

use thiserror::Error;

use super::bucket::BucketId;
use super::job::JobId;
use super::queue::RequestId;
use super::worker::WorkerId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("No outstanding assignment matches bucket {bucket_id} for worker {worker_id} with request {request_id}")]
    AssignmentMismatch {
        bucket_id: BucketId,
        worker_id: WorkerId,
        request_id: RequestId,
    },
}

pub type Result<T> = std::result::Result<T, DomainError>;
