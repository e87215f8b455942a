// Queue Server Facade
// The operation surface an endpoint layer mounts. Pure delegation to the
// balancing queue and the aliveness tracker; no transport lives here.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{
    AcceptResult, Bucket, BucketId, BucketResult, DequeueResult, JobId, JobResults, JobState,
    PrioritizedJob, RequestId, StuckBucket, WorkerAliveness, WorkerId,
};
use crate::port::WorkerAlivenessProvider;

use super::aliveness::WorkerAlivenessTracker;
use super::balancing_queue::BalancingBucketQueue;

/// Bundles the queue with the aliveness tracker behind one handle.
pub struct QueueServer {
    balancing_queue: Arc<BalancingBucketQueue>,
    aliveness_tracker: Arc<WorkerAlivenessTracker>,
}

impl QueueServer {
    pub fn new(
        balancing_queue: Arc<BalancingBucketQueue>,
        aliveness_tracker: Arc<WorkerAlivenessTracker>,
    ) -> Self {
        Self {
            balancing_queue,
            aliveness_tracker,
        }
    }

    // Job-facing operations

    pub fn enqueue(&self, buckets: Vec<Bucket>, prioritized_job: &PrioritizedJob) {
        self.balancing_queue.enqueue(buckets, prioritized_job);
    }

    pub fn state(&self, job_id: &JobId) -> crate::domain::error::Result<JobState> {
        self.balancing_queue.state(job_id)
    }

    pub fn results(&self, job_id: &JobId) -> crate::domain::error::Result<JobResults> {
        self.balancing_queue.results(job_id)
    }

    pub fn delete(&self, job_id: &JobId) -> crate::domain::error::Result<()> {
        self.balancing_queue.delete(job_id)
    }

    pub fn ongoing_job_ids(&self) -> Vec<JobId> {
        self.balancing_queue.ongoing_job_ids()
    }

    // Worker-facing operations

    pub fn register_worker(&self, worker_id: impl Into<String>) {
        self.aliveness_tracker.register_worker(worker_id);
    }

    pub fn worker_heartbeat(&self, worker_id: &WorkerId, bucket_ids: HashSet<BucketId>) {
        self.aliveness_tracker.heartbeat(worker_id, bucket_ids);
    }

    pub fn block_worker(&self, worker_id: &WorkerId) {
        self.aliveness_tracker.block_worker(worker_id);
    }

    pub fn worker_aliveness(&self, worker_id: &WorkerId) -> WorkerAliveness {
        self.aliveness_tracker.aliveness_for_worker(worker_id)
    }

    pub fn dequeue_bucket(&self, request_id: &RequestId, worker_id: &WorkerId) -> DequeueResult {
        self.balancing_queue.dequeue_bucket(request_id, worker_id)
    }

    pub fn accept(
        &self,
        bucket_result: &BucketResult,
        request_id: &RequestId,
        worker_id: &WorkerId,
    ) -> crate::domain::error::Result<AcceptResult> {
        self.balancing_queue.accept(bucket_result, request_id, worker_id)
    }

    // Recovery

    pub fn reenqueue_stuck_buckets(&self) -> Vec<StuckBucket> {
        self.balancing_queue.reenqueue_stuck_buckets()
    }
}
