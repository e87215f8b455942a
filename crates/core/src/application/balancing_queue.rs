// Balancing Bucket Queue
// Multiplexes per-job bucket queues: routes enqueues, picks which job's
// work a polling worker gets, routes result acceptance, aggregates sweeps.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::domain::{
    AcceptResult, Bucket, BucketResult, DequeueResult, DomainError, JobId, JobResults, JobState,
    PrioritizedJob, RequestId, StuckBucket, WorkerId,
};

use super::bucket_queue::{BucketQueue, BucketQueueFactory};

struct JobEntry {
    job: PrioritizedJob,
    created_order: u64,
    queue: Arc<BucketQueue>,
}

struct Registry {
    jobs: HashMap<JobId, Arc<JobEntry>>,
    next_order: u64,
}

/// Owns the job-id -> bucket-queue mapping.
///
/// The registry lock guards only the mapping itself; every bucket operation
/// happens on a snapshot of job entries with at most one per-job lock held
/// at a time, so unrelated jobs never serialize on each other.
pub struct BalancingBucketQueue {
    registry: Mutex<Registry>,
    bucket_queue_factory: BucketQueueFactory,
    check_again_interval_ms: u64,
}

impl BalancingBucketQueue {
    pub fn new(bucket_queue_factory: BucketQueueFactory, check_again_interval_ms: u64) -> Self {
        Self {
            registry: Mutex::new(Registry {
                jobs: HashMap::new(),
                next_order: 0,
            }),
            bucket_queue_factory,
            check_again_interval_ms,
        }
    }

    /// Route buckets to the job's queue, creating it on first enqueue.
    /// Priority is fixed at creation; later enqueues with a different
    /// priority keep the original.
    pub fn enqueue(&self, buckets: Vec<Bucket>, prioritized_job: &PrioritizedJob) {
        let entry = {
            let mut registry = self.registry.lock().unwrap();
            match registry.jobs.get(&prioritized_job.job_id) {
                Some(entry) => {
                    if entry.job.priority != prioritized_job.priority {
                        debug!(
                            job_id = %prioritized_job.job_id,
                            kept = %entry.job.priority,
                            requested = %prioritized_job.priority,
                            "Ignoring priority change for existing job"
                        );
                    }
                    entry.clone()
                }
                None => {
                    let created_order = registry.next_order;
                    registry.next_order += 1;
                    info!(
                        job_id = %prioritized_job.job_id,
                        priority = %prioritized_job.priority,
                        "Creating queue for new job"
                    );
                    let entry = Arc::new(JobEntry {
                        job: prioritized_job.clone(),
                        created_order,
                        queue: Arc::new(self.bucket_queue_factory.create()),
                    });
                    registry
                        .jobs
                        .insert(prioritized_job.job_id.clone(), entry.clone());
                    entry
                }
            }
        };
        entry.queue.enqueue(buckets);
    }

    /// Offer work to a polling worker.
    ///
    /// A repeated request is answered with its previous assignment no
    /// matter which job owns it; otherwise jobs are tried in descending
    /// priority, ties broken by creation order, and the first queue with an
    /// assignment for this worker wins. When every queue declines, the
    /// smallest suggested backoff is returned so the worker re-polls as
    /// soon as any job could have work.
    pub fn dequeue_bucket(&self, request_id: &RequestId, worker_id: &WorkerId) -> DequeueResult {
        let entries = self.entries_by_scheduling_order();

        for entry in &entries {
            if let Some(existing) = entry.queue.previously_dequeued_bucket(request_id, worker_id) {
                return DequeueResult::Dequeued(existing);
            }
        }

        let mut min_check_after_ms = self.check_again_interval_ms;

        for entry in entries {
            match entry.queue.dequeue_bucket(request_id, worker_id) {
                DequeueResult::Dequeued(dequeued) => {
                    return DequeueResult::Dequeued(dequeued);
                }
                DequeueResult::CheckAgainLater { check_after_ms } => {
                    min_check_after_ms = min_check_after_ms.min(check_after_ms);
                }
            }
        }

        DequeueResult::CheckAgainLater {
            check_after_ms: min_check_after_ms,
        }
    }

    /// Route a reported result to the job queue holding a matching
    /// outstanding assignment.
    pub fn accept(
        &self,
        bucket_result: &BucketResult,
        request_id: &RequestId,
        worker_id: &WorkerId,
    ) -> crate::domain::error::Result<AcceptResult> {
        let bucket_id = bucket_result.bucket_id();

        for entry in self.entries_by_scheduling_order() {
            if !entry.queue.owns_outstanding_bucket(bucket_id) {
                continue;
            }
            match entry.queue.accept(bucket_result, request_id, worker_id) {
                Ok(accept_result) => return Ok(accept_result),
                // The same bucket id may be outstanding in another job's
                // queue under a different assignment; keep scanning.
                Err(DomainError::AssignmentMismatch { .. }) => continue,
                Err(other) => return Err(other),
            }
        }

        Err(DomainError::AssignmentMismatch {
            bucket_id: bucket_id.clone(),
            worker_id: worker_id.clone(),
            request_id: request_id.clone(),
        })
    }

    pub fn state(&self, job_id: &JobId) -> crate::domain::error::Result<JobState> {
        let queue = self.queue_for_job(job_id)?;
        Ok(JobState::new(job_id.clone(), queue.state()))
    }

    pub fn results(&self, job_id: &JobId) -> crate::domain::error::Result<JobResults> {
        let queue = self.queue_for_job(job_id)?;
        Ok(JobResults::new(job_id.clone(), queue.results()))
    }

    /// Drop the job's queue, enqueued and outstanding state included.
    pub fn delete(&self, job_id: &JobId) -> crate::domain::error::Result<()> {
        let mut registry = self.registry.lock().unwrap();
        match registry.jobs.remove(job_id) {
            Some(_) => {
                info!(job_id = %job_id, "Deleted job");
                Ok(())
            }
            None => Err(DomainError::JobNotFound(job_id.clone())),
        }
    }

    /// Sweep every job queue for stuck assignments and concatenate the
    /// reports, higher-priority jobs first.
    pub fn reenqueue_stuck_buckets(&self) -> Vec<StuckBucket> {
        self.entries_by_scheduling_order()
            .into_iter()
            .flat_map(|entry| entry.queue.reenqueue_stuck_buckets())
            .collect()
    }

    /// Job ids with a live queue, in scheduling order
    pub fn ongoing_job_ids(&self) -> Vec<JobId> {
        self.entries_by_scheduling_order()
            .into_iter()
            .map(|entry| entry.job.job_id.clone())
            .collect()
    }

    fn queue_for_job(&self, job_id: &JobId) -> crate::domain::error::Result<Arc<BucketQueue>> {
        let registry = self.registry.lock().unwrap();
        registry
            .jobs
            .get(job_id)
            .map(|entry| entry.queue.clone())
            .ok_or_else(|| DomainError::JobNotFound(job_id.clone()))
    }

    /// Snapshot of job entries sorted by descending priority, then by
    /// ascending creation order. Taken under the registry lock; iteration
    /// happens without it.
    fn entries_by_scheduling_order(&self) -> Vec<Arc<JobEntry>> {
        let registry = self.registry.lock().unwrap();
        let mut entries: Vec<Arc<JobEntry>> = registry.jobs.values().cloned().collect();
        entries.sort_by_key(|entry| (Reverse(entry.job.priority), entry.created_order));
        entries
    }
}
