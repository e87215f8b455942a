// Per-Job Bucket Queue
// Owns the enqueued/outstanding/result state for a single job. All
// operations take the queue's single lock, so dequeue, accept, enqueue and
// the stuck sweep are mutually exclusive for that job.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::domain::{
    AcceptResult, AlivenessStatus, Bucket, BucketId, BucketResult, DequeueResult, DequeuedBucket,
    DomainError, EnqueuedBucket, QueueState, RequestId, StuckBucket, StuckBucketReason,
    TestEntryResult, TestingResult, WorkerId,
};
use crate::port::{IdProvider, TestHistoryTracker, TimeProvider, WorkerAlivenessProvider};

struct Inner {
    enqueued: VecDeque<EnqueuedBucket>,
    // Keyed by the queue-assigned unique identifier, not bucket id: the same
    // bucket may be enqueued twice into one queue.
    dequeued: HashMap<String, DequeuedBucket>,
    results: Vec<TestingResult>,
}

/// FIFO queue of buckets for one job, with idempotent dequeue, validated
/// result acceptance, automatic retry re-enqueue, and stuck-bucket
/// recovery.
pub struct BucketQueue {
    inner: Mutex<Inner>,
    worker_aliveness: Arc<dyn WorkerAlivenessProvider>,
    test_history: Arc<dyn TestHistoryTracker>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    check_again_interval_ms: u64,
}

impl BucketQueue {
    pub fn new(
        worker_aliveness: Arc<dyn WorkerAlivenessProvider>,
        test_history: Arc<dyn TestHistoryTracker>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        check_again_interval_ms: u64,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                enqueued: VecDeque::new(),
                dequeued: HashMap::new(),
                results: Vec::new(),
            }),
            worker_aliveness,
            test_history,
            time_provider,
            id_provider,
            check_again_interval_ms,
        }
    }

    /// Append buckets to the back of the queue. Outstanding assignments are
    /// unaffected. Never fails.
    pub fn enqueue(&self, buckets: Vec<Bucket>) {
        let now = self.time_provider.now_millis();
        let mut inner = self.inner.lock().unwrap();

        for bucket in buckets {
            let unique_identifier = self.id_provider.generate_id();
            debug!(
                bucket_id = %bucket.bucket_id,
                unique_identifier = %unique_identifier,
                "Enqueueing bucket"
            );
            inner
                .enqueued
                .push_back(EnqueuedBucket::new(bucket, now, unique_identifier));
        }
    }

    /// The outstanding assignment previously handed out for this exact
    /// (worker id, request id) pair, if any. Lets a worker whose response
    /// got lost on the wire retry without double-allocating work.
    pub fn previously_dequeued_bucket(
        &self,
        request_id: &RequestId,
        worker_id: &WorkerId,
    ) -> Option<DequeuedBucket> {
        self.inner
            .lock()
            .unwrap()
            .dequeued
            .values()
            .find(|d| &d.worker_id == worker_id && &d.request_id == request_id)
            .cloned()
    }

    /// Hand out the next bucket to a polling worker.
    ///
    /// A repeated poll with the same (worker id, request id) pair returns
    /// the previously handed-out assignment unchanged.
    pub fn dequeue_bucket(&self, request_id: &RequestId, worker_id: &WorkerId) -> DequeueResult {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner
            .dequeued
            .values()
            .find(|d| &d.worker_id == worker_id && &d.request_id == request_id)
        {
            debug!(
                worker_id = %worker_id,
                request_id = %request_id,
                bucket_id = %existing.enqueued_bucket.bucket.bucket_id,
                "Returning previously dequeued bucket for repeated request"
            );
            return DequeueResult::Dequeued(existing.clone());
        }

        let aliveness = self.worker_aliveness.aliveness_for_worker(worker_id);
        if !aliveness.is_alive() {
            debug!(
                worker_id = %worker_id,
                status = %aliveness.status,
                "Not handing work to worker that is not alive"
            );
            return DequeueResult::CheckAgainLater {
                check_after_ms: self.check_again_interval_ms,
            };
        }

        match inner.enqueued.pop_front() {
            None => DequeueResult::CheckAgainLater {
                check_after_ms: self.check_again_interval_ms,
            },
            Some(enqueued_bucket) => {
                let dequeued = DequeuedBucket::new(enqueued_bucket, worker_id, request_id);
                info!(
                    bucket_id = %dequeued.enqueued_bucket.bucket.bucket_id,
                    worker_id = %worker_id,
                    request_id = %request_id,
                    "Dequeued bucket"
                );
                inner.dequeued.insert(
                    dequeued.enqueued_bucket.unique_identifier.clone(),
                    dequeued.clone(),
                );
                DequeueResult::Dequeued(dequeued)
            }
        }
    }

    /// Accept a result for an outstanding assignment.
    ///
    /// The result must reference a bucket currently dequeued by exactly the
    /// given worker under exactly the given request id; anything else fails
    /// without touching queue state. On acceptance, failed entries the
    /// retry policy wants re-run are wrapped into fresh single-entry
    /// buckets and appended to the queue.
    pub fn accept(
        &self,
        bucket_result: &BucketResult,
        request_id: &RequestId,
        worker_id: &WorkerId,
    ) -> crate::domain::error::Result<AcceptResult> {
        let bucket_id = bucket_result.bucket_id().clone();
        let mut inner = self.inner.lock().unwrap();

        let matching_key = inner
            .dequeued
            .iter()
            .find(|(_, d)| {
                d.enqueued_bucket.bucket.bucket_id == bucket_id
                    && &d.worker_id == worker_id
                    && &d.request_id == request_id
            })
            .map(|(key, _)| key.clone());

        let key = matching_key.ok_or_else(|| {
            warn!(
                bucket_id = %bucket_id,
                worker_id = %worker_id,
                request_id = %request_id,
                "Rejecting result that matches no outstanding assignment"
            );
            DomainError::AssignmentMismatch {
                bucket_id: bucket_id.clone(),
                worker_id: worker_id.clone(),
                request_id: request_id.clone(),
            }
        })?;

        let dequeued = inner.dequeued.remove(&key).unwrap();
        let source_bucket = &dequeued.enqueued_bucket.bucket;

        // An infrastructure failure yields a lost result for every entry in
        // the bucket; retries are then decided the same way as for a
        // reported testing result.
        let recorded_result = match bucket_result {
            BucketResult::Testing(testing_result) => testing_result.clone(),
            BucketResult::InfrastructureFailure { reason, .. } => {
                warn!(
                    bucket_id = %bucket_id,
                    worker_id = %worker_id,
                    reason = %reason,
                    "Bucket failed before testing started; recording lost results"
                );
                TestingResult::new(
                    bucket_id.clone(),
                    source_bucket
                        .test_entries
                        .iter()
                        .cloned()
                        .map(TestEntryResult::lost)
                        .collect(),
                )
            }
        };

        let entries_to_retry = self.entries_to_retry(&inner, &recorded_result, source_bucket);

        let reenqueued_buckets: Vec<Bucket> = entries_to_retry
            .into_iter()
            .map(|test_entry| {
                Bucket::new(
                    self.id_provider.generate_id(),
                    vec![test_entry],
                    source_bucket.target.clone(),
                    source_bucket.behavior.clone(),
                )
            })
            .collect();

        let now = self.time_provider.now_millis();
        for bucket in &reenqueued_buckets {
            let unique_identifier = self.id_provider.generate_id();
            inner
                .enqueued
                .push_back(EnqueuedBucket::new(bucket.clone(), now, unique_identifier));
        }

        inner.results.push(recorded_result);

        info!(
            bucket_id = %bucket_id,
            worker_id = %worker_id,
            request_id = %request_id,
            retries = reenqueued_buckets.len(),
            "Accepted bucket result"
        );

        Ok(AcceptResult {
            accepted_result: bucket_result.clone(),
            reenqueued_buckets,
        })
    }

    fn entries_to_retry(
        &self,
        inner: &Inner,
        recorded_result: &TestingResult,
        source_bucket: &Bucket,
    ) -> Vec<crate::domain::TestEntry> {
        recorded_result
            .failed_results()
            .into_iter()
            .filter(|failed_result| {
                let history: Vec<TestEntryResult> = inner
                    .results
                    .iter()
                    .flat_map(|r| r.unfiltered_results.iter())
                    .filter(|prior| prior.test_entry == failed_result.test_entry)
                    .cloned()
                    .collect();
                self.test_history.should_retry(
                    &failed_result.test_entry,
                    failed_result,
                    &history,
                    &source_bucket.behavior,
                )
            })
            .map(|failed_result| failed_result.test_entry.clone())
            .collect()
    }

    /// Move assignments whose worker can no longer be trusted back into the
    /// queue. The sole recovery path for work lost to worker crashes,
    /// network partitions, or unreported failures; driven by an external
    /// periodic caller.
    ///
    /// Recovered buckets go to the back of the queue, behind work that
    /// never left it.
    pub fn reenqueue_stuck_buckets(&self) -> Vec<StuckBucket> {
        let mut inner = self.inner.lock().unwrap();

        let mut stuck: Vec<(String, StuckBucketReason)> = inner
            .dequeued
            .iter()
            .filter_map(|(key, dequeued)| {
                let aliveness = self
                    .worker_aliveness
                    .aliveness_for_worker(&dequeued.worker_id);
                let bucket_id = &dequeued.enqueued_bucket.bucket.bucket_id;
                let reason = match aliveness.status {
                    AlivenessStatus::Silent => Some(StuckBucketReason::WorkerSilent),
                    AlivenessStatus::Alive => {
                        if aliveness.bucket_ids_being_processed.contains(bucket_id) {
                            None
                        } else {
                            Some(StuckBucketReason::BucketLost)
                        }
                    }
                    // Blocked or unregistered workers will not finish the
                    // assignment either way.
                    AlivenessStatus::Blocked | AlivenessStatus::NotRegistered => {
                        Some(StuckBucketReason::BucketLost)
                    }
                };
                reason.map(|reason| (key.clone(), reason))
            })
            .collect();

        // Deterministic recovery order: oldest assignment first.
        stuck.sort_by_key(|(key, _)| {
            let dequeued = &inner.dequeued[key];
            (
                dequeued.enqueued_bucket.enqueue_timestamp,
                dequeued.enqueued_bucket.unique_identifier.clone(),
            )
        });

        let mut stuck_buckets = Vec::with_capacity(stuck.len());
        for (key, reason) in stuck {
            let dequeued = inner.dequeued.remove(&key).unwrap();
            warn!(
                bucket_id = %dequeued.enqueued_bucket.bucket.bucket_id,
                worker_id = %dequeued.worker_id,
                reason = %reason,
                "Reenqueueing stuck bucket"
            );
            inner.enqueued.push_back(dequeued.enqueued_bucket.clone());
            stuck_buckets.push(StuckBucket::new(reason, dequeued));
        }

        stuck_buckets
    }

    /// Counter snapshot
    pub fn state(&self) -> QueueState {
        let inner = self.inner.lock().unwrap();
        QueueState::new(inner.enqueued.len(), inner.dequeued.len())
    }

    /// Accepted results so far, in acceptance order
    pub fn results(&self) -> Vec<TestingResult> {
        self.inner.lock().unwrap().results.clone()
    }

    /// Whether this queue currently holds an outstanding assignment for the
    /// bucket id, regardless of worker or request. Used by the balancing
    /// layer to route result acceptance.
    pub fn owns_outstanding_bucket(&self, bucket_id: &BucketId) -> bool {
        self.inner
            .lock()
            .unwrap()
            .dequeued
            .values()
            .any(|d| &d.enqueued_bucket.bucket.bucket_id == bucket_id)
    }
}

/// Creates per-job queues sharing one set of injected dependencies. The
/// balancing queue uses this to spin up a queue lazily on the first enqueue
/// for a job.
pub struct BucketQueueFactory {
    worker_aliveness: Arc<dyn WorkerAlivenessProvider>,
    test_history: Arc<dyn TestHistoryTracker>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
    check_again_interval_ms: u64,
}

impl BucketQueueFactory {
    pub fn new(
        worker_aliveness: Arc<dyn WorkerAlivenessProvider>,
        test_history: Arc<dyn TestHistoryTracker>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        check_again_interval_ms: u64,
    ) -> Self {
        Self {
            worker_aliveness,
            test_history,
            time_provider,
            id_provider,
            check_again_interval_ms,
        }
    }

    pub fn create(&self) -> BucketQueue {
        BucketQueue::new(
            self.worker_aliveness.clone(),
            self.test_history.clone(),
            self.time_provider.clone(),
            self.id_provider.clone(),
            self.check_again_interval_ms,
        )
    }
}
