// Stuck-Bucket Sweeper
// The periodic caller of reenqueue_stuck_buckets. The queue itself never
// runs timers; this loop is the sole driver of stuck-work recovery.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use super::balancing_queue::BalancingBucketQueue;
use super::shutdown::ShutdownToken;

/// Periodically sweeps every job queue for stuck assignments.
///
/// Should be spawned in tokio::spawn; terminates when the shutdown token
/// fires.
pub struct StuckBucketSweeper {
    balancing_queue: Arc<BalancingBucketQueue>,
    sweep_interval_ms: u64,
}

impl StuckBucketSweeper {
    pub fn new(balancing_queue: Arc<BalancingBucketQueue>, sweep_interval_ms: u64) -> Self {
        Self {
            balancing_queue,
            sweep_interval_ms,
        }
    }

    /// Run the sweep loop until shutdown
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            sweep_interval_ms = self.sweep_interval_ms,
            "Stuck-bucket sweeper started"
        );

        let mut tick = interval(Duration::from_millis(self.sweep_interval_ms));
        // The first tick fires immediately; skip it so a freshly started
        // server does not sweep before workers had a chance to heartbeat.
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.wait() => {
                    info!("Stuck-bucket sweeper shutting down");
                    break;
                }
            }
        }
    }

    /// One sweep pass. Public so operators can trigger recovery manually.
    pub fn sweep_once(&self) {
        let stuck_buckets = self.balancing_queue.reenqueue_stuck_buckets();
        if stuck_buckets.is_empty() {
            return;
        }

        for stuck in &stuck_buckets {
            warn!(
                bucket_id = %stuck.dequeued_bucket.enqueued_bucket.bucket.bucket_id,
                worker_id = %stuck.dequeued_bucket.worker_id,
                reason = %stuck.reason,
                "Recovered stuck bucket"
            );
        }
        info!(count = stuck_buckets.len(), "Stuck-bucket sweep complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::bucket_queue::BucketQueueFactory;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::{
        Bucket, DequeueResult, ExecutionBehavior, PrioritizedJob, Priority, QueueState, TestEntry,
        TestTarget,
    };
    use crate::port::id_provider::fakes::SequentialIdProvider;
    use crate::port::time_provider::fakes::FakeTimeProvider;
    use crate::port::worker_aliveness::fakes::FakeWorkerAlivenessProvider;
    use crate::port::NoRetryTestHistoryTracker;

    fn setup() -> (Arc<BalancingBucketQueue>, Arc<FakeWorkerAlivenessProvider>) {
        let aliveness = Arc::new(FakeWorkerAlivenessProvider::new());
        let factory = BucketQueueFactory::new(
            aliveness.clone(),
            Arc::new(NoRetryTestHistoryTracker),
            Arc::new(FakeTimeProvider::new(1_000)),
            Arc::new(SequentialIdProvider::new("uid")),
            30_000,
        );
        (
            Arc::new(BalancingBucketQueue::new(factory, 30_000)),
            aliveness,
        )
    }

    #[tokio::test]
    async fn sweeper_recovers_lost_bucket_and_stops_on_shutdown() {
        let (queue, aliveness) = setup();
        aliveness.mark_alive("worker");

        let job = PrioritizedJob::new("job", Priority::Medium);
        queue.enqueue(
            vec![Bucket::new(
                "bucket",
                vec![TestEntry::new("ClassName", "testMethod", None)],
                TestTarget::new("iPhone SE", "15.0"),
                ExecutionBehavior::default(),
            )],
            &job,
        );
        let dequeued = queue.dequeue_bucket(&"request".to_string(), &"worker".to_string());
        assert!(matches!(dequeued, DequeueResult::Dequeued(_)));

        let sweeper = StuckBucketSweeper::new(queue.clone(), 10);
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let handle = tokio::spawn(sweeper.run(shutdown_rx));

        // Worker reports an empty in-flight set, so the bucket is lost;
        // wait for a sweep to bring it back.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let state = queue.state(&"job".to_string()).unwrap();
            if state.queue_state == QueueState::new(1, 0) {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "sweep never recovered the bucket"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        shutdown_tx.shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweeper should stop after shutdown")
            .unwrap();
    }
}
