// Concurrency and Race Condition Tests

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use convoy_core::application::{BalancingBucketQueue, BucketQueueFactory};
use convoy_core::domain::{
    Bucket, DequeueResult, ExecutionBehavior, PrioritizedJob, Priority, QueueState, TestEntry,
    TestTarget,
};
use convoy_core::port::id_provider::fakes::SequentialIdProvider;
use convoy_core::port::time_provider::fakes::FakeTimeProvider;
use convoy_core::port::worker_aliveness::fakes::FakeWorkerAlivenessProvider;
use convoy_core::port::NoRetryTestHistoryTracker;

const CHECK_AGAIN_MS: u64 = 30_000;

fn balancing_queue() -> (Arc<BalancingBucketQueue>, Arc<FakeWorkerAlivenessProvider>) {
    let aliveness = Arc::new(FakeWorkerAlivenessProvider::new());
    let factory = BucketQueueFactory::new(
        aliveness.clone(),
        Arc::new(NoRetryTestHistoryTracker),
        Arc::new(FakeTimeProvider::new(1_000)),
        Arc::new(SequentialIdProvider::new("uid")),
        CHECK_AGAIN_MS,
    );
    (
        Arc::new(BalancingBucketQueue::new(factory, CHECK_AGAIN_MS)),
        aliveness,
    )
}

fn bucket(bucket_id: &str) -> Bucket {
    Bucket::new(
        bucket_id,
        vec![TestEntry::new("ClassName", "testMethod", None)],
        TestTarget::new("iPhone SE", "15.0"),
        ExecutionBehavior::default(),
    )
}

#[test]
fn concurrent_dequeues_never_hand_out_the_same_bucket_twice() {
    let (queue, aliveness) = balancing_queue();
    let job = PrioritizedJob::new("job", Priority::Medium);

    const BUCKET_COUNT: usize = 20;
    const POLLER_COUNT: usize = 40;

    let buckets: Vec<Bucket> = (0..BUCKET_COUNT)
        .map(|i| bucket(&format!("bucket-{}", i)))
        .collect();
    queue.enqueue(buckets, &job);

    for i in 0..POLLER_COUNT {
        aliveness.mark_alive(format!("worker-{}", i));
    }

    let mut handles = Vec::new();
    for i in 0..POLLER_COUNT {
        let queue = queue.clone();
        handles.push(thread::spawn(move || {
            queue.dequeue_bucket(&format!("request-{}", i), &format!("worker-{}", i))
        }));
    }

    let mut assigned_unique_ids = Vec::new();
    let mut check_later_count = 0;
    for handle in handles {
        match handle.join().unwrap() {
            DequeueResult::Dequeued(d) => {
                assigned_unique_ids.push(d.enqueued_bucket.unique_identifier)
            }
            DequeueResult::CheckAgainLater { .. } => check_later_count += 1,
        }
    }

    let distinct: HashSet<&String> = assigned_unique_ids.iter().collect();
    assert_eq!(
        distinct.len(),
        assigned_unique_ids.len(),
        "No bucket may be handed to two pollers"
    );
    assert_eq!(assigned_unique_ids.len(), BUCKET_COUNT);
    assert_eq!(check_later_count, POLLER_COUNT - BUCKET_COUNT);
    assert_eq!(
        queue.state(&"job".to_string()).unwrap().queue_state,
        QueueState::new(0, BUCKET_COUNT)
    );
}

#[test]
fn concurrent_identical_requests_all_get_the_same_assignment() {
    let (queue, aliveness) = balancing_queue();
    let job = PrioritizedJob::new("job", Priority::Medium);
    aliveness.mark_alive("worker");

    queue.enqueue(vec![bucket("b1"), bucket("b2")], &job);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let queue = queue.clone();
        handles.push(thread::spawn(move || {
            queue.dequeue_bucket(&"request".to_string(), &"worker".to_string())
        }));
    }

    let results: Vec<DequeueResult> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &results[0];
    assert!(matches!(first, DequeueResult::Dequeued(_)));
    for result in &results {
        assert_eq!(
            result, first,
            "Identical (workerId, requestId) pairs must share one assignment"
        );
    }

    // Exactly one bucket actually left the queue
    assert_eq!(
        queue.state(&"job".to_string()).unwrap().queue_state,
        QueueState::new(1, 1)
    );
}

#[test]
fn concurrent_enqueues_to_unrelated_jobs_all_land() {
    let (queue, _aliveness) = balancing_queue();

    const JOB_COUNT: usize = 8;
    const BUCKETS_PER_JOB: usize = 25;

    let mut handles = Vec::new();
    for j in 0..JOB_COUNT {
        let queue = queue.clone();
        handles.push(thread::spawn(move || {
            let job = PrioritizedJob::new(format!("job-{}", j), Priority::Medium);
            for b in 0..BUCKETS_PER_JOB {
                queue.enqueue(vec![bucket(&format!("job-{}-bucket-{}", j, b))], &job);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for j in 0..JOB_COUNT {
        assert_eq!(
            queue.state(&format!("job-{}", j)).unwrap().queue_state,
            QueueState::new(BUCKETS_PER_JOB, 0)
        );
    }
}

#[test]
fn sweep_racing_with_dequeues_keeps_every_bucket_accounted_for() {
    let (queue, aliveness) = balancing_queue();
    let job = PrioritizedJob::new("job", Priority::Medium);
    aliveness.mark_alive("worker");

    const BUCKET_COUNT: usize = 30;
    let buckets: Vec<Bucket> = (0..BUCKET_COUNT)
        .map(|i| bucket(&format!("bucket-{}", i)))
        .collect();
    queue.enqueue(buckets, &job);

    // Pollers dequeue while sweeps concurrently recover everything the
    // worker never acknowledges in its in-flight set.
    let mut handles = Vec::new();
    for i in 0..10 {
        let queue = queue.clone();
        handles.push(thread::spawn(move || {
            for k in 0..5 {
                let _ = queue.dequeue_bucket(&format!("request-{}-{}", i, k), &"worker".to_string());
            }
        }));
    }
    for _ in 0..4 {
        let queue = queue.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..5 {
                let _ = queue.reenqueue_stuck_buckets();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Every bucket is still either enqueued or dequeued, never both or lost
    let state = queue.state(&"job".to_string()).unwrap().queue_state;
    assert_eq!(
        state.enqueued_bucket_count + state.dequeued_bucket_count,
        BUCKET_COUNT
    );
}
