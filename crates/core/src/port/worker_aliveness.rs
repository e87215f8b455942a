// Worker Aliveness Port
// Read oracle consumed by the queue layer. The registration/heartbeat
// subsystem owns the writes; no queue operation mutates aliveness.

use crate::domain::{WorkerAliveness, WorkerId};

/// Read-only view of worker health
pub trait WorkerAlivenessProvider: Send + Sync {
    /// Current aliveness for a worker; unknown workers read as NOT_REGISTERED
    fn aliveness_for_worker(&self, worker_id: &WorkerId) -> WorkerAliveness;
}

pub mod fakes {
    use super::*;
    use crate::domain::{AlivenessStatus, BucketId};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Settable aliveness map for tests
    pub struct FakeWorkerAlivenessProvider {
        workers: Mutex<HashMap<WorkerId, WorkerAliveness>>,
    }

    impl FakeWorkerAlivenessProvider {
        pub fn new() -> Self {
            Self {
                workers: Mutex::new(HashMap::new()),
            }
        }

        pub fn set_aliveness(&self, worker_id: impl Into<String>, aliveness: WorkerAliveness) {
            self.workers
                .lock()
                .unwrap()
                .insert(worker_id.into(), aliveness);
        }

        /// Shorthand: mark a worker alive with an empty in-flight set
        pub fn mark_alive(&self, worker_id: impl Into<String>) {
            self.set_aliveness(
                worker_id,
                WorkerAliveness::new(AlivenessStatus::Alive, HashSet::new()),
            );
        }

        /// Shorthand: mark a worker alive with the given in-flight bucket ids
        pub fn mark_alive_processing(
            &self,
            worker_id: impl Into<String>,
            bucket_ids: impl IntoIterator<Item = BucketId>,
        ) {
            self.set_aliveness(
                worker_id,
                WorkerAliveness::new(AlivenessStatus::Alive, bucket_ids.into_iter().collect()),
            );
        }
    }

    impl Default for FakeWorkerAlivenessProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WorkerAlivenessProvider for FakeWorkerAlivenessProvider {
        fn aliveness_for_worker(&self, worker_id: &WorkerId) -> WorkerAliveness {
            self.workers
                .lock()
                .unwrap()
                .get(worker_id)
                .cloned()
                .unwrap_or_else(WorkerAliveness::not_registered)
        }
    }
}
