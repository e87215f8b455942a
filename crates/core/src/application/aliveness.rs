// Worker Aliveness Tracker
// Process-wide record of worker health and believed in-flight buckets.
// Written by the registration/heartbeat subsystem, read by the queue layer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::domain::{AlivenessStatus, BucketId, WorkerAliveness, WorkerId};
use crate::port::{TimeProvider, WorkerAlivenessProvider};

struct WorkerRecord {
    last_heartbeat: i64,
    blocked: bool,
    bucket_ids_being_processed: HashSet<BucketId>,
}

/// Tracks each registered worker's health and the bucket ids it last
/// reported as being processed.
///
/// Silence is computed at read time: a registered, unblocked worker whose
/// last heartbeat is older than the silence threshold reads as SILENT. No
/// timer runs inside the tracker.
pub struct WorkerAlivenessTracker {
    workers: Mutex<HashMap<WorkerId, WorkerRecord>>,
    silence_threshold_ms: i64,
    time_provider: Arc<dyn TimeProvider>,
}

impl WorkerAlivenessTracker {
    pub fn new(silence_threshold_ms: i64, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            silence_threshold_ms,
            time_provider,
        }
    }

    /// Register a worker, or refresh it if it re-registers after a restart.
    /// Registration clears any previous in-flight set.
    pub fn register_worker(&self, worker_id: impl Into<String>) {
        let worker_id = worker_id.into();
        let now = self.time_provider.now_millis();
        let mut workers = self.workers.lock().unwrap();

        let previous = workers.insert(
            worker_id.clone(),
            WorkerRecord {
                last_heartbeat: now,
                blocked: false,
                bucket_ids_being_processed: HashSet::new(),
            },
        );

        if previous.is_some() {
            info!(worker_id = %worker_id, "Worker re-registered");
        } else {
            info!(worker_id = %worker_id, "Worker registered");
        }
    }

    /// Record a heartbeat: refreshes the worker's last-seen time and
    /// replaces its believed in-flight bucket-id set.
    ///
    /// Heartbeats from unknown workers are dropped; workers must register
    /// first.
    pub fn heartbeat(
        &self,
        worker_id: &WorkerId,
        bucket_ids_being_processed: HashSet<BucketId>,
    ) {
        let now = self.time_provider.now_millis();
        let mut workers = self.workers.lock().unwrap();

        match workers.get_mut(worker_id) {
            Some(record) => {
                record.last_heartbeat = now;
                record.bucket_ids_being_processed = bucket_ids_being_processed;
                debug!(
                    worker_id = %worker_id,
                    in_flight = record.bucket_ids_being_processed.len(),
                    "Worker heartbeat"
                );
            }
            None => {
                warn!(worker_id = %worker_id, "Dropping heartbeat from unregistered worker");
            }
        }
    }

    /// Stop handing work to a worker until it is unblocked
    pub fn block_worker(&self, worker_id: &WorkerId) {
        let mut workers = self.workers.lock().unwrap();
        if let Some(record) = workers.get_mut(worker_id) {
            record.blocked = true;
            info!(worker_id = %worker_id, "Worker blocked");
        } else {
            warn!(worker_id = %worker_id, "Cannot block unregistered worker");
        }
    }

    pub fn unblock_worker(&self, worker_id: &WorkerId) {
        let mut workers = self.workers.lock().unwrap();
        if let Some(record) = workers.get_mut(worker_id) {
            record.blocked = false;
            // Blocked workers keep heartbeating, so last_heartbeat is fresh
            info!(worker_id = %worker_id, "Worker unblocked");
        }
    }

    /// Worker ids currently registered, in no particular order
    pub fn registered_worker_ids(&self) -> Vec<WorkerId> {
        self.workers.lock().unwrap().keys().cloned().collect()
    }
}

impl WorkerAlivenessProvider for WorkerAlivenessTracker {
    fn aliveness_for_worker(&self, worker_id: &WorkerId) -> WorkerAliveness {
        let now = self.time_provider.now_millis();
        let workers = self.workers.lock().unwrap();

        match workers.get(worker_id) {
            None => WorkerAliveness::not_registered(),
            Some(record) => {
                let status = if record.blocked {
                    AlivenessStatus::Blocked
                } else if now - record.last_heartbeat > self.silence_threshold_ms {
                    AlivenessStatus::Silent
                } else {
                    AlivenessStatus::Alive
                };
                WorkerAliveness::new(status, record.bucket_ids_being_processed.clone())
            }
        }
    }
}
