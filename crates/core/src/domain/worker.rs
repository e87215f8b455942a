// Worker Domain Model

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::bucket::BucketId;

/// Worker ID (opaque, assigned at worker registration)
pub type WorkerId = String;

/// Health status of a worker as seen by the aliveness tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlivenessStatus {
    NotRegistered,
    Alive,
    Silent,
    Blocked,
}

impl std::fmt::Display for AlivenessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlivenessStatus::NotRegistered => write!(f, "NOT_REGISTERED"),
            AlivenessStatus::Alive => write!(f, "ALIVE"),
            AlivenessStatus::Silent => write!(f, "SILENT"),
            AlivenessStatus::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// A worker's health plus the set of bucket ids it last reported as being
/// processed. The queue reads this; only the registration/heartbeat side
/// writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAliveness {
    pub status: AlivenessStatus,
    pub bucket_ids_being_processed: HashSet<BucketId>,
}

impl WorkerAliveness {
    pub fn new(status: AlivenessStatus, bucket_ids_being_processed: HashSet<BucketId>) -> Self {
        Self {
            status,
            bucket_ids_being_processed,
        }
    }

    pub fn not_registered() -> Self {
        Self {
            status: AlivenessStatus::NotRegistered,
            bucket_ids_being_processed: HashSet::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == AlivenessStatus::Alive
    }
}
