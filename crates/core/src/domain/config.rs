// Queue Server Configuration

use serde::{Deserialize, Serialize};

/// Tunables for the queue server and its recovery machinery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueServerConfiguration {
    /// Backoff suggested to a worker when no work is available (ms)
    pub check_again_interval_ms: u64,

    /// A worker whose last heartbeat is older than this reads as SILENT (ms)
    pub worker_silence_threshold_ms: i64,

    /// How often the stuck-bucket sweep runs (ms)
    pub stuck_sweep_interval_ms: u64,
}

impl Default for QueueServerConfiguration {
    fn default() -> Self {
        Self {
            check_again_interval_ms: 30_000,       // Poll every 30s when idle
            worker_silence_threshold_ms: 300_000,  // 5 minutes without heartbeat
            stuck_sweep_interval_ms: 60_000,       // Sweep once a minute
        }
    }
}
