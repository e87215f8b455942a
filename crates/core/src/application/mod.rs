// Application Layer - Queue services

pub mod aliveness;
pub mod balancing_queue;
pub mod bucket_queue;
pub mod queue_server;
pub mod retry;
pub mod shutdown;
pub mod sweeper;

// Re-exports
pub use aliveness::WorkerAlivenessTracker;
pub use balancing_queue::BalancingBucketQueue;
pub use bucket_queue::{BucketQueue, BucketQueueFactory};
pub use queue_server::QueueServer;
pub use retry::AttemptBoundedTestHistoryTracker;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use sweeper::StuckBucketSweeper;
