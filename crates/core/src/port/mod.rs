// Port Layer - Interfaces for injected capabilities

pub mod id_provider; // For deterministic testing
pub mod test_history;
pub mod time_provider;
pub mod worker_aliveness;

// Re-exports
pub use id_provider::{IdProvider, UuidProvider};
pub use test_history::{NoRetryTestHistoryTracker, TestHistoryTracker};
pub use time_provider::{SystemTimeProvider, TimeProvider};
pub use worker_aliveness::WorkerAlivenessProvider;
