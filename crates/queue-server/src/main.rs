//! Convoy Queue Server - Main Entry Point
//!
//! Wires the bucket queue, aliveness tracker, and stuck-bucket sweeper
//! together and runs until SIGINT. The REST endpoint layer mounts on the
//! QueueServer handle assembled here.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use convoy_core::application::{
    shutdown_channel, AttemptBoundedTestHistoryTracker, BalancingBucketQueue, BucketQueueFactory,
    QueueServer, StuckBucketSweeper, WorkerAlivenessTracker,
};
use convoy_core::domain::QueueServerConfiguration;
use convoy_core::port::{SystemTimeProvider, UuidProvider};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn load_configuration() -> QueueServerConfiguration {
    let defaults = QueueServerConfiguration::default();
    QueueServerConfiguration {
        check_again_interval_ms: env_parsed("CONVOY_CHECK_AGAIN_INTERVAL_MS")
            .unwrap_or(defaults.check_again_interval_ms),
        worker_silence_threshold_ms: env_parsed("CONVOY_WORKER_SILENCE_THRESHOLD_MS")
            .unwrap_or(defaults.worker_silence_threshold_ms),
        stuck_sweep_interval_ms: env_parsed("CONVOY_STUCK_SWEEP_INTERVAL_MS")
            .unwrap_or(defaults.stuck_sweep_interval_ms),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let log_format = std::env::var("CONVOY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("convoy_core=info,convoy_queue_server=info"))
        .expect("Failed to create env filter");

    // Optional file logging next to stdout
    let log_dir = std::env::var("CONVOY_LOG_DIR")
        .ok()
        .map(|dir| shellexpand::tilde(&dir).into_owned());

    match log_format.as_str() {
        "json" => {
            let file_layer = log_dir.map(|dir| {
                let appender = tracing_appender::rolling::daily(dir, "convoy-queue-server.log");
                fmt::layer().with_writer(appender).with_ansi(false)
            });
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .with(file_layer)
                .init();
        }
        _ => {
            let file_layer = log_dir.map(|dir| {
                let appender = tracing_appender::rolling::daily(dir, "convoy-queue-server.log");
                fmt::layer().with_writer(appender).with_ansi(false)
            });
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .with(file_layer)
                .init();
        }
    }

    info!("Convoy Queue Server v{} starting...", VERSION);

    // 2. Load configuration
    let configuration = load_configuration();
    info!(
        check_again_interval_ms = configuration.check_again_interval_ms,
        worker_silence_threshold_ms = configuration.worker_silence_threshold_ms,
        stuck_sweep_interval_ms = configuration.stuck_sweep_interval_ms,
        "Configuration loaded"
    );

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);

    let aliveness_tracker = Arc::new(WorkerAlivenessTracker::new(
        configuration.worker_silence_threshold_ms,
        time_provider.clone(),
    ));

    let bucket_queue_factory = BucketQueueFactory::new(
        aliveness_tracker.clone(),
        Arc::new(AttemptBoundedTestHistoryTracker::new()),
        time_provider.clone(),
        id_provider,
        configuration.check_again_interval_ms,
    );

    let balancing_queue = Arc::new(BalancingBucketQueue::new(
        bucket_queue_factory,
        configuration.check_again_interval_ms,
    ));

    let queue_server = Arc::new(QueueServer::new(
        balancing_queue.clone(),
        aliveness_tracker.clone(),
    ));

    // 4. Start the stuck-bucket sweeper
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let sweeper = StuckBucketSweeper::new(
        balancing_queue.clone(),
        configuration.stuck_sweep_interval_ms,
    );
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    // The endpoint layer (external) mounts here and drives queue_server.
    info!(
        ongoing_jobs = queue_server.ongoing_job_ids().len(),
        "Queue server ready; waiting for SIGINT"
    );

    // 5. Run until SIGINT, then drain background loops
    tokio::signal::ctrl_c().await?;
    info!("SIGINT received, shutting down...");

    shutdown_tx.shutdown();
    sweeper_handle.await?;

    info!("Convoy Queue Server stopped");
    Ok(())
}
