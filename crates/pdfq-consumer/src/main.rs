//! pdfq-consumer: pulls PDF jobs from Kafka and extracts their text.
//!
//! Runs until SIGINT or SIGTERM, then stops pulling, waits for in-flight
//! extractions, and releases the queue before the extractor.

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfq_core::TextExtractor;
use pdfq_jobs::{build_extractor, run_consumer, ExtractionConfig, Orchestrator, PullBackoff};
use pdfq_queue::{BrokerConfig, KafkaSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _file_guard = init_tracing();

    let broker = BrokerConfig::from_env();
    let extraction = ExtractionConfig::from_env().context("invalid extraction configuration")?;
    let backoff = PullBackoff::from_env();

    info!(
        subsystem = "consumer",
        brokers = ?broker.brokers,
        topic = %broker.topic,
        partitions = broker.partitions,
        start_from = ?broker.start_from,
        group_id = %broker.group_id,
        offset_dir = %broker.offset_dir.display(),
        extractor = ?extraction.backend,
        max_concurrent = extraction.max_concurrent,
        "Starting pdfq consumer"
    );

    let extractor = build_extractor(&extraction);
    match extractor.health_check().await {
        Ok(true) => info!(extractor = extractor.name(), "Extractor available"),
        Ok(false) => warn!(
            extractor = extractor.name(),
            "Extractor unavailable, files will fail until it recovers"
        ),
        Err(e) => warn!(extractor = extractor.name(), error = %e, "Extractor health check failed"),
    }

    let orchestrator = Orchestrator::new(extractor.clone(), &extraction);
    let source = KafkaSource::connect(&broker)
        .await
        .context("failed to connect to Kafka")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    // Drains before the source is dropped.
    run_consumer(source, &orchestrator, cancel, backoff).await?;

    drop(orchestrator);
    drop(extractor);
    info!(subsystem = "consumer", "Shutdown complete");
    Ok(())
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "info")
fn init_tracing() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,pdfq_jobs=info,pdfq_queue=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("pdfq-consumer.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

/// Cancel `cancel` on the first SIGINT or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(signal = "SIGINT", "Shutdown requested"),
        _ = terminate => info!(signal = "SIGTERM", "Shutdown requested"),
    }
    cancel.cancel();
}
