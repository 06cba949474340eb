//! pdfq-producer: Command-line tool that publishes one PDF extraction job.
//!
//! The job carries a single file; its id is also the message key.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use pdfq_core::{build_job, Job, MessageSink, Result};
use pdfq_queue::{BrokerConfig, KafkaPublisher};

#[derive(Parser)]
#[command(name = "pdfq-producer")]
#[command(author, version, about = "Publish a PDF text-extraction job")]
struct Cli {
    /// PDF file to extract
    path: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(job) => {
            println!("Published job {} ({} file)", job.id, job.file_count());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Job> {
    let job = build_job(&cli.path)?;
    let config = BrokerConfig::from_env();
    publish(&KafkaPublisher::connect(&config).await?, &job).await?;
    info!(
        subsystem = "producer",
        job_id = %job.id,
        topic = %config.topic,
        "Job published"
    );
    Ok(job)
}

/// Publish `job` keyed by its id.
async fn publish<S: MessageSink + ?Sized>(sink: &S, job: &Job) -> Result<()> {
    sink.publish(&job.id, &job.encode()).await
}
