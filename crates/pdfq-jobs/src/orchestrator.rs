//! Extraction orchestrator: fans each job out into per-file tasks.
//!
//! Every file of an accepted job becomes its own task on a shared
//! [`TaskTracker`]. A task waits for a permit from the shared [`Semaphore`],
//! so no more than `capacity` extraction calls run at once across all jobs.
//! Tasks always run to completion; [`Orchestrator::drain`] waits for them.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use backon::Retryable;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use pdfq_core::{
    Error, ExtractedText, FileDescriptor, FileOutcome, Job, Result, ResultSink, TextExtractor,
};

use crate::config::{ExtractionConfig, RetryPolicy};
use crate::sink::LogSink;

/// State shared by every extraction task.
struct TaskContext {
    extractor: Arc<dyn TextExtractor>,
    sink: Arc<dyn ResultSink>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
    retry: RetryPolicy,
}

impl TaskContext {
    /// One extraction call, holding a permit for its duration.
    ///
    /// A panicking extractor is reported as [`Error::Extraction`].
    async fn extract_once(&self, path: &Path) -> Result<String> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Internal("extraction permit pool closed".to_string()))?;
        trace!(
            subsystem = "jobs",
            component = "orchestrator",
            file_path = %path.display(),
            available = self.permits.available_permits(),
            "Permit acquired"
        );

        let call = AssertUnwindSafe(self.extractor.extract(path))
            .catch_unwind()
            .map(|caught| {
                caught.unwrap_or_else(|payload| {
                    Err(Error::Extraction(format!(
                        "{} panicked: {}",
                        self.extractor.name(),
                        panic_message(payload.as_ref())
                    )))
                })
            });

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| {
                    Error::Extraction(format!(
                        "{} timed out after {}s",
                        self.extractor.name(),
                        limit.as_secs_f32()
                    ))
                })?,
            None => call.await,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

async fn run_task(ctx: Arc<TaskContext>, job_id: String, file: FileDescriptor) {
    let start = Instant::now();
    let attempts = AtomicU32::new(0);
    let path = Path::new(&file.path);

    let result = (|| async {
        attempts.fetch_add(1, Ordering::Relaxed);
        ctx.extract_once(path).await
    })
    .retry(ctx.retry.backoff())
    .when(Error::is_retryable)
    .notify(|err, dur| {
        warn!(
            subsystem = "jobs",
            component = "orchestrator",
            op = "extract",
            job_id = %job_id,
            file_name = %file.name,
            error = %err,
            retry_in_ms = dur.as_millis() as u64,
            "Extraction failed, retrying"
        );
    })
    .await;

    let outcome = FileOutcome {
        job_id,
        result: result.map(ExtractedText::new).map_err(|e| e.to_string()),
        attempts: attempts.load(Ordering::Relaxed),
        duration_ms: start.elapsed().as_millis() as u64,
        file,
    };
    ctx.sink.record(outcome);
}

/// Bounded-concurrency extraction over a stream of jobs.
///
/// Cloning yields another handle to the same permit pool and task set.
#[derive(Clone)]
pub struct Orchestrator {
    ctx: Arc<TaskContext>,
    tracker: TaskTracker,
    capacity: usize,
}

impl Orchestrator {
    /// Create an orchestrator from config, logging outcomes with [`LogSink`].
    pub fn new(extractor: Arc<dyn TextExtractor>, config: &ExtractionConfig) -> Self {
        OrchestratorBuilder::new(extractor).with_config(config).build()
    }

    /// Decode and submit one inbound message.
    ///
    /// Returns the number of tasks spawned. A payload that is not a job
    /// yields [`Error::Decode`]; the message is then considered handled.
    pub fn handle(&self, raw: &[u8]) -> Result<usize> {
        let job = Job::decode(raw).inspect_err(|e| {
            warn!(
                subsystem = "jobs",
                component = "orchestrator",
                op = "handle",
                payload_bytes = raw.len(),
                error = %e,
                "Dropping undecodable message"
            );
        })?;
        self.submit(job)
    }

    /// Spawn one extraction task per file of `job`.
    ///
    /// An invalid job yields [`Error::Validation`] and spawns nothing.
    /// Returns without waiting for any extraction.
    pub fn submit(&self, job: Job) -> Result<usize> {
        if let Err(e) = job.validate() {
            warn!(
                subsystem = "jobs",
                component = "orchestrator",
                op = "handle",
                job_id = %job.id,
                error = %e,
                "Dropping invalid job"
            );
            return Err(e);
        }

        let file_count = job.file_count();
        info!(
            subsystem = "jobs",
            component = "orchestrator",
            op = "handle",
            job_id = %job.id,
            file_count,
            outstanding = self.tracker.len(),
            "Job accepted"
        );

        for file in job.files() {
            debug!(
                subsystem = "jobs",
                component = "orchestrator",
                op = "handle",
                job_id = %job.id,
                file_name = %file.name,
                "Spawning extraction task"
            );
            self.tracker
                .spawn(run_task(self.ctx.clone(), job.id.clone(), file));
        }
        Ok(file_count)
    }

    /// Wait until every spawned task has finished, failed ones included.
    ///
    /// Returns immediately when nothing is outstanding. The orchestrator
    /// keeps accepting work afterwards; tasks spawned while a drain is in
    /// progress are waited for as well.
    pub async fn drain(&self) {
        let outstanding = self.tracker.len();
        if outstanding == 0 {
            debug!(
                subsystem = "jobs",
                component = "orchestrator",
                op = "drain",
                "Nothing to drain"
            );
            return;
        }

        info!(
            subsystem = "jobs",
            component = "orchestrator",
            op = "drain",
            outstanding,
            "Draining extraction tasks"
        );
        let start = Instant::now();
        // Closing only lets `wait` resolve once the set is empty; spawning
        // on a closed tracker still tracks the task.
        self.tracker.close();
        self.tracker.wait().await;
        info!(
            subsystem = "jobs",
            component = "orchestrator",
            op = "drain",
            duration_ms = start.elapsed().as_millis() as u64,
            "Drain complete"
        );
    }

    /// Number of spawned tasks that have not finished.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Permit pool size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by a running extraction.
    pub fn available_permits(&self) -> usize {
        self.ctx.permits.available_permits()
    }

    pub fn extractor_name(&self) -> &str {
        self.ctx.extractor.name()
    }
}

/// Builder for an [`Orchestrator`].
pub struct OrchestratorBuilder {
    extractor: Arc<dyn TextExtractor>,
    sink: Arc<dyn ResultSink>,
    config: ExtractionConfig,
}

impl OrchestratorBuilder {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            sink: Arc::new(LogSink),
            config: ExtractionConfig::default(),
        }
    }

    /// Take capacity, timeout and retry policy from `config`.
    pub fn with_config(mut self, config: &ExtractionConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.config = self.config.with_max_concurrent(max);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.config = self.config.with_retry(retry);
        self
    }

    pub fn build(self) -> Orchestrator {
        let capacity = self.config.max_concurrent.max(1);
        info!(
            subsystem = "jobs",
            component = "orchestrator",
            extractor = self.extractor.name(),
            capacity,
            timeout_secs = self.config.timeout.map(|t| t.as_secs()),
            max_retries = self.config.retry.max_retries,
            "Orchestrator created"
        );
        Orchestrator {
            ctx: Arc::new(TaskContext {
                extractor: self.extractor,
                sink: self.sink,
                permits: Arc::new(Semaphore::new(capacity)),
                timeout: self.config.timeout,
                retry: self.config.retry,
            }),
            tracker: TaskTracker::new(),
            capacity,
        }
    }
}
