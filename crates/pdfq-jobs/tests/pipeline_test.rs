//! Integration tests for the extraction pipeline.
//!
//! This test suite validates:
//! - Invalid jobs are rejected before any task is spawned
//! - The permit pool bounds concurrent extraction calls across jobs
//! - Drain waits for every task, failed ones included
//! - The consumer loop survives malformed payloads and read errors
//! - Cancellation stops the loop without another pull
//! - Shutdown drains in-flight tasks before the source is released
//! - Every handled message is committed, dropped ones included
//! - Pull failures back off with growing, bounded delays
//!
//! All tests run against in-memory queues and a scripted extractor; no
//! broker or extraction service is needed.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use pdfq_core::{
    Error, FileDescriptor, Job, MessageSink, MessageSource, QueueMessage, Result, TextExtractor,
};
use pdfq_jobs::{
    consume, run_consumer, MemorySink, Orchestrator, OrchestratorBuilder, PullBackoff,
};
use pdfq_queue::memory_queue;

// ============================================================================
// HELPERS
// ============================================================================

/// Extractor that sleeps, tracks how many calls overlap, and fails for
/// configured file names.
struct ScriptedExtractor {
    delay: Duration,
    failing: HashSet<String>,
    current: AtomicUsize,
    max_seen: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            failing: HashSet::new(),
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(mut self, file_name: &str) -> Self {
        self.failing.insert(file_name.to_string());
        self
    }
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);

        sleep(self.delay).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.contains(&name) {
            return Err(Error::Extraction(format!("Tika returned 500 for {name}")));
        }
        Ok(format!("text of {name}"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn job(id: &str, names: &[&str]) -> Job {
    Job::new(
        id,
        1_700_000_000,
        names
            .iter()
            .map(|n| FileDescriptor::new(format!("/data/{n}"), *n))
            .collect(),
    )
}

fn orchestrator(
    extractor: Arc<ScriptedExtractor>,
    sink: Arc<MemorySink>,
    capacity: usize,
) -> Orchestrator {
    OrchestratorBuilder::new(extractor)
        .with_sink(sink)
        .with_max_concurrent(capacity)
        .build()
}

/// Source that records pull times and always fails.
struct FailingSource {
    pulls: Arc<Mutex<Vec<Instant>>>,
}

#[async_trait]
impl MessageSource for FailingSource {
    async fn pull(&mut self) -> Result<QueueMessage> {
        self.pulls.lock().unwrap().push(Instant::now());
        Err(Error::TransientRead("broker unavailable".to_string()))
    }
}

/// Source whose pull never completes.
struct BlockedSource {
    pulls: Arc<AtomicUsize>,
}

#[async_trait]
impl MessageSource for BlockedSource {
    async fn pull(&mut self) -> Result<QueueMessage> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<Result<QueueMessage>>().await
    }
}

/// Source that replays fixed messages and then blocks.
///
/// Records committed offsets and how many outcomes the sink held when the
/// source was dropped.
struct ReplaySource {
    messages: VecDeque<QueueMessage>,
    committed: Arc<Mutex<Vec<i64>>>,
    sink: Arc<MemorySink>,
    outcomes_at_drop: Arc<Mutex<Option<usize>>>,
}

impl ReplaySource {
    fn new(payloads: Vec<Vec<u8>>, sink: Arc<MemorySink>) -> Self {
        let messages = payloads
            .into_iter()
            .enumerate()
            .map(|(offset, payload)| QueueMessage {
                key: None,
                payload,
                partition: 0,
                offset: offset as i64,
            })
            .collect();
        Self {
            messages,
            committed: Arc::new(Mutex::new(Vec::new())),
            sink,
            outcomes_at_drop: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl MessageSource for ReplaySource {
    async fn pull(&mut self) -> Result<QueueMessage> {
        match self.messages.pop_front() {
            Some(message) => Ok(message),
            None => std::future::pending::<Result<QueueMessage>>().await,
        }
    }

    async fn commit(&mut self, message: &QueueMessage) -> Result<()> {
        self.committed.lock().unwrap().push(message.offset);
        Ok(())
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        *self.outcomes_at_drop.lock().unwrap() = Some(self.sink.len());
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(10), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

#[tokio::test]
async fn test_mismatched_job_spawns_nothing() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(1)));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor.clone(), sink.clone(), 3);

    let payload = br#"{"id":"job_bad","create_timestamp":1,"file_path_list":["/a.pdf","/b.pdf"],"file_name_list":["a.pdf"]}"#;
    let err = orchestrator.handle(payload).unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(orchestrator.outstanding(), 0);
    orchestrator.drain().await;
    assert!(sink.is_empty());
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_job_spawns_nothing() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(1)));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor, sink.clone(), 3);

    let err = orchestrator.submit(job("job_empty", &[])).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(orchestrator.outstanding(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_never_exceeds_capacity() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(50)));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor.clone(), sink.clone(), 3);

    let names: Vec<String> = (0..10).map(|i| format!("f{i}.pdf")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    assert_eq!(orchestrator.submit(job("job_big", &refs)).unwrap(), 10);
    // A second job shares the same pool.
    assert_eq!(
        orchestrator
            .submit(job("job_small", &["x.pdf", "y.pdf"]))
            .unwrap(),
        2
    );

    orchestrator.drain().await;

    assert_eq!(sink.len(), 12);
    assert_eq!(extractor.max_seen.load(Ordering::SeqCst), 3);
    assert_eq!(orchestrator.available_permits(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_single_permit_serializes_calls() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(20)));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor.clone(), sink.clone(), 1);

    orchestrator
        .submit(job("job_1", &["a.pdf", "b.pdf", "c.pdf"]))
        .unwrap();
    orchestrator.drain().await;

    assert_eq!(extractor.max_seen.load(Ordering::SeqCst), 1);
    assert_eq!(sink.succeeded(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_drain_waits_for_failed_tasks() {
    let extractor = Arc::new(
        ScriptedExtractor::new(Duration::from_secs(2))
            .failing_on("b.pdf")
            .failing_on("d.pdf"),
    );
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor, sink.clone(), 2);

    orchestrator
        .submit(job("job_1", &["a.pdf", "b.pdf", "c.pdf", "d.pdf"]))
        .unwrap();
    assert_eq!(orchestrator.outstanding(), 4);
    assert!(sink.is_empty());

    orchestrator.drain().await;

    assert_eq!(orchestrator.outstanding(), 0);
    assert_eq!(sink.succeeded(), 2);
    assert_eq!(sink.failed(), 2);
}

#[tokio::test]
async fn test_drain_with_nothing_outstanding_returns_immediately() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(1)));
    let orchestrator = orchestrator(extractor, Arc::new(MemorySink::new()), 3);

    timeout(Duration::from_millis(100), orchestrator.drain())
        .await
        .expect("drain with no tasks should not block");
}

#[tokio::test(start_paused = true)]
async fn test_failure_does_not_affect_siblings() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(10)).failing_on("b.pdf"));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor, sink.clone(), 3);

    orchestrator
        .submit(job("job_1", &["a.pdf", "b.pdf", "c.pdf"]))
        .unwrap();
    orchestrator.drain().await;

    let a = sink.get("job_1", "a.pdf").unwrap();
    let b = sink.get("job_1", "b.pdf").unwrap();
    let c = sink.get("job_1", "c.pdf").unwrap();
    assert_eq!(a.result.unwrap().text, "text of a.pdf");
    assert!(b.error().unwrap().contains("500"));
    assert!(c.is_success());
}

// ============================================================================
// CONSUMER LOOP
// ============================================================================

#[tokio::test]
async fn test_end_to_end_partial_failure() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(5)).failing_on("b.pdf"));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor, sink.clone(), 3);

    let (publisher, source) = memory_queue(16);
    let job_1 = job("job_1", &["a.pdf", "b.pdf"]);
    publisher.publish(&job_1.id, &job_1.encode()).await.unwrap();

    let cancel = CancellationToken::new();
    let consumer = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            run_consumer(source, &orchestrator, cancel, PullBackoff::default()).await
        })
    };

    wait_for(|| sink.len() == 2).await;
    cancel.cancel();
    consumer.await.unwrap().unwrap();

    assert!(sink.get("job_1", "a.pdf").unwrap().is_success());
    assert!(!sink.get("job_1", "b.pdf").unwrap().is_success());
    assert_eq!(orchestrator.outstanding(), 0);
    drop(publisher);
}

#[tokio::test]
async fn test_malformed_payload_does_not_stop_loop() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(1)));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor, sink.clone(), 3);

    let (publisher, mut source) = memory_queue(16);
    publisher.publish("garbage", b"{not json").await.unwrap();
    publisher.publish("binary", &[0xff, 0x00, 0x13]).await.unwrap();
    let mismatched = br#"{"id":"job_x","create_timestamp":1,"file_path_list":["/a.pdf"],"file_name_list":[]}"#;
    publisher.publish("job_x", mismatched).await.unwrap();
    let good = job("job_ok", &["ok.pdf"]);
    publisher.publish(&good.id, &good.encode()).await.unwrap();

    let cancel = CancellationToken::new();
    let consumer = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            consume(&mut source, &orchestrator, &cancel, &PullBackoff::default()).await
        })
    };

    wait_for(|| sink.len() == 1).await;
    cancel.cancel();
    let result = consumer.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(sink.get("job_ok", "ok.pdf").unwrap().is_success());
    drop(publisher);
}

#[tokio::test]
async fn test_cancel_during_blocked_pull() {
    let orchestrator = orchestrator(
        Arc::new(ScriptedExtractor::new(Duration::from_millis(1))),
        Arc::new(MemorySink::new()),
        3,
    );
    let pulls = Arc::new(AtomicUsize::new(0));
    let mut source = BlockedSource {
        pulls: pulls.clone(),
    };

    let cancel = CancellationToken::new();
    let consumer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            consume(&mut source, &orchestrator, &cancel, &PullBackoff::default()).await
        })
    };

    wait_for(|| pulls.load(Ordering::SeqCst) == 1).await;
    cancel.cancel();

    let result = timeout(Duration::from_secs(1), consumer)
        .await
        .expect("consumer should stop promptly")
        .unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(pulls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_before_start_never_pulls() {
    let orchestrator = orchestrator(
        Arc::new(ScriptedExtractor::new(Duration::from_millis(1))),
        Arc::new(MemorySink::new()),
        3,
    );
    let pulls = Arc::new(AtomicUsize::new(0));
    let mut source = BlockedSource {
        pulls: pulls.clone(),
    };

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = consume(&mut source, &orchestrator, &cancel, &PullBackoff::default()).await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(pulls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pull_errors_back_off() {
    let orchestrator = orchestrator(
        Arc::new(ScriptedExtractor::new(Duration::from_millis(1))),
        Arc::new(MemorySink::new()),
        3,
    );
    let pulls = Arc::new(Mutex::new(Vec::new()));
    let mut source = FailingSource {
        pulls: pulls.clone(),
    };
    let backoff = PullBackoff::new(Duration::from_millis(100), Duration::from_millis(400));

    let cancel = CancellationToken::new();
    let consumer = {
        let cancel = cancel.clone();
        tokio::spawn(async move { consume(&mut source, &orchestrator, &cancel, &backoff).await })
    };

    sleep(Duration::from_secs(5)).await;
    cancel.cancel();
    let result = consumer.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));

    let pulls = pulls.lock().unwrap().clone();
    // Without backoff this would be thousands of pulls.
    assert!(pulls.len() >= 4, "too few pulls: {}", pulls.len());
    assert!(pulls.len() <= 50, "too many pulls: {}", pulls.len());

    let gaps: Vec<Duration> = pulls.windows(2).map(|w| w[1] - w[0]).collect();
    assert!(gaps.iter().all(|g| *g >= Duration::from_millis(100)));
    assert!(gaps.iter().all(|g| *g <= Duration::from_millis(800)));
    assert!(gaps.last().unwrap() > gaps.first().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_closed_queue_keeps_loop_alive_until_cancel() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(1)));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor, sink.clone(), 3);

    // The buffered job is delivered, then every pull fails.
    let (publisher, source) = memory_queue(4);
    let job_1 = job("job_1", &["a.pdf"]);
    publisher.publish(&job_1.id, &job_1.encode()).await.unwrap();
    drop(publisher);

    let cancel = CancellationToken::new();
    let consumer = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            run_consumer(source, &orchestrator, cancel, PullBackoff::default()).await
        })
    };

    sleep(Duration::from_secs(2)).await;
    cancel.cancel();
    consumer.await.unwrap().unwrap();
    assert_eq!(sink.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drains_before_releasing_source() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_secs(5)).failing_on("b.pdf"));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor, sink.clone(), 3);

    let job_1 = job("job_1", &["a.pdf", "b.pdf"]);
    let source = ReplaySource::new(vec![job_1.encode()], sink.clone());
    let outcomes_at_drop = source.outcomes_at_drop.clone();

    let cancel = CancellationToken::new();
    let consumer = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            run_consumer(source, &orchestrator, cancel, PullBackoff::default()).await
        })
    };

    wait_for(|| orchestrator.outstanding() == 2).await;
    cancel.cancel();

    // Extractions are still sleeping: the consumer must be waiting on them.
    sleep(Duration::from_secs(1)).await;
    assert!(!consumer.is_finished());
    assert_eq!(orchestrator.outstanding(), 2);
    assert!(sink.is_empty());
    assert_eq!(*outcomes_at_drop.lock().unwrap(), None);

    consumer.await.unwrap().unwrap();

    assert_eq!(orchestrator.outstanding(), 0);
    assert!(sink.get("job_1", "a.pdf").unwrap().is_success());
    assert!(!sink.get("job_1", "b.pdf").unwrap().is_success());
    // The source outlived every outcome.
    assert_eq!(*outcomes_at_drop.lock().unwrap(), Some(2));
}

#[tokio::test]
async fn test_handled_messages_are_committed() {
    let extractor = Arc::new(ScriptedExtractor::new(Duration::from_millis(1)));
    let sink = Arc::new(MemorySink::new());
    let orchestrator = orchestrator(extractor, sink.clone(), 3);

    let good = job("job_ok", &["ok.pdf"]);
    let mismatched = br#"{"id":"job_x","create_timestamp":1,"file_path_list":["/a.pdf"],"file_name_list":[]}"#;
    let mut source = ReplaySource::new(
        vec![b"{not json".to_vec(), good.encode(), mismatched.to_vec()],
        sink.clone(),
    );
    let committed = source.committed.clone();

    let cancel = CancellationToken::new();
    let consumer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            consume(&mut source, &orchestrator, &cancel, &PullBackoff::default()).await
        })
    };

    wait_for(|| committed.lock().unwrap().len() == 3).await;
    cancel.cancel();
    let result = consumer.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));

    assert_eq!(*committed.lock().unwrap(), vec![0, 1, 2]);
    wait_for(|| sink.len() == 1).await;
    assert!(sink.get("job_ok", "ok.pdf").unwrap().is_success());
}
