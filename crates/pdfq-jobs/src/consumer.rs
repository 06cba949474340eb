//! Consumer loop: pulls messages one at a time and hands them to the
//! orchestrator until cancelled.

use backon::{BackoffBuilder, ExponentialBackoff};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use pdfq_core::{Error, MessageSource, Result};

use crate::config::PullBackoff;
use crate::orchestrator::Orchestrator;

/// Pull and dispatch messages until `cancel` fires.
///
/// Handling errors (undecodable or invalid jobs) are logged and the message
/// is dropped. Every handled message, dropped or dispatched, is then
/// committed to the source; a failed commit is logged and the loop goes on. Pull errors are retried after a growing, jittered delay that
/// resets on the next successful pull. In-flight extraction tasks are not
/// awaited; call [`Orchestrator::drain`] afterwards.
///
/// Only returns on cancellation, with [`Error::Cancelled`].
pub async fn consume<S>(
    source: &mut S,
    orchestrator: &Orchestrator,
    cancel: &CancellationToken,
    backoff: &PullBackoff,
) -> Result<()>
where
    S: MessageSource + ?Sized,
{
    info!(
        subsystem = "jobs",
        component = "consumer",
        state = "running",
        capacity = orchestrator.capacity(),
        "Consumer loop started"
    );

    let mut delays: Option<ExponentialBackoff> = None;

    loop {
        let pulled = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            pulled = source.pull() => pulled,
        };

        match pulled {
            Ok(message) => {
                delays = None;
                trace!(
                    subsystem = "jobs",
                    component = "consumer",
                    partition = message.partition,
                    offset = message.offset,
                    key = message.key.as_deref().unwrap_or(""),
                    "Pulled message"
                );
                match orchestrator.handle(&message.payload) {
                    Ok(spawned) => debug!(
                        subsystem = "jobs",
                        component = "consumer",
                        partition = message.partition,
                        offset = message.offset,
                        spawned,
                        "Message dispatched"
                    ),
                    Err(e) => debug!(
                        subsystem = "jobs",
                        component = "consumer",
                        partition = message.partition,
                        offset = message.offset,
                        error = %e,
                        "Message dropped"
                    ),
                }
                // Dropped messages count as handled too.
                if let Err(e) = source.commit(&message).await {
                    warn!(
                        subsystem = "jobs",
                        component = "consumer",
                        op = "commit",
                        partition = message.partition,
                        offset = message.offset,
                        error = %e,
                        "Offset commit failed"
                    );
                }
            }
            Err(_) if cancel.is_cancelled() => break,
            Err(e) => {
                let delay = delays
                    .get_or_insert_with(|| backoff.builder().build())
                    .next()
                    .unwrap_or(backoff.max_delay);
                warn!(
                    subsystem = "jobs",
                    component = "consumer",
                    op = "pull",
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Queue read failed"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    info!(
        subsystem = "jobs",
        component = "consumer",
        state = "stopping",
        outstanding = orchestrator.outstanding(),
        "Consumer loop cancelled"
    );
    Err(Error::Cancelled)
}

/// Run [`consume`] to cancellation, then drain outstanding tasks.
///
/// The source is dropped only after the drain completes.
pub async fn run_consumer<S>(
    mut source: S,
    orchestrator: &Orchestrator,
    cancel: CancellationToken,
    backoff: PullBackoff,
) -> Result<()>
where
    S: MessageSource,
{
    match consume(&mut source, orchestrator, &cancel, &backoff).await {
        Err(e) if e.is_cancelled() => {}
        Err(e) => return Err(e),
        Ok(()) => {}
    }

    orchestrator.drain().await;
    drop(source);

    info!(
        subsystem = "jobs",
        component = "consumer",
        state = "stopped",
        "Consumer stopped"
    );
    Ok(())
}
