//! Message ingestion: subscribe to new messages and extract archive attachments
//!
//! [`IngestionOrchestrator::start`] registers one subscription on the client and
//! returns as soon as it is registered. Messages are then processed in background
//! tasks, at most `max_concurrent_messages` at a time; the next message is only taken
//! off the stream once a slot frees up, so the client's buffer applies backpressure.
//! A failure while handling one message is logged and never ends the subscription.
//!
//! ```text
//! Idle ──start()──▶ Subscribed ──stop() / stream end──▶ Stopped
//!                      │  ▲
//!             message  ▼  │ outcome logged
//!                   Processing
//! ```

mod processor;


pub use processor::{MessageOutcome, MessageProcessor};

use crate::client::{MediaDownloader, MessageStream, MessagingClient};
use crate::config::IngestionConfig;
use crate::error::{Error, Result};
use crate::extraction::ArchiveExtractor;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle state of an [`IngestionOrchestrator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Not yet started
    Idle,
    /// Receiving messages
    Subscribed,
    /// Stopped explicitly or the message stream ended
    Stopped,
}

/// Owns a running message subscription
///
/// Dropping the handle cancels the subscription without waiting for in-flight
/// messages; [`stop`](Self::stop) cancels and waits.
#[derive(Debug)]
pub struct SubscriptionHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Whether the subscription loop is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop delivering new messages and wait for the ones already started
    ///
    /// Messages still buffered in the stream are dropped unprocessed.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!(error = %e, "message subscription task failed");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Wires the client's message stream to the per-message pipeline
pub struct IngestionOrchestrator {
    client: Arc<dyn MessagingClient>,
    processor: Arc<MessageProcessor>,
    max_concurrent: usize,
    subscription: Option<SubscriptionHandle>,
    stopped: bool,
}

impl IngestionOrchestrator {
    /// Create an orchestrator; nothing is subscribed until [`start`](Self::start)
    pub fn new(
        client: Arc<dyn MessagingClient>,
        media: Arc<dyn MediaDownloader>,
        extractor: Arc<dyn ArchiveExtractor>,
        download_dir: impl Into<PathBuf>,
        config: &IngestionConfig,
    ) -> Self {
        Self {
            client,
            processor: Arc::new(MessageProcessor::new(media, extractor, download_dir)),
            max_concurrent: config.max_concurrent_messages.max(1),
            subscription: None,
            stopped: false,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> OrchestratorState {
        match &self.subscription {
            Some(handle) if handle.is_active() => OrchestratorState::Subscribed,
            Some(_) => OrchestratorState::Stopped,
            None if self.stopped => OrchestratorState::Stopped,
            None => OrchestratorState::Idle,
        }
    }

    /// The per-message pipeline used by the subscription
    pub fn processor(&self) -> &Arc<MessageProcessor> {
        &self.processor
    }

    /// Subscribe to new messages and start processing them in the background
    ///
    /// Returns once the subscription is registered.
    pub async fn start(&mut self) -> Result<()> {
        if self.subscription.is_some() {
            return Err(Error::AlreadyStarted);
        }

        let stream = self.client.subscribe_new_messages().await?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_subscription(
            stream,
            Arc::clone(&self.processor),
            Arc::new(Semaphore::new(self.max_concurrent)),
            cancel.clone(),
        ));

        info!(
            max_concurrent = self.max_concurrent,
            "subscribed to new messages"
        );
        self.subscription = Some(SubscriptionHandle {
            cancel,
            task: Some(task),
        });
        self.stopped = false;
        Ok(())
    }

    /// Stop the subscription and wait for in-flight messages; no-op if not started
    pub async fn stop(&mut self) {
        if let Some(handle) = self.subscription.take() {
            handle.stop().await;
            self.stopped = true;
            info!("message subscription stopped");
        }
    }
}

async fn run_subscription(
    mut stream: MessageStream,
    processor: Arc<MessageProcessor>,
    limit: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    let mut in_flight = JoinSet::new();

    'deliver: loop {
        // A message is only pulled off the stream once a slot is free
        let permit = tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_finished(finished);
                continue;
            }

            permit = Arc::clone(&limit).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let message = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break 'deliver,

                Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_finished(finished);
                }

                next = stream.next() => match next {
                    Some(message) => break message,
                    None => {
                        info!("message stream ended");
                        break 'deliver;
                    }
                },
            }
        };

        let processor = Arc::clone(&processor);
        in_flight.spawn(async move {
            let _permit = permit;
            processor.process(&message).await
        });
    }

    if cancel.is_cancelled() {
        debug!(in_flight = in_flight.len(), "subscription cancelled");
    }

    // Unregister before draining so no new messages are queued
    drop(stream);

    while let Some(finished) = in_flight.join_next().await {
        log_finished(finished);
    }
}

fn log_finished(finished: std::result::Result<MessageOutcome, tokio::task::JoinError>) {
    match finished {
        Ok(outcome) => debug!(?outcome, "message processed"),
        Err(e) => warn!(error = %e, "message handler panicked"),
    }
}
