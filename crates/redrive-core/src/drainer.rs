//! Lazy, single-pass draining of a source queue.
//!
//! The [`Drainer`] turns a queue into a stream of [`ReceivedMessage`]s. A
//! message is deleted from the source only after it has been yielded and the
//! consumer asks for the next item, so every deleted message has been handed
//! to the consumer first. Messages that were never yielded stay on the queue
//! and reappear once their visibility timeout expires.

use crate::error::RedriveError;
use async_stream::try_stream;
use futures::Stream;
use queue_runtime::{DeleteEntry, QueueClient, QueueUrl, ReceiveRequest, ReceivedMessage};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "drainer_tests.rs"]
mod tests;

// ============================================================================
// Progress Tracking
// ============================================================================

#[derive(Debug, Default)]
struct ProgressCounters {
    receive_calls: AtomicUsize,
    processed: AtomicUsize,
    yielded: AtomicUsize,
    deleted: AtomicUsize,
    skipped: AtomicUsize,
}

/// Shared view of a drain in progress
///
/// Clones observe the same counters, so a handle taken before the stream is
/// consumed still reports progress after the stream fails or is dropped.
#[derive(Debug, Clone, Default)]
pub struct DrainProgress {
    counters: Arc<ProgressCounters>,
}

impl DrainProgress {
    /// Number of receive calls issued
    pub fn receive_calls(&self) -> usize {
        self.counters.receive_calls.load(Ordering::Relaxed)
    }

    /// Messages counted against the cap, malformed ones included
    pub fn processed(&self) -> usize {
        self.counters.processed.load(Ordering::Relaxed)
    }

    /// Messages handed to the consumer
    pub fn yielded(&self) -> usize {
        self.counters.yielded.load(Ordering::Relaxed)
    }

    /// Messages deleted from the source
    pub fn deleted(&self) -> usize {
        self.counters.deleted.load(Ordering::Relaxed)
    }

    /// Malformed messages left on the source
    pub fn skipped(&self) -> usize {
        self.counters.skipped.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> DrainStats {
        DrainStats {
            receive_calls: self.receive_calls(),
            processed: self.processed(),
            yielded: self.yielded(),
            deleted: self.deleted(),
            skipped: self.skipped(),
        }
    }

    fn record(counter: &AtomicUsize, amount: usize) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }
}

/// Counters of a finished or aborted drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainStats {
    pub receive_calls: usize,
    pub processed: usize,
    pub yielded: usize,
    pub deleted: usize,
    pub skipped: usize,
}

// ============================================================================
// Drainer
// ============================================================================

/// Drains a source queue into a message stream
pub struct Drainer {
    client: Arc<dyn QueueClient>,
    source: QueueUrl,
    cap: Option<usize>,
    request: ReceiveRequest,
    progress: DrainProgress,
}

impl Drainer {
    /// Create an unbounded drainer with the default receive request
    pub fn new(client: Arc<dyn QueueClient>, source: QueueUrl) -> Self {
        Self {
            client,
            source,
            cap: None,
            request: ReceiveRequest::default(),
            progress: DrainProgress::default(),
        }
    }

    /// Limit the number of messages taken from the source
    ///
    /// `None` and `Some(0)` both mean unbounded.
    pub fn with_cap(mut self, cap: Option<usize>) -> Self {
        self.cap = cap.filter(|c| *c > 0);
        self
    }

    /// Replace the receive request used for every poll
    pub fn with_request(mut self, request: ReceiveRequest) -> Self {
        self.request = request;
        self
    }

    /// Handle for observing progress while the stream is consumed
    pub fn progress(&self) -> DrainProgress {
        self.progress.clone()
    }

    /// Consume the drainer and return the message stream.
    ///
    /// The stream polls the source until a receive comes back empty or the
    /// cap is reached. Each received batch is truncated to the remaining cap
    /// allowance and counted in full before its messages are examined.
    /// Malformed messages are logged and skipped without being deleted.
    ///
    /// # Errors
    ///
    /// The stream yields an error and ends when a queue call fails, or with
    /// [`RedriveError::PartialDelete`] when the source refuses a deletion.
    pub fn drain(self) -> impl Stream<Item = Result<ReceivedMessage, RedriveError>> {
        let Drainer {
            client,
            source,
            cap,
            request,
            progress,
        } = self;

        try_stream! {
            loop {
                if let Some(cap) = cap {
                    if progress.processed() >= cap {
                        info!(queue = %source, cap = cap, "Message cap reached, done");
                        break;
                    }
                }

                let mut batch = client
                    .receive_messages(&source, &request)
                    .await
                    .map_err(RedriveError::from)?;
                DrainProgress::record(&progress.counters.receive_calls, 1);
                debug!(queue = %source, received = batch.len(), "Received messages");

                if batch.is_empty() {
                    info!(queue = %source, processed = progress.processed(), "Source queue drained");
                    break;
                }

                if let Some(cap) = cap {
                    batch.truncate(cap.saturating_sub(progress.processed()));
                }
                DrainProgress::record(&progress.counters.processed, batch.len());

                for raw in batch {
                    let message = match ReceivedMessage::try_from(raw) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!(queue = %source, error = %e, "Skipping malformed message");
                            DrainProgress::record(&progress.counters.skipped, 1);
                            continue;
                        }
                    };

                    let entry = DeleteEntry::for_message(&message);
                    DrainProgress::record(&progress.counters.yielded, 1);
                    yield message;

                    let outcome = client
                        .delete_message_batch(&source, std::slice::from_ref(&entry))
                        .await
                        .map_err(RedriveError::from)?;
                    if outcome.successful.is_empty() {
                        Err::<(), _>(RedriveError::PartialDelete {
                            requested: 1,
                            failed: outcome.failed,
                        })?;
                    }
                    DrainProgress::record(&progress.counters.deleted, 1);
                    debug!(queue = %source, receipt = %entry.receipt_handle, "Deleted message");
                }
            }
        }
    }
}
