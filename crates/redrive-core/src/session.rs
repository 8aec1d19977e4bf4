//! A single redrive run from one queue to another.

use crate::config::RedriveConfig;
use crate::drainer::{DrainStats, Drainer};
use crate::error::{RedriveError, RedriveResult};
use crate::forwarder::{BatchForwarder, ForwardReport};
use queue_runtime::{QueueClient, QueueUrl, ReceiveRequest, MAX_BATCH_SIZE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

/// Convert a user-supplied message limit into a drain cap.
///
/// Missing, zero and negative limits mean "no limit".
pub fn normalize_cap(max_messages: Option<i64>) -> Option<usize> {
    max_messages
        .filter(|n| *n > 0)
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
}

/// Reject runs whose source and destination are the same queue
pub fn ensure_distinct(source: &QueueUrl, destination: &QueueUrl) -> RedriveResult<()> {
    if source == destination {
        return Err(RedriveError::SameQueue {
            queue_url: source.to_string(),
        });
    }
    Ok(())
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RedriveSummary {
    pub drained: DrainStats,
    pub forwarded: ForwardReport,
}

/// One drain-and-forward run
///
/// A session is consumed by [`run`](Self::run) and cannot be restarted.
pub struct TransferSession {
    client: Arc<dyn QueueClient>,
    source: QueueUrl,
    destination: QueueUrl,
    cap: Option<usize>,
    request: ReceiveRequest,
    chunk_size: usize,
}

impl TransferSession {
    /// Create an unbounded session with default receive and batch settings
    ///
    /// # Errors
    ///
    /// Returns [`RedriveError::SameQueue`] if `source` equals `destination`.
    pub fn new(
        client: Arc<dyn QueueClient>,
        source: QueueUrl,
        destination: QueueUrl,
    ) -> RedriveResult<Self> {
        ensure_distinct(&source, &destination)?;

        Ok(Self {
            client,
            source,
            destination,
            cap: None,
            request: ReceiveRequest::default(),
            chunk_size: MAX_BATCH_SIZE,
        })
    }

    /// Create a session using the receive wait and chunk size of `config`
    ///
    /// # Errors
    ///
    /// Returns [`RedriveError::SameQueue`] for identical queues and
    /// [`RedriveError::Validation`] if `config` is out of range.
    pub fn from_config(
        client: Arc<dyn QueueClient>,
        source: QueueUrl,
        destination: QueueUrl,
        config: &RedriveConfig,
    ) -> RedriveResult<Self> {
        config.validate()?;
        let mut session = Self::new(client, source, destination)?;
        session.request = config.receive_request();
        session.chunk_size = config.chunk_size;
        Ok(session)
    }

    /// Limit the number of messages taken from the source
    pub fn with_cap(mut self, cap: Option<usize>) -> Self {
        self.cap = cap.filter(|c| *c > 0);
        self
    }

    pub fn source(&self) -> &QueueUrl {
        &self.source
    }

    pub fn destination(&self) -> &QueueUrl {
        &self.destination
    }

    pub fn cap(&self) -> Option<usize> {
        self.cap
    }

    /// Drain the source into the destination.
    ///
    /// # Errors
    ///
    /// Returns the first error of the drain or the forward. The run stops
    /// there; messages already deleted from the source stay deleted.
    pub async fn run(self) -> RedriveResult<RedriveSummary> {
        let forwarder = BatchForwarder::new(self.client.clone(), self.destination, self.chunk_size)?;
        let drainer = Drainer::new(self.client, self.source.clone())
            .with_cap(self.cap)
            .with_request(self.request);
        let progress = drainer.progress();

        info!(
            source = %self.source,
            destination = %forwarder.destination(),
            cap = ?self.cap,
            "Starting redrive"
        );

        match forwarder.forward(drainer.drain()).await {
            Ok(forwarded) => {
                let summary = RedriveSummary {
                    drained: progress.snapshot(),
                    forwarded,
                };
                info!(
                    forwarded = summary.forwarded.messages,
                    batches = summary.forwarded.batches,
                    deleted = summary.drained.deleted,
                    skipped = summary.drained.skipped,
                    "Redrive complete"
                );
                Ok(summary)
            }
            Err(e) => {
                let stats = progress.snapshot();
                error!(
                    error = %e,
                    failed = ?e.failed_entries(),
                    processed = stats.processed,
                    deleted = stats.deleted,
                    skipped = stats.skipped,
                    "Redrive aborted"
                );
                Err(e)
            }
        }
    }
}
