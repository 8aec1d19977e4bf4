//! Batch forwarding to the destination queue.

use crate::chunking::chunked;
use crate::error::{RedriveError, RedriveResult};
use futures::{pin_mut, Stream, StreamExt};
use queue_runtime::{QueueClient, QueueUrl, ReceivedMessage, SendEntry, ValidationError};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{error, info};

#[cfg(test)]
#[path = "forwarder_tests.rs"]
mod tests;

/// Totals of a completed forward
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForwardReport {
    /// Send-batch calls issued
    pub batches: usize,
    /// Messages accepted by the destination
    pub messages: usize,
}

/// Re-publishes a message stream to a destination queue in batches
///
/// Only the body of each message is forwarded. Every entry gets a fresh
/// batch entry ID; source message IDs and attributes are not carried over.
pub struct BatchForwarder {
    client: Arc<dyn QueueClient>,
    destination: QueueUrl,
    chunk_size: NonZeroUsize,
}

impl BatchForwarder {
    /// Create a forwarder sending `chunk_size` messages per call
    ///
    /// # Errors
    ///
    /// Returns [`RedriveError::Validation`] if `chunk_size` is zero or larger
    /// than the client's maximum batch size.
    pub fn new(
        client: Arc<dyn QueueClient>,
        destination: QueueUrl,
        chunk_size: usize,
    ) -> RedriveResult<Self> {
        let max = client.max_batch_size();
        let chunk_size = NonZeroUsize::new(chunk_size)
            .filter(|size| size.get() <= max)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "chunk_size".to_string(),
                message: format!("{} is not between 1 and {}", chunk_size, max),
            })?;

        Ok(Self {
            client,
            destination,
            chunk_size,
        })
    }

    /// Destination queue
    pub fn destination(&self) -> &QueueUrl {
        &self.destination
    }

    /// Consume `messages` and send them in chunks until the stream ends.
    ///
    /// # Errors
    ///
    /// Stops at the first error from the stream, the first failed send call,
    /// or the first batch with rejected entries ([`RedriveError::PartialSend`]).
    /// Messages already deleted from the source are not restored.
    pub async fn forward<S>(&self, messages: S) -> RedriveResult<ForwardReport>
    where
        S: Stream<Item = Result<ReceivedMessage, RedriveError>>,
    {
        let chunks = chunked(messages, self.chunk_size);
        pin_mut!(chunks);

        let mut report = ForwardReport::default();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            report.messages += self.send_chunk(chunk).await?;
            report.batches += 1;
        }

        Ok(report)
    }

    async fn send_chunk(&self, chunk: Vec<ReceivedMessage>) -> RedriveResult<usize> {
        let entries: Vec<SendEntry> = chunk
            .into_iter()
            .map(|message| SendEntry::new(message.body))
            .collect();

        info!(
            destination = %self.destination,
            count = entries.len(),
            "Writing {} messages to {}",
            entries.len(),
            self.destination.queue_name()
        );

        let outcome = self
            .client
            .send_message_batch(&self.destination, &entries)
            .await?;

        if !outcome.failed.is_empty() {
            error!(
                destination = %self.destination,
                sent = outcome.successful.len(),
                failed = outcome.failed.len(),
                "Destination rejected messages"
            );
            return Err(RedriveError::PartialSend {
                destination: self.destination.to_string(),
                sent: outcome.successful.len(),
                failed: outcome.failed,
            });
        }

        Ok(outcome.successful.len())
    }
}
