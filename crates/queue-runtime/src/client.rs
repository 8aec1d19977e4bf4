//! Client trait and factory for queue operations.

use crate::error::QueueError;
use crate::message::{
    BatchOutcome, DeleteEntry, QueueUrl, RawMessage, ReceiptHandle, ReceiveRequest, SendEntry,
};
use crate::provider::{InMemoryConfig, ProviderConfig, ProviderType};
use crate::providers::{AwsSqsProvider, InMemoryProvider};
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Interface for queue operations, implemented by every provider.
///
/// All operations are plain request/response calls; implementations hold no
/// per-call state, so a single client may be shared behind an `Arc`.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive up to `request.max_messages` messages.
    ///
    /// An empty result does not prove the queue is empty: in-flight messages
    /// and eventual consistency can hide messages from a single receive.
    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<RawMessage>, QueueError>;

    /// Delete a single message
    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError>;

    /// Delete up to 10 messages; per-entry failures are reported, not raised
    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteEntry],
    ) -> Result<BatchOutcome, QueueError>;

    /// Send up to 10 messages; per-entry failures are reported, not raised
    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendEntry],
    ) -> Result<BatchOutcome, QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Get maximum batch size
    fn max_batch_size(&self) -> usize {
        self.provider_type().max_batch_size()
    }
}

/// Factory for creating queue clients with appropriate providers
pub struct QueueClientFactory;

impl QueueClientFactory {
    /// Create queue client from configuration
    pub async fn create_client(config: ProviderConfig) -> Result<Arc<dyn QueueClient>, QueueError> {
        let client: Arc<dyn QueueClient> = match config {
            ProviderConfig::InMemory(in_memory_config) => {
                Arc::new(InMemoryProvider::new(in_memory_config))
            }
            ProviderConfig::AwsSqs(aws_config) => Arc::new(
                AwsSqsProvider::new(aws_config)
                    .await
                    .map_err(|e| e.to_queue_error())?,
            ),
        };

        Ok(client)
    }

    /// Create test client with in-memory provider
    pub fn create_test_client() -> Arc<dyn QueueClient> {
        Arc::new(InMemoryProvider::new(InMemoryConfig::default()))
    }
}
