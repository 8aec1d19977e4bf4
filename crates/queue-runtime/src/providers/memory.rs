//! In-memory queue provider implementation for testing and development.
//!
//! This module provides a fully functional in-memory queue implementation that:
//! - Honours visibility timeouts for received-but-not-deleted messages
//! - Reports per-entry batch failures the way SQS does
//! - Counts every operation so callers can assert on I/O behaviour
//! - Provides thread-safe concurrent access
//!
//! Malformed messages can be injected with [`InMemoryProvider::push_raw`] to
//! exercise consumers against incomplete receive responses.

use crate::client::QueueClient;
use crate::error::{QueueError, ValidationError};
use crate::message::{
    BatchFailure, BatchOutcome, DeleteEntry, MessageId, QueueUrl, RawMessage, ReceiptHandle,
    ReceiveRequest, SendEntry, Timestamp, ALL_ATTRIBUTES, MAX_BATCH_SIZE,
};
use crate::provider::{InMemoryConfig, ProviderType};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all queues
struct QueueStorage {
    queues: HashMap<QueueUrl, InMemoryQueue>,
    counts: OperationCounts,
    config: InMemoryConfig,
}

impl QueueStorage {
    fn new(config: InMemoryConfig) -> Self {
        Self {
            queues: HashMap::new(),
            counts: OperationCounts::default(),
            config,
        }
    }

    /// Get or create a queue
    fn get_or_create_queue(&mut self, queue: &QueueUrl) -> &mut InMemoryQueue {
        self.queues.entry(queue.clone()).or_default()
    }
}

/// Internal queue state for a single queue
#[derive(Default)]
struct InMemoryQueue {
    /// Visible messages (FIFO order)
    messages: VecDeque<StoredMessage>,
    /// Received messages keyed by the receipt handle issued for them
    in_flight: HashMap<String, InFlightMessage>,
}

impl InMemoryQueue {
    /// Return messages whose visibility timeout elapsed to the visible queue
    fn release_expired(&mut self) {
        let now = Timestamp::now();
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, in_flight)| now >= in_flight.visible_at)
            .map(|(handle, _)| handle.clone())
            .collect();

        for handle in expired {
            if let Some(in_flight) = self.in_flight.remove(&handle) {
                self.messages.push_back(in_flight.message);
            }
        }
    }

    fn len(&self) -> usize {
        self.messages.len() + self.in_flight.len()
    }
}

/// A message stored in the queue.
///
/// Fields are optional so malformed messages can be simulated.
#[derive(Clone)]
struct StoredMessage {
    message_id: Option<String>,
    body: Option<String>,
    attributes: HashMap<String, String>,
    issue_receipt_handle: bool,
    enqueued_at: Timestamp,
    receive_count: u32,
}

impl StoredMessage {
    fn from_body(body: String) -> Self {
        Self {
            message_id: Some(MessageId::new().to_string()),
            body: Some(body),
            attributes: HashMap::new(),
            issue_receipt_handle: true,
            enqueued_at: Timestamp::now(),
            receive_count: 0,
        }
    }

    fn from_raw(raw: RawMessage) -> Self {
        Self {
            message_id: raw.message_id,
            body: raw.body,
            attributes: raw.attributes,
            issue_receipt_handle: raw.receipt_handle.is_some(),
            enqueued_at: Timestamp::now(),
            receive_count: 0,
        }
    }

    /// Build the receive-response view of this message
    fn to_raw(&self, receipt_handle: &str, request: &ReceiveRequest) -> RawMessage {
        let mut attributes = self.attributes.clone();
        let wants = |name: &str| {
            request
                .attribute_names
                .iter()
                .any(|requested| requested == ALL_ATTRIBUTES || requested == name)
        };

        if wants("ApproximateReceiveCount") {
            attributes.insert(
                "ApproximateReceiveCount".to_string(),
                self.receive_count.to_string(),
            );
        }
        if wants("SentTimestamp") {
            attributes.insert(
                "SentTimestamp".to_string(),
                self.enqueued_at.as_datetime().timestamp_millis().to_string(),
            );
        }

        RawMessage {
            message_id: self.message_id.clone(),
            receipt_handle: self
                .issue_receipt_handle
                .then(|| receipt_handle.to_string()),
            body: self.body.clone(),
            attributes,
        }
    }
}

/// A message currently checked out by a receive
struct InFlightMessage {
    message: StoredMessage,
    visible_at: Timestamp,
}

/// Number of calls made against an [`InMemoryProvider`], across all queues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub receive_calls: usize,
    pub delete_calls: usize,
    pub send_calls: usize,
}

impl OperationCounts {
    /// Total number of queue operations
    pub fn total(&self) -> usize {
        self.receive_calls + self.delete_calls + self.send_calls
    }
}

// ============================================================================
// InMemoryProvider
// ============================================================================

/// In-memory queue provider implementation
pub struct InMemoryProvider {
    storage: Arc<RwLock<QueueStorage>>,
}

impl InMemoryProvider {
    /// Create new in-memory provider with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(QueueStorage::new(config))),
        }
    }

    /// Enqueue a well-formed message directly, bypassing send-batch accounting
    pub fn enqueue(&self, queue: &QueueUrl, body: &str) -> Result<(), QueueError> {
        self.push(queue, StoredMessage::from_body(body.to_string()))
    }

    /// Enqueue a message that will be received exactly as described by `raw`.
    ///
    /// A `None` receipt handle makes every receive of this message omit it;
    /// such messages can never be deleted.
    pub fn push_raw(&self, queue: &QueueUrl, raw: RawMessage) -> Result<(), QueueError> {
        self.push(queue, StoredMessage::from_raw(raw))
    }

    /// Number of messages not yet deleted, visible or in flight
    pub fn message_count(&self, queue: &QueueUrl) -> usize {
        let storage = self.read_storage();
        storage.queues.get(queue).map_or(0, InMemoryQueue::len)
    }

    /// Bodies of currently visible messages, in queue order
    pub fn visible_bodies(&self, queue: &QueueUrl) -> Vec<String> {
        let storage = self.read_storage();
        storage
            .queues
            .get(queue)
            .map(|q| q.messages.iter().filter_map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of the operation counters
    pub fn operation_counts(&self) -> OperationCounts {
        self.read_storage().counts
    }

    fn push(&self, queue: &QueueUrl, message: StoredMessage) -> Result<(), QueueError> {
        let mut storage = self.write_storage();
        let max_queue_size = storage.config.max_queue_size;
        let target = storage.get_or_create_queue(queue);
        if target.len() >= max_queue_size {
            return Err(QueueError::ProviderError {
                provider: ProviderType::InMemory.to_string(),
                code: "QueueFull".to_string(),
                message: format!("queue {} holds {} messages", queue, max_queue_size),
            });
        }
        target.messages.push_back(message);
        Ok(())
    }

    fn read_storage(&self) -> std::sync::RwLockReadGuard<'_, QueueStorage> {
        // A poisoned lock only means another test thread panicked mid-operation
        self.storage.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_storage(&self) -> std::sync::RwLockWriteGuard<'_, QueueStorage> {
        self.storage.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.read_storage();
        f.debug_struct("InMemoryProvider")
            .field("queues", &storage.queues.len())
            .field("counts", &storage.counts)
            .finish()
    }
}

/// Reject batch calls the way SQS does before looking at any entry
fn validate_batch<'a>(
    ids: impl Iterator<Item = &'a str>,
    size: usize,
) -> Result<(), QueueError> {
    if size == 0 {
        return Err(QueueError::ProviderError {
            provider: ProviderType::InMemory.to_string(),
            code: "EmptyBatchRequest".to_string(),
            message: "batch request contains no entries".to_string(),
        });
    }

    if size > MAX_BATCH_SIZE {
        return Err(QueueError::BatchTooLarge {
            size,
            max_size: MAX_BATCH_SIZE,
        });
    }

    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(QueueError::ProviderError {
                provider: ProviderType::InMemory.to_string(),
                code: "BatchEntryIdsNotDistinct".to_string(),
                message: format!("duplicate batch entry id '{}'", id),
            });
        }
    }

    Ok(())
}

#[async_trait]
impl QueueClient for InMemoryProvider {
    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<RawMessage>, QueueError> {
        if request.max_messages == 0 || request.max_messages as usize > MAX_BATCH_SIZE {
            return Err(QueueError::ValidationError(ValidationError::OutOfRange {
                field: "max_messages".to_string(),
                message: format!("must be 1-{}", MAX_BATCH_SIZE),
            }));
        }

        let mut storage = self.write_storage();
        storage.counts.receive_calls += 1;
        let visibility_timeout = storage.config.visibility_timeout;
        let target = storage.get_or_create_queue(queue);
        target.release_expired();

        let visible_at = Timestamp::from_datetime(Timestamp::now().as_datetime() + visibility_timeout);
        let mut received = Vec::new();

        while received.len() < request.max_messages as usize {
            let Some(mut message) = target.messages.pop_front() else {
                break;
            };

            message.receive_count += 1;
            let receipt_handle = uuid::Uuid::new_v4().to_string();
            received.push(message.to_raw(&receipt_handle, request));
            target.in_flight.insert(
                receipt_handle,
                InFlightMessage {
                    message,
                    visible_at: visible_at.clone(),
                },
            );
        }

        Ok(received)
    }

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        let mut storage = self.write_storage();
        storage.counts.delete_calls += 1;
        let target = storage.get_or_create_queue(queue);

        match target.in_flight.remove(receipt.handle()) {
            Some(_) => Ok(()),
            None => Err(QueueError::MessageNotFound {
                receipt: receipt.to_string(),
            }),
        }
    }

    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteEntry],
    ) -> Result<BatchOutcome, QueueError> {
        validate_batch(entries.iter().map(|e| e.id.as_str()), entries.len())?;

        let mut storage = self.write_storage();
        storage.counts.delete_calls += 1;
        let target = storage.get_or_create_queue(queue);

        let mut outcome = BatchOutcome::default();
        for entry in entries {
            if target
                .in_flight
                .remove(entry.receipt_handle.handle())
                .is_some()
            {
                outcome.successful.push(entry.id.clone());
            } else {
                outcome.failed.push(BatchFailure {
                    id: entry.id.clone(),
                    code: "ReceiptHandleIsInvalid".to_string(),
                    message: format!("receipt handle {} is not in flight", entry.receipt_handle),
                    sender_fault: true,
                });
            }
        }

        Ok(outcome)
    }

    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendEntry],
    ) -> Result<BatchOutcome, QueueError> {
        validate_batch(entries.iter().map(|e| e.id.as_str()), entries.len())?;

        let mut storage = self.write_storage();
        storage.counts.send_calls += 1;
        let max_queue_size = storage.config.max_queue_size;
        let max_message_size = ProviderType::InMemory.max_message_size();
        let target = storage.get_or_create_queue(queue);

        let mut outcome = BatchOutcome::default();
        for entry in entries {
            if entry.body.len() > max_message_size {
                outcome.failed.push(BatchFailure {
                    id: entry.id.clone(),
                    code: "InvalidParameterValue".to_string(),
                    message: format!(
                        "message of {} bytes exceeds {} bytes",
                        entry.body.len(),
                        max_message_size
                    ),
                    sender_fault: true,
                });
                continue;
            }

            if target.len() >= max_queue_size {
                outcome.failed.push(BatchFailure {
                    id: entry.id.clone(),
                    code: "QueueFull".to_string(),
                    message: format!("queue holds {} messages", max_queue_size),
                    sender_fault: false,
                });
                continue;
            }

            target
                .messages
                .push_back(StoredMessage::from_body(entry.body.clone()));
            outcome.successful.push(entry.id.clone());
        }

        Ok(outcome)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
