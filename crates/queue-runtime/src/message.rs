//! Message types for queue operations including core domain identifiers.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use url::Url;

/// Maximum number of entries accepted by receive, send-batch and delete-batch calls
pub const MAX_BATCH_SIZE: usize = 10;

/// Attribute name that requests every system attribute on receive
pub const ALL_ATTRIBUTES: &str = "All";

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue identity.
///
/// Queues are addressed by their absolute URL
/// (`https://sqs.us-east-1.amazonaws.com/123456789012/orders-dlq`). Scheme
/// and host are compared case-insensitively, default ports are dropped and a
/// trailing slash is ignored, so spellings of one queue compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueUrl(String);

impl QueueUrl {
    /// Create new queue URL with validation
    pub fn new(url: String) -> Result<Self, ValidationError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "queue_url".to_string(),
            });
        }

        let parsed = Url::parse(trimmed).map_err(|e| ValidationError::InvalidFormat {
            field: "queue_url".to_string(),
            message: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidFormat {
                field: "queue_url".to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        if parsed.host_str().is_none() {
            return Err(ValidationError::InvalidFormat {
                field: "queue_url".to_string(),
                message: "missing host".to_string(),
            });
        }

        // Url lowercases scheme and host and strips default ports
        Ok(Self(parsed.as_str().trim_end_matches('/').to_string()))
    }

    /// Get queue URL as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the URL, which SQS uses as the queue name
    pub fn queue_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Region encoded in an `sqs.<region>.amazonaws.com` host, if any
    pub fn region_hint(&self) -> Option<String> {
        let host = Url::parse(&self.0).ok()?.host_str()?.to_string();
        let rest = host.strip_prefix("sqs.")?;
        let (region, suffix) = rest.split_once('.')?;
        if suffix.starts_with("amazonaws.com") && !region.is_empty() {
            Some(region.to_string())
        } else {
            None
        }
    }
}

impl std::fmt::Display for QueueUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueUrl {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for QueueUrl {
    type Error = ValidationError;

    fn try_from(url: String) -> Result<Self, Self::Error> {
        Self::new(url)
    }
}

impl From<QueueUrl> for String {
    fn from(url: QueueUrl) -> Self {
        url.0
    }
}

/// Unique identifier for messages within the queue system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Opaque token proving the current receive of a message is still valid.
///
/// Required to delete the message. Only valid until the visibility timeout of
/// the receive that produced it expires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Create new receipt handle
    pub fn new(handle: String) -> Self {
        Self(handle)
    }

    /// Get handle string
    pub fn handle(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Receipt handles are long; the prefix is enough to correlate in logs
        let prefix: String = self.0.chars().take(16).collect();
        write!(f, "{}…", prefix)
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A message exactly as decoded from a receive response.
///
/// Every field is optional because the wire format does not guarantee their
/// presence. Use [`ReceivedMessage::try_from`] to obtain a validated message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub message_id: Option<String>,
    pub receipt_handle: Option<String>,
    pub body: Option<String>,
    pub attributes: HashMap<String, String>,
}

impl RawMessage {
    /// Create a fully populated raw message
    pub fn new(message_id: &str, receipt_handle: &str, body: &str) -> Self {
        Self {
            message_id: Some(message_id.to_string()),
            receipt_handle: Some(receipt_handle.to_string()),
            body: Some(body.to_string()),
            attributes: HashMap::new(),
        }
    }

    /// Drop the receipt handle
    pub fn without_receipt_handle(mut self) -> Self {
        self.receipt_handle = None;
        self
    }

    /// Drop the message ID
    pub fn without_message_id(mut self) -> Self {
        self.message_id = None;
        self
    }

    /// Drop the body
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }

    /// Add message attribute
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }
}

/// A validated message received from a queue.
///
/// The body is an uninterpreted text blob and is never parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub receipt_handle: ReceiptHandle,
    pub body: String,
    pub attributes: HashMap<String, String>,
}

impl ReceivedMessage {
    /// Approximate number of times the message has been received, if reported
    pub fn receive_count(&self) -> Option<u32> {
        self.attributes
            .get("ApproximateReceiveCount")
            .and_then(|count| count.parse().ok())
    }
}

impl TryFrom<RawMessage> for ReceivedMessage {
    type Error = ValidationError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        let message_id = raw
            .message_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ValidationError::Required {
                field: "message_id".to_string(),
            })?;

        let receipt_handle = raw
            .receipt_handle
            .filter(|handle| !handle.is_empty())
            .ok_or_else(|| ValidationError::Required {
                field: "receipt_handle".to_string(),
            })?;

        let body = raw.body.ok_or_else(|| ValidationError::Required {
            field: "body".to_string(),
        })?;

        Ok(Self {
            message_id: MessageId(message_id),
            receipt_handle: ReceiptHandle::new(receipt_handle),
            body,
            attributes: raw.attributes,
        })
    }
}

// ============================================================================
// Batch Requests and Outcomes
// ============================================================================

/// Parameters for a receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    /// Maximum number of messages to return (1-10)
    pub max_messages: u32,
    /// Long-poll wait in seconds (0-20)
    pub wait_seconds: u32,
    /// System attributes to return with each message
    pub attribute_names: Vec<String>,
}

impl Default for ReceiveRequest {
    fn default() -> Self {
        Self {
            max_messages: MAX_BATCH_SIZE as u32,
            wait_seconds: 1,
            attribute_names: vec![ALL_ATTRIBUTES.to_string()],
        }
    }
}

impl ReceiveRequest {
    /// Set long-poll wait
    pub fn with_wait_seconds(mut self, wait_seconds: u32) -> Self {
        self.wait_seconds = wait_seconds;
        self
    }

    /// Set maximum number of messages
    pub fn with_max_messages(mut self, max_messages: u32) -> Self {
        self.max_messages = max_messages;
        self
    }
}

/// One entry of a delete-batch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: ReceiptHandle,
}

impl DeleteEntry {
    /// Build the delete entry for a received message, keyed by its message ID
    pub fn for_message(message: &ReceivedMessage) -> Self {
        Self {
            id: message.message_id.as_str().to_string(),
            receipt_handle: message.receipt_handle.clone(),
        }
    }
}

/// One entry of a send-batch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendEntry {
    pub id: String,
    pub body: String,
}

impl SendEntry {
    /// Create entry with a fresh, globally unique batch entry ID
    pub fn new(body: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            body,
        }
    }
}

/// An entry rejected by a batch call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub code: String,
    pub message: String,
    pub sender_fault: bool,
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}: {})", self.id, self.code, self.message)
    }
}

/// Result of a send-batch or delete-batch call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// IDs of the entries that succeeded
    pub successful: Vec<String>,
    /// Entries that were rejected
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    /// True when no entry was rejected
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of entries reported
    pub fn len(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// True when the outcome reports no entries at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
