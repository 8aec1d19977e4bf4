//! # Queue Runtime
//!
//! Provider-agnostic SQS queue access for draining and re-publishing
//! messages, with an HTTP implementation for AWS SQS and an in-memory
//! implementation for tests.
//!
//! This library provides:
//! - Validated queue URLs and received-message types
//! - Batch receive, send and delete with per-entry failure reporting
//! - An AWS SQS provider speaking the Query API with Signature V4
//! - An in-memory provider with visibility timeouts and call counters
//!
//! ## Module Organization
//!
//! - [error] - Error types for all queue operations
//! - [message] - Message structures, batch entries and receipt handles
//! - [provider] - Provider types and configuration
//! - [client] - Client trait and factory
//! - [providers] - Concrete provider implementations

// Module declarations
pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;

// Re-export commonly used types at crate root for convenience
pub use client::{QueueClient, QueueClientFactory};
pub use error::{ConfigurationError, QueueError, SerializationError, ValidationError};
pub use message::{
    BatchFailure, BatchOutcome, DeleteEntry, MessageId, QueueUrl, RawMessage, ReceiptHandle,
    ReceiveRequest, ReceivedMessage, SendEntry, Timestamp, ALL_ATTRIBUTES, MAX_BATCH_SIZE,
};
pub use provider::{AwsSqsConfig, InMemoryConfig, ProviderConfig, ProviderType};
pub use providers::{AwsError, AwsSqsProvider, InMemoryProvider, OperationCounts};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
