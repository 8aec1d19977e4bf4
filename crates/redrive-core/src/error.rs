//! Error types for redrive runs.

use queue_runtime::{BatchFailure, ConfigurationError, QueueError, ValidationError};
use thiserror::Error;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

/// Standard result type for redrive operations
pub type RedriveResult<T> = Result<T, RedriveError>;

/// Errors that abort a redrive run
///
/// Every variant is fatal. An empty receive is not an error and malformed
/// messages are skipped, so neither appears here.
#[derive(Debug, Error)]
pub enum RedriveError {
    #[error("Source and destination are the same queue: {queue_url}")]
    SameQueue { queue_url: String },

    #[error(
        "Failed to delete {} of {requested} messages from source: {}",
        .failed.len(),
        describe_failures(.failed)
    )]
    PartialDelete {
        requested: usize,
        failed: Vec<BatchFailure>,
    },

    #[error(
        "Destination {destination} rejected {} messages ({sent} accepted): {}",
        .failed.len(),
        describe_failures(.failed)
    )]
    PartialSend {
        destination: String,
        sent: usize,
        failed: Vec<BatchFailure>,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Queue operation failed: {0}")]
    Queue(#[from] QueueError),
}

impl RedriveError {
    /// Check if re-running the tool may succeed without operator changes
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SameQueue { .. } => false,
            Self::PartialDelete { .. } => true,
            Self::PartialSend { failed, .. } => failed.iter().all(|f| !f.sender_fault),
            Self::Configuration(_) => false,
            Self::Validation(_) => false,
            Self::Queue(queue_error) => queue_error.is_transient(),
        }
    }

    /// Entries rejected by a batch call, if any
    pub fn failed_entries(&self) -> &[BatchFailure] {
        match self {
            Self::PartialDelete { failed, .. } | Self::PartialSend { failed, .. } => failed,
            _ => &[],
        }
    }
}

/// Comma-separated `id (code: message)` list of rejected entries
fn describe_failures(failed: &[BatchFailure]) -> String {
    failed
        .iter()
        .map(BatchFailure::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
