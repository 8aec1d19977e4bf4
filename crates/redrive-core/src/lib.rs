//! # Redrive Core
//!
//! Drain-and-forward pipeline for moving messages between SQS queues,
//! typically from a dead-letter queue back to its source.
//!
//! ## Architecture
//!
//! A run is a single task that pulls from a lazy stream:
//! - [`Drainer`] receives from the source and deletes each message once the
//!   consumer has taken it
//! - [`chunked`] groups the message stream into batches
//! - [`BatchForwarder`] sends each batch to the destination
//! - [`TransferSession`] wires the three together for one run
//!
//! Queue access goes through the `queue_runtime::QueueClient` trait, so the
//! same pipeline runs against AWS SQS or the in-memory provider.
//!
//! ## Usage
//!
//! ```rust
//! use queue_runtime::{InMemoryProvider, QueueUrl};
//! use redrive_core::TransferSession;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), redrive_core::RedriveError> {
//! let client = Arc::new(InMemoryProvider::default());
//! let source: QueueUrl = "http://localhost:4566/000000000000/orders-dlq".parse()?;
//! let destination: QueueUrl = "http://localhost:4566/000000000000/orders".parse()?;
//!
//! let summary = TransferSession::new(client, source, destination)?
//!     .with_cap(Some(100))
//!     .run()
//!     .await?;
//! println!("moved {} messages", summary.forwarded.messages);
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod config;
pub mod drainer;
pub mod error;
pub mod forwarder;
pub mod session;

pub use chunking::chunked;
pub use config::{RedriveConfig, MAX_WAIT_SECONDS};
pub use drainer::{DrainProgress, DrainStats, Drainer};
pub use error::{RedriveError, RedriveResult};
pub use forwarder::{BatchForwarder, ForwardReport};
pub use session::{ensure_distinct, normalize_cap, RedriveSummary, TransferSession};
