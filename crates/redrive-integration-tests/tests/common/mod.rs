//! Common test utilities for redrive integration tests
//!
//! This module provides:
//! - A recording queue client wrapping the in-memory provider
//! - Fault injection for delete and send batches
//! - Helpers for seeding queues

use async_trait::async_trait;
use queue_runtime::{
    BatchFailure, BatchOutcome, DeleteEntry, InMemoryProvider, ProviderType,
    QueueClient, QueueError, QueueUrl, RawMessage, ReceiptHandle, ReceiveRequest, SendEntry,
};
use std::sync::{Arc, Mutex};

pub fn source_queue() -> QueueUrl {
    QueueUrl::new("http://localhost:4566/000000000000/orders-dlq".to_string()).unwrap()
}

pub fn destination_queue() -> QueueUrl {
    QueueUrl::new("http://localhost:4566/000000000000/orders".to_string()).unwrap()
}

pub fn body(i: usize) -> String {
    format!("{{\"order\": {}}}", i)
}

// ============================================================================
// Recording Client
// ============================================================================

#[derive(Default)]
struct CallLog {
    receive_sizes: Vec<usize>,
    send_sizes: Vec<usize>,
    delete_sizes: Vec<usize>,
}

#[derive(Default)]
struct Faults {
    /// Delete calls allowed to succeed before entries start failing
    deletes_before_failure: Option<usize>,
    /// Send calls allowed to succeed before entries start failing
    sends_before_failure: Option<usize>,
}

impl Faults {
    fn should_fail(budget: &mut Option<usize>) -> bool {
        match budget {
            Some(0) => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        }
    }
}

fn reject_all(ids: impl Iterator<Item = String>, code: &str) -> BatchOutcome {
    BatchOutcome {
        successful: Vec::new(),
        failed: ids
            .map(|id| BatchFailure {
                id,
                code: code.to_string(),
                message: "injected failure".to_string(),
                sender_fault: false,
            })
            .collect(),
    }
}

/// Queue client that records every call and can inject batch failures
#[derive(Clone)]
#[allow(dead_code)]
pub struct RecordingClient {
    inner: Arc<InMemoryProvider>,
    calls: Arc<Mutex<CallLog>>,
    faults: Arc<Mutex<Faults>>,
}

#[allow(dead_code)]
impl RecordingClient {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryProvider::default()),
            calls: Arc::new(Mutex::new(CallLog::default())),
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    /// Underlying provider, for seeding and inspection
    pub fn provider(&self) -> &InMemoryProvider {
        &self.inner
    }

    /// Enqueue `count` well-formed messages on the source queue
    pub fn seed_source(&self, count: usize) {
        for i in 0..count {
            self.inner.enqueue(&source_queue(), &body(i)).unwrap();
        }
    }

    pub fn push_raw(&self, raw: RawMessage) {
        self.inner.push_raw(&source_queue(), raw).unwrap();
    }

    /// Make every delete after the first `successful` calls fail
    pub fn fail_deletes_after(&self, successful: usize) {
        self.faults.lock().unwrap().deletes_before_failure = Some(successful);
    }

    /// Make every send after the first `successful` calls fail
    pub fn fail_sends_after(&self, successful: usize) {
        self.faults.lock().unwrap().sends_before_failure = Some(successful);
    }

    pub fn receive_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().receive_sizes.clone()
    }

    pub fn send_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().send_sizes.clone()
    }

    pub fn delete_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().delete_sizes.clone()
    }

    pub fn total_calls(&self) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.receive_sizes.len() + calls.send_sizes.len() + calls.delete_sizes.len()
    }

    pub fn source_count(&self) -> usize {
        self.inner.message_count(&source_queue())
    }

    pub fn destination_bodies(&self) -> Vec<String> {
        self.inner.visible_bodies(&destination_queue())
    }
}

#[async_trait]
impl QueueClient for RecordingClient {
    async fn receive_messages(
        &self,
        queue: &QueueUrl,
        request: &ReceiveRequest,
    ) -> Result<Vec<RawMessage>, QueueError> {
        let received = self.inner.receive_messages(queue, request).await?;
        self.calls.lock().unwrap().receive_sizes.push(received.len());
        Ok(received)
    }

    async fn delete_message(
        &self,
        queue: &QueueUrl,
        receipt: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        self.calls.lock().unwrap().delete_sizes.push(1);
        self.inner.delete_message(queue, receipt).await
    }

    async fn delete_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[DeleteEntry],
    ) -> Result<BatchOutcome, QueueError> {
        self.calls.lock().unwrap().delete_sizes.push(entries.len());

        if Faults::should_fail(&mut self.faults.lock().unwrap().deletes_before_failure) {
            return Ok(reject_all(
                entries.iter().map(|e| e.id.clone()),
                "ReceiptHandleIsInvalid",
            ));
        }

        self.inner.delete_message_batch(queue, entries).await
    }

    async fn send_message_batch(
        &self,
        queue: &QueueUrl,
        entries: &[SendEntry],
    ) -> Result<BatchOutcome, QueueError> {
        self.calls.lock().unwrap().send_sizes.push(entries.len());

        if Faults::should_fail(&mut self.faults.lock().unwrap().sends_before_failure) {
            return Ok(reject_all(
                entries.iter().map(|e| e.id.clone()),
                "InternalError",
            ));
        }

        self.inner.send_message_batch(queue, entries).await
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
