//! Tests for the batch forwarder.

use super::*;
use futures::stream;
use queue_runtime::{InMemoryConfig, InMemoryProvider, QueueError, RawMessage};

fn destination() -> QueueUrl {
    QueueUrl::new("http://localhost:4566/000000000000/orders".to_string()).unwrap()
}

fn message(i: usize) -> ReceivedMessage {
    ReceivedMessage::try_from(
        RawMessage::new(&format!("id-{}", i), &format!("receipt-{}", i), &format!("body {}", i))
            .with_attribute("SenderId", "AIDAEXAMPLE"),
    )
    .unwrap()
}

fn messages(n: usize) -> impl Stream<Item = Result<ReceivedMessage, RedriveError>> {
    stream::iter((0..n).map(|i| Ok(message(i))))
}

// ============================================================================
// Construction Tests
// ============================================================================

mod construction_tests {
    use super::*;

    /// Verify chunk sizes outside 1..=10 are rejected before any I/O
    #[test]
    fn test_chunk_size_bounds() {
        let provider = Arc::new(InMemoryProvider::default());

        assert!(matches!(
            BatchForwarder::new(provider.clone(), destination(), 0),
            Err(RedriveError::Validation(_))
        ));
        assert!(matches!(
            BatchForwarder::new(provider.clone(), destination(), 11),
            Err(RedriveError::Validation(_))
        ));
        assert!(BatchForwarder::new(provider.clone(), destination(), 1).is_ok());
        assert!(BatchForwarder::new(provider.clone(), destination(), 10).is_ok());
        assert_eq!(provider.operation_counts().total(), 0);
    }
}

// ============================================================================
// Forwarding Tests
// ============================================================================

mod forwarding_tests {
    use super::*;

    /// Verify 23 messages go out as batches of 10, 10 and 3 in order
    #[tokio::test]
    async fn test_forward_in_full_batches() {
        let provider = Arc::new(InMemoryProvider::default());
        let forwarder = BatchForwarder::new(provider.clone(), destination(), 10).unwrap();

        let report = forwarder.forward(messages(23)).await.unwrap();

        assert_eq!(report, ForwardReport { batches: 3, messages: 23 });
        assert_eq!(provider.operation_counts().send_calls, 3);

        let bodies = provider.visible_bodies(&destination());
        assert_eq!(bodies.len(), 23);
        assert_eq!(bodies[0], "body 0");
        assert_eq!(bodies[22], "body 22");
    }

    #[tokio::test]
    async fn test_forward_empty_stream_sends_nothing() {
        let provider = Arc::new(InMemoryProvider::default());
        let forwarder = BatchForwarder::new(provider.clone(), destination(), 10).unwrap();

        let report = forwarder.forward(messages(0)).await.unwrap();

        assert_eq!(report, ForwardReport::default());
        assert_eq!(provider.operation_counts().send_calls, 0);
    }

    #[tokio::test]
    async fn test_forward_with_small_chunks() {
        let provider = Arc::new(InMemoryProvider::default());
        let forwarder = BatchForwarder::new(provider.clone(), destination(), 3).unwrap();

        let report = forwarder.forward(messages(7)).await.unwrap();

        assert_eq!(report, ForwardReport { batches: 3, messages: 7 });
    }

    /// Only the body survives; attributes and source IDs are dropped
    #[tokio::test]
    async fn test_forward_carries_body_only() {
        let provider = Arc::new(InMemoryProvider::default());
        let forwarder = BatchForwarder::new(provider.clone(), destination(), 10).unwrap();
        forwarder.forward(messages(1)).await.unwrap();

        let raw = provider
            .receive_messages(&destination(), &queue_runtime::ReceiveRequest::default())
            .await
            .unwrap()
            .remove(0);

        assert_eq!(raw.body.as_deref(), Some("body 0"));
        assert_ne!(raw.message_id.as_deref(), Some("id-0"));
        assert!(!raw.attributes.contains_key("SenderId"));
    }
}

// ============================================================================
// Failure Tests
// ============================================================================

mod failure_tests {
    use super::*;

    /// Verify rejected entries surface as PartialSend and stop the run
    #[tokio::test]
    async fn test_partial_send_aborts() {
        let provider = Arc::new(InMemoryProvider::new(InMemoryConfig {
            max_queue_size: 12,
            ..InMemoryConfig::default()
        }));
        let forwarder = BatchForwarder::new(provider.clone(), destination(), 10).unwrap();

        let result = forwarder.forward(messages(30)).await;

        match result {
            Err(RedriveError::PartialSend {
                destination: queue,
                sent,
                failed,
            }) => {
                assert_eq!(queue, destination().to_string());
                assert_eq!(sent, 2);
                assert_eq!(failed.len(), 8);
                assert!(failed.iter().all(|f| f.code == "QueueFull"));
            }
            other => panic!("expected PartialSend, got {:?}", other),
        }
        assert_eq!(provider.operation_counts().send_calls, 2);
    }

    /// Messages accepted before a stream error are still sent
    #[tokio::test]
    async fn test_stream_error_flushes_partial_chunk() {
        let provider = Arc::new(InMemoryProvider::default());
        let forwarder = BatchForwarder::new(provider.clone(), destination(), 10).unwrap();
        let failing = stream::iter(vec![
            Ok(message(0)),
            Ok(message(1)),
            Err(RedriveError::Queue(QueueError::ConnectionFailed {
                message: "reset".to_string(),
            })),
        ]);

        let result = forwarder.forward(failing).await;

        assert!(matches!(result, Err(RedriveError::Queue(_))));
        assert_eq!(provider.visible_bodies(&destination()), vec!["body 0", "body 1"]);
    }
}
