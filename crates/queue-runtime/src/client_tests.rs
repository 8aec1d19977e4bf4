//! Tests for queue client trait and factory.

use super::*;
use crate::message::ReceivedMessage;
use crate::provider::AwsSqsConfig;

fn queue(name: &str) -> QueueUrl {
    QueueUrl::new(format!("http://localhost:4566/000000000000/{}", name)).unwrap()
}

// ============================================================================
// Contract Tests - QueueClient Trait
// ============================================================================

/// Contract test helper: sent messages can be received and deleted
async fn test_queue_client_send_receive_delete(client: &dyn QueueClient, queue: &QueueUrl) {
    // Arrange
    let entries = vec![
        SendEntry::new("first".to_string()),
        SendEntry::new("second".to_string()),
    ];

    // Act
    let sent = client.send_message_batch(queue, &entries).await.unwrap();
    let received = client
        .receive_messages(queue, &ReceiveRequest::default())
        .await
        .unwrap();

    // Assert
    assert!(sent.is_complete(), "All entries should be accepted");
    assert_eq!(received.len(), 2);

    let deletes: Vec<DeleteEntry> = received
        .into_iter()
        .map(|raw| DeleteEntry::for_message(&ReceivedMessage::try_from(raw).unwrap()))
        .collect();
    let deleted = client.delete_message_batch(queue, &deletes).await.unwrap();
    assert_eq!(deleted.successful.len(), 2);

    let after = client
        .receive_messages(queue, &ReceiveRequest::default())
        .await
        .unwrap();
    assert!(after.is_empty(), "Deleted messages must not be redelivered");
}

/// Contract test helper: oversized batches are rejected
async fn test_queue_client_rejects_oversized_batch(client: &dyn QueueClient, queue: &QueueUrl) {
    let entries: Vec<SendEntry> = (0..=client.max_batch_size())
        .map(|i| SendEntry::new(i.to_string()))
        .collect();

    let result = client.send_message_batch(queue, &entries).await;
    assert!(matches!(result, Err(QueueError::BatchTooLarge { .. })));
}

#[tokio::test]
async fn test_in_memory_client_contract() {
    let client = QueueClientFactory::create_test_client();
    test_queue_client_send_receive_delete(client.as_ref(), &queue("contract")).await;
    test_queue_client_rejects_oversized_batch(client.as_ref(), &queue("contract")).await;
}

// ============================================================================
// Factory Tests
// ============================================================================

mod factory_tests {
    use super::*;

    #[tokio::test]
    async fn test_factory_creates_in_memory_client() {
        let client = QueueClientFactory::create_client(ProviderConfig::InMemory(
            InMemoryConfig::default(),
        ))
        .await
        .unwrap();

        assert_eq!(client.provider_type(), ProviderType::InMemory);
        assert_eq!(client.max_batch_size(), 10);
    }

    #[tokio::test]
    async fn test_factory_creates_aws_client() {
        let config = AwsSqsConfig::new("us-east-1").with_credentials("AKIDEXAMPLE", "secret");
        let client = QueueClientFactory::create_client(ProviderConfig::AwsSqs(config))
            .await
            .unwrap();

        assert_eq!(client.provider_type(), ProviderType::AwsSqs);
    }

    /// Provider construction errors surface as QueueError
    #[tokio::test]
    async fn test_factory_maps_aws_configuration_errors() {
        let result =
            QueueClientFactory::create_client(ProviderConfig::AwsSqs(AwsSqsConfig::new(""))).await;

        assert!(matches!(result, Err(QueueError::ConfigurationError(_))));
    }
}
