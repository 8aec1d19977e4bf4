//! Provider types and configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    AwsSqs,
    InMemory,
}

impl ProviderType {
    /// Get maximum message size for provider
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::AwsSqs => 256 * 1024,         // 256KB
            Self::InMemory => 10 * 1024 * 1024, // 10MB
        }
    }

    /// Get maximum entries per batch call
    pub fn max_batch_size(&self) -> usize {
        match self {
            Self::AwsSqs => crate::message::MAX_BATCH_SIZE,
            Self::InMemory => crate::message::MAX_BATCH_SIZE,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwsSqs => write!(f, "AwsSqs"),
            Self::InMemory => write!(f, "InMemory"),
        }
    }
}

/// Provider-specific configuration
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    AwsSqs(AwsSqsConfig),
    InMemory(InMemoryConfig),
}

/// AWS SQS configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsSqsConfig {
    pub region: String,
    /// Override of the `https://sqs.{region}.amazonaws.com` endpoint
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub request_timeout_seconds: u64,
}

impl AwsSqsConfig {
    /// Create configuration for a region with no credentials
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            request_timeout_seconds: 30,
        }
    }

    /// Set static credentials
    pub fn with_credentials(mut self, access_key_id: &str, secret_access_key: &str) -> Self {
        self.access_key_id = Some(access_key_id.to_string());
        self.secret_access_key = Some(secret_access_key.to_string());
        self
    }

    /// Set endpoint override
    pub fn with_endpoint_url(mut self, endpoint_url: &str) -> Self {
        self.endpoint_url = Some(endpoint_url.to_string());
        self
    }
}

impl std::fmt::Debug for AwsSqsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSqsConfig")
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// In-memory provider configuration
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    pub max_queue_size: usize,
    /// How long a received message stays invisible before it can be received again
    pub visibility_timeout: Duration,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10000,
            visibility_timeout: Duration::seconds(30),
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
