//! Runtime configuration for a redrive run.
//!
//! [`RedriveConfig`] is deserialized from layered sources by the binary and
//! passed explicitly into session construction. Nothing here reads the
//! environment or the filesystem.

use crate::error::{RedriveError, RedriveResult};
use queue_runtime::{
    AwsSqsConfig, ConfigurationError, ProviderConfig, QueueUrl, ReceiveRequest, ValidationError,
    MAX_BATCH_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Longest receive long-poll SQS accepts
pub const MAX_WAIT_SECONDS: u32 = 20;

/// Settings shared by every component of a run
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedriveConfig {
    /// AWS region; inferred from the source URL when absent
    pub region: Option<String>,
    /// Override of the regional SQS endpoint
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// Receive long-poll duration in seconds
    pub wait_seconds: u32,
    /// Messages per send-batch call
    pub chunk_size: usize,
    pub request_timeout_seconds: u64,
}

impl Default for RedriveConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            wait_seconds: 1,
            chunk_size: MAX_BATCH_SIZE,
            request_timeout_seconds: 30,
        }
    }
}

impl RedriveConfig {
    /// Check value bounds
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] if `chunk_size` is outside
    /// `1..=10` or `wait_seconds` exceeds 20.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.chunk_size) {
            return Err(ValidationError::OutOfRange {
                field: "chunk_size".to_string(),
                message: format!(
                    "{} is not between 1 and {}",
                    self.chunk_size, MAX_BATCH_SIZE
                ),
            });
        }

        if self.wait_seconds > MAX_WAIT_SECONDS {
            return Err(ValidationError::OutOfRange {
                field: "wait_seconds".to_string(),
                message: format!(
                    "{} is not between 0 and {}",
                    self.wait_seconds, MAX_WAIT_SECONDS
                ),
            });
        }

        Ok(())
    }

    /// Region to use for the given source queue
    pub fn resolve_region(&self, source: &QueueUrl) -> Option<String> {
        self.region
            .clone()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| source.region_hint())
    }

    /// Receive request template for the drainer
    pub fn receive_request(&self) -> ReceiveRequest {
        ReceiveRequest::default().with_wait_seconds(self.wait_seconds)
    }

    /// Build the queue provider configuration for a run against `source`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the region cannot be determined or
    /// if only half of a static credential pair is present, and a validation
    /// error if [`validate`](Self::validate) fails.
    pub fn provider_config(&self, source: &QueueUrl) -> RedriveResult<ProviderConfig> {
        self.validate()?;

        let region = self.resolve_region(source).ok_or_else(|| {
            RedriveError::from(ConfigurationError::Missing {
                key: "region".to_string(),
            })
        })?;

        let mut aws = AwsSqsConfig::new(&region);
        aws.request_timeout_seconds = self.request_timeout_seconds;

        match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                aws = aws.with_credentials(access_key, secret_key);
                aws.session_token = self.session_token.clone();
            }
            (None, None) => {
                return Err(ConfigurationError::Missing {
                    key: "access_key_id".to_string(),
                }
                .into())
            }
            (Some(_), None) => {
                return Err(ConfigurationError::Missing {
                    key: "secret_access_key".to_string(),
                }
                .into())
            }
            (None, Some(_)) => {
                return Err(ConfigurationError::Missing {
                    key: "access_key_id".to_string(),
                }
                .into())
            }
        }

        if let Some(ref endpoint) = self.endpoint_url {
            aws = aws.with_endpoint_url(endpoint);
        }

        Ok(ProviderConfig::AwsSqs(aws))
    }
}

impl fmt::Debug for RedriveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedriveConfig")
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
            .field("wait_seconds", &self.wait_seconds)
            .field("chunk_size", &self.chunk_size)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}
