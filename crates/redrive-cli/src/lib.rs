//! # SQS Redrive CLI
//!
//! Command-line interface for moving every message from one SQS queue to
//! another, typically from a dead-letter queue back to the queue it serves.
//!
//! This module provides:
//! - Argument parsing for the `sqs-redrive` binary
//! - Layered configuration loading
//! - Logging initialization
//! - Mapping of run failures to process exit codes

use clap::Parser;
use queue_runtime::{QueueClientFactory, QueueUrl, ValidationError};
use redrive_core::{
    ensure_distinct, normalize_cap, RedriveConfig, RedriveError, RedriveSummary, TransferSession,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// System-wide configuration file, loaded when present
pub const SYSTEM_CONFIG_PATH: &str = "/etc/sqs-redrive/redrive.yaml";

/// Prefix of configuration environment variables, e.g. `REDRIVE__CHUNK_SIZE`
pub const ENV_PREFIX: &str = "REDRIVE";

// ============================================================================
// CLI Structure
// ============================================================================

/// SQS Redrive - move messages between SQS queues
#[derive(Parser, Debug)]
#[command(name = "sqs-redrive")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Move messages from one SQS queue to another")]
#[command(
    long_about = "Drains the source queue and re-publishes every message body to the destination queue, deleting each message from the source once it has been taken for forwarding"
)]
pub struct Cli {
    /// URL of the queue to drain
    #[arg(short = 's', long = "src-url")]
    pub src_url: QueueUrl,

    /// URL of the queue to publish to
    #[arg(short = 'd', long = "dst-url")]
    pub dst_url: QueueUrl,

    /// Maximum number of messages to move; zero or negative means all
    #[arg(short = 'm', long = "max-msg", allow_negative_numbers = true)]
    pub max_msg: Option<i64>,

    /// AWS region; inferred from the source URL when omitted
    #[arg(short, long)]
    pub region: Option<String>,

    /// Override of the SQS endpoint, e.g. http://localhost:4566
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "REDRIVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level, used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Logging initialization failed: {message}")]
    Logging { message: String },

    #[error(transparent)]
    Redrive(#[from] RedriveError),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 2,
            Self::Logging { .. } => 1,
            Self::Redrive(e) => match e {
                RedriveError::Configuration(_) | RedriveError::Validation(_) => 2,
                RedriveError::SameQueue { .. } => 3,
                RedriveError::PartialDelete { .. } => 4,
                RedriveError::PartialSend { .. } => 5,
                RedriveError::Queue(_) => 6,
            },
        }
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// ============================================================================
// Configuration Loading
// ============================================================================

/// Settings taken from the standard AWS environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsEnvironment {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl AwsEnvironment {
    /// Read `AWS_*` variables from the process environment
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            region: var("AWS_REGION").or_else(|| var("AWS_DEFAULT_REGION")),
            endpoint_url: var("AWS_ENDPOINT_URL_SQS").or_else(|| var("AWS_ENDPOINT_URL")),
            access_key_id: var("AWS_ACCESS_KEY_ID"),
            secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            session_token: var("AWS_SESSION_TOKEN"),
        }
    }

    /// Fill fields the configuration left unset
    fn apply_to(&self, config: &mut RedriveConfig) {
        fn fill(target: &mut Option<String>, fallback: &Option<String>) {
            if target.is_none() {
                target.clone_from(fallback);
            }
        }

        fill(&mut config.region, &self.region);
        fill(&mut config.endpoint_url, &self.endpoint_url);
        fill(&mut config.access_key_id, &self.access_key_id);
        fill(&mut config.secret_access_key, &self.secret_access_key);
        fill(&mut config.session_token, &self.session_token);
    }
}

/// Load configuration for a run
///
/// Sources (applied in order, later sources override earlier ones):
///  1. `/etc/sqs-redrive/redrive.yaml`, when present
///  2. The file given by `--config` / `REDRIVE_CONFIG`
///  3. Environment variables prefixed `REDRIVE__`
///  4. Standard `AWS_*` variables, for fields still unset
///  5. Command-line flags
pub fn load_configuration(cli: &Cli) -> Result<RedriveConfig, ConfigError> {
    load_configuration_from(
        cli,
        Path::new(SYSTEM_CONFIG_PATH),
        environment_layer(),
        &AwsEnvironment::from_env(),
    )
}

/// `REDRIVE__*` variables, e.g. `REDRIVE__CHUNK_SIZE=5`
fn environment_layer() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).separator("__")
}

fn load_configuration_from(
    cli: &Cli,
    system_path: &Path,
    environment: config::Environment,
    aws: &AwsEnvironment,
) -> Result<RedriveConfig, ConfigError> {
    let mut builder = config::Config::builder().add_source(
        config::File::from(system_path)
            .required(false)
            .format(config::FileFormat::Yaml),
    );

    if let Some(ref path) = cli.config {
        if !path.exists() {
            return Err(ConfigError::FileNotFound { path: path.clone() });
        }
        builder = builder.add_source(config::File::from(path.as_path()).required(true));
        info!(path = %path.display(), "Loading configuration from explicit path");
    }

    let mut config: RedriveConfig = builder
        .add_source(environment)
        .build()?
        .try_deserialize()?;

    aws.apply_to(&mut config);

    if let Some(ref region) = cli.region {
        config.region = Some(region.clone());
    }
    if let Some(ref endpoint_url) = cli.endpoint_url {
        config.endpoint_url = Some(endpoint_url.clone());
    }

    config.validate()?;
    Ok(config)
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<RedriveSummary, CliError> {
    let cli = Cli::parse();

    // Initialize logging
    initialize_logging(&cli)?;

    execute(cli).await
}

/// Run a redrive for parsed arguments
///
/// Identical queues are rejected before configuration is loaded or any
/// client is created.
pub async fn execute(cli: Cli) -> Result<RedriveSummary, CliError> {
    ensure_distinct(&cli.src_url, &cli.dst_url)?;

    let config = load_configuration(&cli)?;
    let provider_config = config.provider_config(&cli.src_url)?;
    let client = QueueClientFactory::create_client(provider_config)
        .await
        .map_err(RedriveError::from)?;

    let cap = normalize_cap(cli.max_msg);
    let summary = TransferSession::from_config(client, cli.src_url, cli.dst_url, &config)?
        .with_cap(cap)
        .run()
        .await?;

    Ok(summary)
}

/// Initialize logging based on CLI arguments
///
/// `RUST_LOG` takes precedence over `--log-level`. Logs go to stderr.
pub fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })?;

    let json_layer = cli
        .json_logs
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!cli.json_logs).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })
}
