use redrive_cli::{run_cli, CliError};
use tracing::error;

#[tokio::main]
async fn main() {
    // Run CLI and handle errors
    if let Err(e) = run_cli().await {
        match e {
            // No subscriber to report through
            CliError::Logging { .. } => eprintln!("sqs-redrive: {}", e),
            _ => error!("Redrive failed: {}", e),
        }

        std::process::exit(e.exit_code());
    }
}
