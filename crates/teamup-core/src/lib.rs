//! Shared configuration, error types and logging setup for the Teamup
//! schedule workspace.

pub mod config;
pub mod error;

pub use config::{Config, StorageConfig, TeamupConfig, ValidationResult, TEAMUP_API_BASE};
pub use error::{ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt};

use anyhow::Result;

/// Initialize logging for the process.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Teamup core initialized");
    Ok(())
}
