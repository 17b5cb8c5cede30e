//! # Logging
//!
//! Installs the global tracing subscriber.
//!
//! `RUST_LOG` wins when set. Otherwise the rotator logs at `LOG_LEVEL` and
//! the AWS SDK crates stay at `warn`.

use crate::config::{LogFormat, RotationConfig};
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default filter directives for a log level
#[must_use]
pub fn default_directives(log_level: &str) -> String {
    let level = log_level.trim().to_lowercase();
    format!("rds_password_rotator={level},lambda_runtime={level},aws_config=warn,aws_smithy_runtime=warn")
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails on an unknown log format or when a subscriber is already installed.
pub fn init_tracing(config: &RotationConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let result = match config.log_format()? {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(config.log_enable_color)
            .with_target(true)
            .try_init(),
    };

    result.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
