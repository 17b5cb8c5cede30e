//! # Rotator Configuration
//!
//! Settings loaded from the Lambda function's environment variables.

use crate::constants::{
    DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL, DEFAULT_PASSWORD_LENGTH, DEFAULT_RDS_SETTLE_POLL_SECS,
    DEFAULT_RDS_SETTLE_TIMEOUT_SECS, MAX_PASSWORD_LENGTH,
};
use crate::provider::aws::SettleTiming;
use crate::rotation::PasswordPolicy;
use anyhow::{bail, Result};
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line (CloudWatch)
    Json,
    /// Human-readable lines for local runs
    Text,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            other => bail!("Unknown LOG_FORMAT '{other}', expected 'json' or 'text'"),
        }
    }
}

/// Rotator configuration
///
/// Every setting has a default and can be overridden via environment variables
/// on the function.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Generated password length
    pub password_length: usize,
    /// AWS region; falls back to the SDK default chain when unset
    pub aws_region: Option<String>,
    /// Secrets Manager endpoint override (local stack or mock server)
    pub secrets_manager_endpoint: Option<String>,
    /// RDS endpoint override (local stack or mock server)
    pub rds_endpoint: Option<String>,
    /// Upper bound on waiting for RDS to apply a new password, in seconds
    pub rds_settle_timeout_secs: u64,
    /// Interval between RDS status polls, in seconds
    pub rds_settle_poll_secs: u64,
    /// Log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            password_length: DEFAULT_PASSWORD_LENGTH,
            aws_region: None,
            secrets_manager_endpoint: None,
            rds_endpoint: None,
            rds_settle_timeout_secs: DEFAULT_RDS_SETTLE_TIMEOUT_SECS,
            rds_settle_poll_secs: DEFAULT_RDS_SETTLE_POLL_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            log_enable_color: false,
        }
    }
}

impl RotationConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            password_length: var_or_default(&lookup, "PASSWORD_LENGTH", DEFAULT_PASSWORD_LENGTH),
            aws_region: var_non_empty(&lookup, "AWS_REGION"),
            secrets_manager_endpoint: var_non_empty(&lookup, "SECRETS_MANAGER_ENDPOINT"),
            rds_endpoint: var_non_empty(&lookup, "RDS_ENDPOINT"),
            rds_settle_timeout_secs: var_or_default(
                &lookup,
                "RDS_SETTLE_TIMEOUT_SECS",
                DEFAULT_RDS_SETTLE_TIMEOUT_SECS,
            ),
            rds_settle_poll_secs: var_or_default(
                &lookup,
                "RDS_SETTLE_POLL_SECS",
                DEFAULT_RDS_SETTLE_POLL_SECS,
            ),
            log_level: var_or_default_str(&lookup, "LOG_LEVEL", DEFAULT_LOG_LEVEL),
            log_format: var_or_default_str(&lookup, "LOG_FORMAT", DEFAULT_LOG_FORMAT),
            log_enable_color: var_or_default_bool(&lookup, "LOG_ENABLE_COLOR", false),
        }
    }

    /// Reject settings the rotator cannot run with
    ///
    /// # Errors
    ///
    /// Fails on a password length outside `1..=MAX_PASSWORD_LENGTH`, a zero
    /// RDS poll interval, or an unknown log format.
    pub fn validate(&self) -> Result<()> {
        if self.password_length == 0 {
            bail!("PASSWORD_LENGTH must be greater than zero");
        }
        if self.password_length > MAX_PASSWORD_LENGTH {
            bail!(
                "PASSWORD_LENGTH {} exceeds the RDS master password limit of {MAX_PASSWORD_LENGTH}",
                self.password_length
            );
        }
        if self.rds_settle_poll_secs == 0 {
            bail!("RDS_SETTLE_POLL_SECS must be greater than zero");
        }
        self.log_format()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when `log_format` is neither `json` nor `text`.
    pub fn log_format(&self) -> Result<LogFormat> {
        self.log_format.parse()
    }

    #[must_use]
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::new(self.password_length)
    }

    #[must_use]
    pub fn settle_timing(&self) -> SettleTiming {
        SettleTiming {
            max_wait: Duration::from_secs(self.rds_settle_timeout_secs),
            poll_interval: Duration::from_secs(self.rds_settle_poll_secs),
        }
    }
}

/// Read a variable and parse it, falling back to `default` when unset or invalid
fn var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a variable as boolean or return default
fn var_or_default_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

fn var_or_default_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn var_non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}
