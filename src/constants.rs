//! # Constants
//!
//! Shared constants used throughout the rotator.
//!
//! Defaults here can be overridden via environment variables where
//! `RotationConfig` exposes a setting.

/// Staging label of the authoritative secret version
pub const AWS_CURRENT: &str = "AWSCURRENT";

/// Staging label of the version created by an in-flight rotation
pub const AWS_PENDING: &str = "AWSPENDING";

/// Staging label Secrets Manager moves to the demoted version on promotion
pub const AWS_PREVIOUS: &str = "AWSPREVIOUS";

/// Record field holding the RDS instance identifier
pub const DB_INSTANCE_IDENTIFIER_FIELD: &str = "dbInstanceIdentifier";

/// Record field holding the master password
pub const PASSWORD_FIELD: &str = "password";

/// Default generated password length
pub const DEFAULT_PASSWORD_LENGTH: usize = 32;

/// Longest accepted password length.
/// MySQL and MariaDB cap RDS master passwords at 41 characters.
pub const MAX_PASSWORD_LENGTH: usize = 41;

/// Punctuation allowed in generated passwords.
/// RDS rejects `/`, `'`, `"`, `@` and space in master passwords.
pub const PASSWORD_PUNCTUATION: &str = "!#$%^&*()_+-=[]{}|";

/// Body returned to the orchestrator for every successful step
pub const STEP_COMPLETED_MESSAGE: &str = "Rotation step completed successfully";

/// RDS instance status once a credential change has been applied
pub const RDS_STATUS_AVAILABLE: &str = "available";

/// RDS instance statuses a pending password can never settle from
pub const RDS_UNRECOVERABLE_STATUSES: &[&str] = &[
    "deleted",
    "deleting",
    "failed",
    "incompatible-parameters",
    "incompatible-restore",
];

/// Default upper bound on waiting for a password change to settle, in seconds
pub const DEFAULT_RDS_SETTLE_TIMEOUT_SECS: u64 = 240;

/// Default interval between `DescribeDBInstances` polls, in seconds
pub const DEFAULT_RDS_SETTLE_POLL_SECS: u64 = 10;

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Default log format (CloudWatch ingests JSON lines)
pub const DEFAULT_LOG_FORMAT: &str = "json";
