//! # Provider Modules
//!
//! Interfaces to the external services the rotation coordinator drives.
//!
//! - `SecretStore` for versioned, stage-labelled secrets
//! - `DatabaseAdmin` for master password changes
//! - `CredentialTester` for checking pending credentials against an instance
//!
//! The coordinator only ever sees these traits, so tests and local runs can
//! swap in the in-memory implementations from [`memory`].

use crate::constants::{AWS_CURRENT, AWS_PENDING};
use crate::rotation::SecretRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Secret metadata as returned by `DescribeSecret`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretMetadata {
    /// `None` when the store does not report the flag
    pub rotation_enabled: Option<bool>,
    pub version_ids_to_stages: HashMap<String, Vec<String>>,
}

impl SecretMetadata {
    /// Only an explicit `false` disables rotation
    #[must_use]
    pub fn rotation_allowed(&self) -> bool {
        self.rotation_enabled != Some(false)
    }
}

/// One version of a secret as returned by `GetSecretValue`
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    pub version_id: String,
    pub secret_string: String,
    pub version_stages: Vec<String>,
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretValue")
            .field("version_id", &self.version_id)
            .field("version_stages", &self.version_stages)
            .finish_non_exhaustive()
    }
}

/// Which version of a secret to read.
///
/// With both fields set the version must carry the stage. With neither set
/// the store resolves `AWSCURRENT`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSelector {
    pub version_id: Option<String>,
    pub version_stage: Option<String>,
}

impl VersionSelector {
    #[must_use]
    pub fn current() -> Self {
        Self {
            version_id: None,
            version_stage: Some(AWS_CURRENT.to_string()),
        }
    }

    /// The `AWSPENDING` version created for `token`
    #[must_use]
    pub fn pending(token: &str) -> Self {
        Self {
            version_id: Some(token.to_string()),
            version_stage: Some(AWS_PENDING.to_string()),
        }
    }
}

/// Versioned secret store (AWS Secrets Manager or a stand-in)
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretMetadata>;

    /// Read one version of a secret.
    /// Returns `Ok(None)` when the secret or the selected version does not exist.
    async fn get_secret_value(
        &self,
        secret_id: &str,
        selector: &VersionSelector,
    ) -> Result<Option<SecretValue>>;

    /// Store a new version identified by `client_request_token` and label it
    /// `version_stage`.
    ///
    /// Repeating the call with the same token and content is a no-op; the same
    /// token with different content is an error.
    async fn put_secret_value(
        &self,
        secret_id: &str,
        client_request_token: &str,
        secret_string: &str,
        version_stage: &str,
    ) -> Result<()>;

    /// Atomically move `version_stage` from `remove_from_version_id` to
    /// `move_to_version_id`. No intermediate state is observable.
    async fn update_version_stage(
        &self,
        secret_id: &str,
        version_stage: &str,
        move_to_version_id: &str,
        remove_from_version_id: &str,
    ) -> Result<()>;
}

/// Database control plane (Amazon RDS or a stand-in)
#[async_trait]
pub trait DatabaseAdmin: Send + Sync {
    async fn modify_instance_password(
        &self,
        instance_id: &str,
        new_password: &str,
        apply_immediately: bool,
    ) -> Result<()>;
}

/// Checks whether a set of credentials is accepted by an instance.
/// `Ok(false)` means the credentials were rejected; `Err` means the check
/// itself could not run.
#[async_trait]
pub trait CredentialTester: Send + Sync {
    async fn test_credentials(&self, instance_id: &str, credentials: &SecretRecord)
        -> Result<bool>;
}

pub mod aws;
pub mod memory;
