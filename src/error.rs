//! # Rotation Errors
//!
//! Tagged error enumeration returned by the rotation coordinator.
//!
//! Every variant aborts the current step. Retrying is the orchestrator's job;
//! nothing here is recovered locally.

use std::fmt;
use thiserror::Error;

/// External collaborator a [`RotationError::Service`] failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    SecretStore,
    DatabaseAdmin,
    CredentialTester,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SecretStore => "secret store",
            Self::DatabaseAdmin => "database admin",
            Self::CredentialTester => "credential tester",
        })
    }
}

/// Failure category, for callers that branch on the kind of error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationErrorKind {
    RotationNotEnabled,
    MalformedSecret,
    MissingField,
    InvalidStep,
    PendingVersionNotFound,
    CredentialTestFailed,
    ServiceError,
}

impl RotationErrorKind {
    /// Stable name used in log fields
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RotationNotEnabled => "RotationNotEnabled",
            Self::MalformedSecret => "MalformedSecret",
            Self::MissingField => "MissingField",
            Self::InvalidStep => "InvalidStep",
            Self::PendingVersionNotFound => "PendingVersionNotFound",
            Self::CredentialTestFailed => "CredentialTestFailed",
            Self::ServiceError => "ServiceError",
        }
    }
}

#[derive(Debug, Error)]
pub enum RotationError {
    #[error("Secret {secret_id} is not enabled for rotation")]
    RotationNotEnabled { secret_id: String },

    #[error("Secret {secret_id} has a malformed value: {reason}")]
    MalformedSecret { secret_id: String, reason: String },

    #[error("Secret {secret_id} is missing required field '{field}'")]
    MissingField {
        secret_id: String,
        field: &'static str,
    },

    #[error("Invalid step parameter: {0}")]
    InvalidStep(String),

    #[error("Secret {secret_id} has no AWSPENDING version for token {token}")]
    PendingVersionNotFound { secret_id: String, token: String },

    #[error("Pending credentials for secret {secret_id} were rejected by instance {instance_id}")]
    CredentialTestFailed {
        secret_id: String,
        instance_id: String,
    },

    #[error("{service} call failed: {source:#}")]
    Service {
        service: Service,
        #[source]
        source: anyhow::Error,
    },
}

impl RotationError {
    #[must_use]
    pub fn kind(&self) -> RotationErrorKind {
        match self {
            Self::RotationNotEnabled { .. } => RotationErrorKind::RotationNotEnabled,
            Self::MalformedSecret { .. } => RotationErrorKind::MalformedSecret,
            Self::MissingField { .. } => RotationErrorKind::MissingField,
            Self::InvalidStep(_) => RotationErrorKind::InvalidStep,
            Self::PendingVersionNotFound { .. } => RotationErrorKind::PendingVersionNotFound,
            Self::CredentialTestFailed { .. } => RotationErrorKind::CredentialTestFailed,
            Self::Service { .. } => RotationErrorKind::ServiceError,
        }
    }

    pub(crate) fn secret_store(source: anyhow::Error) -> Self {
        Self::Service {
            service: Service::SecretStore,
            source,
        }
    }

    pub(crate) fn database_admin(source: anyhow::Error) -> Self {
        Self::Service {
            service: Service::DatabaseAdmin,
            source,
        }
    }

    pub(crate) fn credential_tester(source: anyhow::Error) -> Self {
        Self::Service {
            service: Service::CredentialTester,
            source,
        }
    }
}

/// Surfaces the error kind as the Lambda `errorType`
impl From<RotationError> for lambda_runtime::Diagnostic {
    fn from(err: RotationError) -> Self {
        Self {
            error_type: err.kind().as_str().to_string(),
            error_message: err.to_string(),
        }
    }
}
