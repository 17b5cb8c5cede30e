//! # Rotation
//!
//! The four-step rotation state machine and the types it exchanges with the
//! orchestrator.
//!
//! Steps arrive one per invocation, in order, for a given request token:
//!
//! 1. `createSecret` - stage a new `AWSPENDING` version with a fresh password
//! 2. `setSecret` - push the pending password to the database instance
//! 3. `testSecret` - check the pending credentials against the instance
//! 4. `finishSecret` - move `AWSCURRENT` to the pending version
//!
//! No state is carried between invocations; every step re-reads what it needs
//! from the secret store.

mod coordinator;
mod password;
mod record;

pub use coordinator::RotationCoordinator;
pub use password::PasswordPolicy;
pub use record::{RecordError, SecretRecord};

use crate::constants::STEP_COMPLETED_MESSAGE;
use crate::error::RotationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single phase of a rotation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationStep {
    CreateSecret,
    SetSecret,
    TestSecret,
    FinishSecret,
}

impl RotationStep {
    /// Wire name used by the orchestrator
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateSecret => "createSecret",
            Self::SetSecret => "setSecret",
            Self::TestSecret => "testSecret",
            Self::FinishSecret => "finishSecret",
        }
    }
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationStep {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createSecret" => Ok(Self::CreateSecret),
            "setSecret" => Ok(Self::SetSecret),
            "testSecret" => Ok(Self::TestSecret),
            "finishSecret" => Ok(Self::FinishSecret),
            other => Err(RotationError::InvalidStep(other.to_string())),
        }
    }
}

/// Rotation request as delivered by Secrets Manager.
///
/// The step stays a raw string so an unknown value is reported as
/// `InvalidStep` by the coordinator rather than as a deserialisation failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RotationEvent {
    #[serde(rename = "SecretId", alias = "secretId")]
    pub secret_id: String,
    #[serde(
        rename = "ClientRequestToken",
        alias = "clientRequestToken",
        alias = "requestToken"
    )]
    pub client_request_token: String,
    #[serde(rename = "Step", alias = "step")]
    pub step: String,
}

impl RotationEvent {
    #[must_use]
    pub fn new(secret_id: &str, client_request_token: &str, step: &str) -> Self {
        Self {
            secret_id: secret_id.to_string(),
            client_request_token: client_request_token.to_string(),
            step: step.to_string(),
        }
    }
}

/// Uniform success result returned by every step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationResponse {
    pub status_code: u16,
    /// JSON-encoded string
    pub body: String,
}

impl RotationResponse {
    #[must_use]
    pub fn completed() -> Self {
        Self {
            status_code: 200,
            body: serde_json::Value::from(STEP_COMPLETED_MESSAGE).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RotationErrorKind;
    use serde_json::json;

    #[test]
    fn test_step_parsing() {
        for step in [
            RotationStep::CreateSecret,
            RotationStep::SetSecret,
            RotationStep::TestSecret,
            RotationStep::FinishSecret,
        ] {
            assert_eq!(step.as_str().parse::<RotationStep>().ok(), Some(step));
        }
    }

    #[test]
    fn test_unknown_step_is_invalid_step() {
        let err = "bogusStep".parse::<RotationStep>().unwrap_err();
        assert_eq!(err.kind(), RotationErrorKind::InvalidStep);

        // Step names are case sensitive on the wire
        assert!("CreateSecret".parse::<RotationStep>().is_err());
    }

    #[test]
    fn test_event_from_secrets_manager_payload() {
        let event: RotationEvent = serde_json::from_value(json!({
            "SecretId": "arn:aws:secretsmanager:us-east-1:123456789012:secret:S1-abc123",
            "ClientRequestToken": "T1",
            "Step": "createSecret"
        }))
        .unwrap();

        assert_eq!(
            event,
            RotationEvent::new(
                "arn:aws:secretsmanager:us-east-1:123456789012:secret:S1-abc123",
                "T1",
                "createSecret"
            )
        );
    }

    #[test]
    fn test_event_accepts_camel_case_aliases() {
        let event: RotationEvent = serde_json::from_value(json!({
            "secretId": "S1",
            "requestToken": "T1",
            "step": "setSecret"
        }))
        .unwrap();

        assert_eq!(event, RotationEvent::new("S1", "T1", "setSecret"));
    }

    #[test]
    fn test_completed_response_shape() {
        let response = serde_json::to_value(RotationResponse::completed()).unwrap();
        assert_eq!(
            response,
            json!({
                "statusCode": 200,
                "body": "\"Rotation step completed successfully\""
            })
        );
    }
}
