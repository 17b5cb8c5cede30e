//! # Rotation Coordinator
//!
//! Runs one rotation step per invocation against injected collaborators.
//!
//! Every invocation, whatever the step:
//! - rejects secrets with rotation explicitly disabled
//! - reads and parses the `AWSCURRENT` version
//! - requires `dbInstanceIdentifier` in the current record
//!
//! Only then is the step name dispatched. Each step fetches what it needs from
//! the store by secret id and request token, so steps may run in separate
//! processes.

use super::{PasswordPolicy, RotationEvent, RotationResponse, RotationStep, SecretRecord};
use crate::constants::{AWS_CURRENT, AWS_PENDING};
use crate::error::RotationError;
use crate::provider::{CredentialTester, DatabaseAdmin, SecretStore, VersionSelector};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, field, info, info_span, warn, Instrument};
use zeroize::Zeroizing;

pub struct RotationCoordinator {
    secret_store: Arc<dyn SecretStore>,
    database_admin: Arc<dyn DatabaseAdmin>,
    credential_tester: Arc<dyn CredentialTester>,
    password_policy: PasswordPolicy,
}

impl std::fmt::Debug for RotationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationCoordinator")
            .field("password_policy", &self.password_policy)
            .finish_non_exhaustive()
    }
}

/// Current version of the secret, read at the start of every step
struct CurrentVersion {
    version_id: String,
    record: SecretRecord,
    instance_id: String,
}

impl RotationCoordinator {
    #[must_use]
    pub fn new(
        secret_store: Arc<dyn SecretStore>,
        database_admin: Arc<dyn DatabaseAdmin>,
        credential_tester: Arc<dyn CredentialTester>,
        password_policy: PasswordPolicy,
    ) -> Self {
        Self {
            secret_store,
            database_admin,
            credential_tester,
            password_policy,
        }
    }

    /// Handle one rotation step.
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered; nothing is retried locally.
    pub async fn handle(&self, event: &RotationEvent) -> Result<RotationResponse, RotationError> {
        let span = info_span!(
            "rotation.step",
            secret.id = %event.secret_id,
            step = %event.step,
            token = %event.client_request_token,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let result = self.run_step(event).await;

            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);
            span_clone.record("operation.success", result.is_ok());
            if let Err(e) = &result {
                error!(
                    secret_id = %event.secret_id,
                    step = %event.step,
                    error.kind = e.kind().as_str(),
                    error = %e,
                    "Rotation step failed"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_step(&self, event: &RotationEvent) -> Result<RotationResponse, RotationError> {
        let secret_id = event.secret_id.as_str();
        let token = event.client_request_token.as_str();

        let current = self.load_current(secret_id, token).await?;
        let step: RotationStep = event.step.parse()?;

        match step {
            RotationStep::CreateSecret => self.create_secret(secret_id, token, &current).await?,
            RotationStep::SetSecret => self.set_secret(secret_id, token, &current).await?,
            RotationStep::TestSecret => self.test_secret(secret_id, token, &current).await?,
            RotationStep::FinishSecret => self.finish_secret(secret_id, token, &current).await?,
        }

        Ok(RotationResponse::completed())
    }

    async fn load_current(
        &self,
        secret_id: &str,
        token: &str,
    ) -> Result<CurrentVersion, RotationError> {
        let metadata = self
            .secret_store
            .describe_secret(secret_id)
            .await
            .map_err(RotationError::secret_store)?;

        if !metadata.rotation_allowed() {
            return Err(RotationError::RotationNotEnabled {
                secret_id: secret_id.to_string(),
            });
        }

        // Left behind by an abandoned rotation; staging for this token moves the label
        for (version_id, stages) in &metadata.version_ids_to_stages {
            if version_id != token && stages.iter().any(|s| s == AWS_PENDING) {
                warn!(
                    secret_id,
                    version_id = %version_id,
                    token,
                    "Another version still carries {AWS_PENDING}"
                );
            }
        }

        let current = self
            .secret_store
            .get_secret_value(secret_id, &VersionSelector::current())
            .await
            .map_err(RotationError::secret_store)?
            .ok_or_else(|| RotationError::MalformedSecret {
                secret_id: secret_id.to_string(),
                reason: format!("no {AWS_CURRENT} version"),
            })?;

        let record = SecretRecord::parse(&current.secret_string)
            .map_err(|e| e.for_secret(secret_id))?;
        let instance_id = record
            .instance_identifier()
            .map_err(|e| e.for_secret(secret_id))?
            .to_string();

        Ok(CurrentVersion {
            version_id: current.version_id,
            record,
            instance_id,
        })
    }

    async fn create_secret(
        &self,
        secret_id: &str,
        token: &str,
        current: &CurrentVersion,
    ) -> Result<(), RotationError> {
        if current.version_id == token {
            info!(
                secret_id,
                version_id = token,
                "Version is already {AWS_CURRENT}, nothing to create"
            );
            return Ok(());
        }

        // A retried createSecret must not regenerate the password
        let existing = self
            .secret_store
            .get_secret_value(secret_id, &VersionSelector::pending(token))
            .await
            .map_err(RotationError::secret_store)?;
        if existing.is_some() {
            info!(
                secret_id,
                version_id = token,
                "{AWS_PENDING} version already exists, skipping creation"
            );
            return Ok(());
        }

        let password = Zeroizing::new(self.password_policy.generate());
        let pending = current.record.with_password(&password);

        self.secret_store
            .put_secret_value(
                secret_id,
                token,
                &Zeroizing::new(pending.to_secret_string()),
                AWS_PENDING,
            )
            .await
            .map_err(RotationError::secret_store)?;

        info!(secret_id, version_id = token, "Created new secret version");
        Ok(())
    }

    async fn set_secret(
        &self,
        secret_id: &str,
        token: &str,
        current: &CurrentVersion,
    ) -> Result<(), RotationError> {
        let pending = self.load_pending(secret_id, token).await?;
        let password = pending.password().map_err(|e| e.for_secret(secret_id))?;

        self.database_admin
            .modify_instance_password(&current.instance_id, password, true)
            .await
            .map_err(RotationError::database_admin)?;

        info!(
            secret_id,
            instance_id = %current.instance_id,
            "Updated RDS instance with new password"
        );
        Ok(())
    }

    async fn test_secret(
        &self,
        secret_id: &str,
        token: &str,
        current: &CurrentVersion,
    ) -> Result<(), RotationError> {
        let pending = self.load_pending(secret_id, token).await?;

        let accepted = self
            .credential_tester
            .test_credentials(&current.instance_id, &pending)
            .await
            .map_err(RotationError::credential_tester)?;

        if !accepted {
            warn!(
                secret_id,
                instance_id = %current.instance_id,
                "Pending credentials were rejected"
            );
            return Err(RotationError::CredentialTestFailed {
                secret_id: secret_id.to_string(),
                instance_id: current.instance_id.clone(),
            });
        }

        info!(
            secret_id,
            instance_id = %current.instance_id,
            "Pending credentials accepted"
        );
        Ok(())
    }

    async fn finish_secret(
        &self,
        secret_id: &str,
        token: &str,
        current: &CurrentVersion,
    ) -> Result<(), RotationError> {
        if current.version_id == token {
            info!(secret_id, version_id = token, "Version is already {AWS_CURRENT}");
            return Ok(());
        }

        self.secret_store
            .update_version_stage(secret_id, AWS_CURRENT, token, &current.version_id)
            .await
            .map_err(RotationError::secret_store)?;

        info!(
            secret_id,
            version_id = token,
            previous_version_id = %current.version_id,
            "Finished rotation, moved {AWS_CURRENT} to new version"
        );
        Ok(())
    }

    async fn load_pending(
        &self,
        secret_id: &str,
        token: &str,
    ) -> Result<SecretRecord, RotationError> {
        let pending = self
            .secret_store
            .get_secret_value(secret_id, &VersionSelector::pending(token))
            .await
            .map_err(RotationError::secret_store)?
            .ok_or_else(|| RotationError::PendingVersionNotFound {
                secret_id: secret_id.to_string(),
                token: token.to_string(),
            })?;

        SecretRecord::parse(&pending.secret_string).map_err(|e| e.for_secret(secret_id))
    }
}
