//! # AWS Secrets Manager Operations
//!
//! Implements `SecretStore` for AWS Secrets Manager.

use super::auth;
use crate::provider::{SecretMetadata, SecretStore, SecretValue, VersionSelector};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use std::time::Instant;
use tracing::{debug, debug_span, field, info, info_span, warn, Instrument};

/// AWS Secrets Manager store implementation
pub struct AwsSecretsManager {
    client: SecretsManagerClient,
    region: String,
}

impl std::fmt::Debug for AwsSecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManager")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsSecretsManager {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig, endpoint: Option<&str>) -> Self {
        Self {
            client: auth::secrets_manager_client(sdk_config, endpoint),
            region: super::region_label(sdk_config),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManager {
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretMetadata> {
        let span = debug_span!(
            "aws.secretsmanager.describe_secret",
            secret.id = secret_id,
            region = %self.region,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let result = self.client.describe_secret().secret_id(secret_id).send().await;
            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);

            match result {
                Ok(output) => {
                    span_clone.record("operation.success", true);
                    Ok(SecretMetadata {
                        rotation_enabled: output.rotation_enabled(),
                        version_ids_to_stages: output
                            .version_ids_to_stages()
                            .cloned()
                            .unwrap_or_default(),
                    })
                }
                Err(e) => {
                    span_clone.record("operation.success", false);
                    warn!(
                        provider = "aws",
                        region = %self.region,
                        secret_id,
                        operation = "describe_secret",
                        error = %DisplayErrorContext(&e),
                        "Failed to describe AWS secret"
                    );
                    Err(anyhow!(
                        "Failed to describe AWS secret {secret_id}: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        selector: &VersionSelector,
    ) -> Result<Option<SecretValue>> {
        let span = debug_span!(
            "aws.secretsmanager.get_secret_value",
            secret.id = secret_id,
            version.id = selector.version_id.as_deref(),
            version.stage = selector.version_stage.as_deref(),
            region = %self.region,
            operation.success = field::Empty,
            operation.found = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let result = self
                .client
                .get_secret_value()
                .secret_id(secret_id)
                .set_version_id(selector.version_id.clone())
                .set_version_stage(selector.version_stage.clone())
                .send()
                .await;
            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);

            match result {
                Ok(output) => {
                    let secret_string = output
                        .secret_string()
                        .map(ToString::to_string)
                        .or_else(|| {
                            output
                                .secret_binary()
                                .map(|blob| String::from_utf8_lossy(blob.as_ref()).to_string())
                        })
                        .ok_or_else(|| {
                            span_clone.record("operation.success", false);
                            anyhow!("Secret {secret_id} has no string or binary value")
                        })?;
                    let version_id = output
                        .version_id()
                        .map(ToString::to_string)
                        .ok_or_else(|| {
                            span_clone.record("operation.success", false);
                            anyhow!("Secret {secret_id} returned no VersionId")
                        })?;

                    span_clone.record("operation.success", true);
                    span_clone.record("operation.found", true);
                    Ok(Some(SecretValue {
                        version_id,
                        secret_string,
                        version_stages: output.version_stages().to_vec(),
                    }))
                }
                Err(e)
                    if e
                        .as_service_error()
                        .is_some_and(GetSecretValueError::is_resource_not_found_exception) =>
                {
                    span_clone.record("operation.success", true);
                    span_clone.record("operation.found", false);
                    debug!(
                        secret_id,
                        ?selector,
                        "Secret version not found"
                    );
                    Ok(None)
                }
                Err(e) => {
                    span_clone.record("operation.success", false);
                    warn!(
                        provider = "aws",
                        region = %self.region,
                        secret_id,
                        operation = "get_secret_value",
                        error = %DisplayErrorContext(&e),
                        "Failed to get AWS secret value"
                    );
                    Err(anyhow!(
                        "Failed to get AWS secret {secret_id}: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        client_request_token: &str,
        secret_string: &str,
        version_stage: &str,
    ) -> Result<()> {
        let span = info_span!(
            "aws.secretsmanager.put_secret_value",
            secret.id = secret_id,
            version.id = client_request_token,
            version.stage = version_stage,
            region = %self.region,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            info!(
                provider = "aws",
                region = %self.region,
                secret_id,
                version_id = client_request_token,
                version_stage,
                operation = "put_secret_value",
                "Putting AWS secret version"
            );
            let result = self
                .client
                .put_secret_value()
                .secret_id(secret_id)
                .client_request_token(client_request_token)
                .secret_string(secret_string)
                .version_stages(version_stage)
                .send()
                .await;
            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);

            match result {
                Ok(_) => {
                    span_clone.record("operation.success", true);
                    Ok(())
                }
                Err(e) => {
                    span_clone.record("operation.success", false);
                    warn!(
                        provider = "aws",
                        region = %self.region,
                        secret_id,
                        operation = "put_secret_value",
                        error = %DisplayErrorContext(&e),
                        "Failed to put AWS secret value"
                    );
                    Err(anyhow!(
                        "Failed to put AWS secret {secret_id} version {client_request_token}: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn update_version_stage(
        &self,
        secret_id: &str,
        version_stage: &str,
        move_to_version_id: &str,
        remove_from_version_id: &str,
    ) -> Result<()> {
        let span = info_span!(
            "aws.secretsmanager.update_secret_version_stage",
            secret.id = secret_id,
            version.stage = version_stage,
            move_to = move_to_version_id,
            remove_from = remove_from_version_id,
            region = %self.region,
            operation.success = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let result = self
                .client
                .update_secret_version_stage()
                .secret_id(secret_id)
                .version_stage(version_stage)
                .move_to_version_id(move_to_version_id)
                .remove_from_version_id(remove_from_version_id)
                .send()
                .await;
            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);

            match result {
                Ok(_) => {
                    span_clone.record("operation.success", true);
                    Ok(())
                }
                Err(e) => {
                    span_clone.record("operation.success", false);
                    warn!(
                        provider = "aws",
                        region = %self.region,
                        secret_id,
                        operation = "update_secret_version_stage",
                        error = %DisplayErrorContext(&e),
                        "Failed to update AWS secret version stage"
                    );
                    Err(anyhow!(
                        "Failed to move {version_stage} to version {move_to_version_id} of secret {secret_id}: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            }
        }
        .instrument(span)
        .await
    }
}
