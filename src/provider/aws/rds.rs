//! # Amazon RDS Operations
//!
//! Master password changes and pending-credential checks for RDS instances.
//!
//! The check stays on the RDS control plane: it never opens a database
//! connection. `ModifyDBInstance` applies asynchronously, so the check polls
//! `DescribeDBInstances` until the instance is `available` with no master
//! password change outstanding, bounded by [`SettleTiming`]. The record's
//! `username` (when present) must match the instance's master user.

use super::auth;
use crate::constants::{
    DEFAULT_RDS_SETTLE_POLL_SECS, DEFAULT_RDS_SETTLE_TIMEOUT_SECS, RDS_STATUS_AVAILABLE,
    RDS_UNRECOVERABLE_STATUSES,
};
use crate::provider::{CredentialTester, DatabaseAdmin};
use crate::rotation::SecretRecord;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::types::DbInstance;
use aws_sdk_rds::Client as RdsClient;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, field, info, info_span, warn, Instrument};

const USERNAME_FIELD: &str = "username";

/// Bounds on waiting for an instance to take a new master password
///
/// `max_wait` must stay below the function timeout so a slow reset surfaces
/// as a `ServiceError` rather than a killed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTiming {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for SettleTiming {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(DEFAULT_RDS_SETTLE_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_RDS_SETTLE_POLL_SECS),
        }
    }
}

pub struct AwsRdsAdmin {
    client: RdsClient,
    region: String,
    settle_timing: SettleTiming,
}

impl std::fmt::Debug for AwsRdsAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsRdsAdmin")
            .field("region", &self.region)
            .field("settle_timing", &self.settle_timing)
            .finish_non_exhaustive()
    }
}

impl AwsRdsAdmin {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig, endpoint: Option<&str>) -> Self {
        Self {
            client: auth::rds_client(sdk_config, endpoint),
            region: super::region_label(sdk_config),
            settle_timing: SettleTiming::default(),
        }
    }

    #[must_use]
    pub fn with_settle_timing(mut self, settle_timing: SettleTiming) -> Self {
        self.settle_timing = settle_timing;
        self
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<DbInstance>> {
        let output = self
            .client
            .describe_db_instances()
            .db_instance_identifier(instance_id)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to describe RDS instance {instance_id}: {}",
                    DisplayErrorContext(&e)
                )
            })?;

        Ok(output.db_instances().first().cloned())
    }

    async fn snapshot(&self, instance_id: &str) -> Result<InstanceSnapshot> {
        self.describe_instance(instance_id)
            .await?
            .as_ref()
            .map(InstanceSnapshot::from)
            .ok_or_else(|| anyhow!("RDS instance {instance_id} not found"))
    }
}

#[async_trait]
impl DatabaseAdmin for AwsRdsAdmin {
    async fn modify_instance_password(
        &self,
        instance_id: &str,
        new_password: &str,
        apply_immediately: bool,
    ) -> Result<()> {
        let span = info_span!(
            "aws.rds.modify_db_instance",
            db.instance_id = instance_id,
            apply_immediately,
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
                instance_id,
                operation = "modify_db_instance",
                "Setting new master password on RDS instance"
            );
            let result = self
                .client
                .modify_db_instance()
                .db_instance_identifier(instance_id)
                .master_user_password(new_password)
                .apply_immediately(apply_immediately)
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
                        instance_id,
                        operation = "modify_db_instance",
                        error = %DisplayErrorContext(&e),
                        "Failed to modify RDS instance"
                    );
                    Err(anyhow!(
                        "Failed to set master password on RDS instance {instance_id}: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl CredentialTester for AwsRdsAdmin {
    async fn test_credentials(
        &self,
        instance_id: &str,
        credentials: &SecretRecord,
    ) -> Result<bool> {
        let span = info_span!(
            "aws.rds.test_credentials",
            db.instance_id = instance_id,
            region = %self.region,
            operation.success = field::Empty,
            operation.accepted = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let username = credentials
                .get(USERNAME_FIELD)
                .and_then(serde_json::Value::as_str);
            let result = await_settled(
                instance_id,
                move || async move { self.snapshot(instance_id).await },
                username,
                self.settle_timing,
            )
            .await;
            span_clone.record("operation.duration_ms", start.elapsed().as_millis() as u64);

            match result {
                Ok(accepted) => {
                    span_clone.record("operation.success", true);
                    span_clone.record("operation.accepted", accepted);
                    Ok(accepted)
                }
                Err(e) => {
                    span_clone.record("operation.success", false);
                    warn!(
                        provider = "aws",
                        region = %self.region,
                        instance_id,
                        operation = "describe_db_instances",
                        error = %e,
                        "Failed to check RDS instance"
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// The parts of `DescribeDBInstances` output the credential check judges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct InstanceSnapshot {
    status: Option<String>,
    password_change_pending: bool,
    master_username: Option<String>,
}

impl From<&DbInstance> for InstanceSnapshot {
    fn from(instance: &DbInstance) -> Self {
        Self {
            status: instance.db_instance_status().map(ToString::to_string),
            password_change_pending: instance
                .pending_modified_values()
                .and_then(|p| p.master_user_password())
                .is_some(),
            master_username: instance.master_username().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Accepted,
    Rejected,
    Settling,
}

/// Judge one snapshot against the pending record's username
fn judge(snapshot: &InstanceSnapshot, username: Option<&str>) -> Verdict {
    match snapshot.status.as_deref() {
        Some(status) if RDS_UNRECOVERABLE_STATUSES.contains(&status) => return Verdict::Rejected,
        Some(RDS_STATUS_AVAILABLE) if !snapshot.password_change_pending => {}
        _ => return Verdict::Settling,
    }
    match (username, snapshot.master_username.as_deref()) {
        (Some(username), Some(master)) if username != master => Verdict::Rejected,
        _ => Verdict::Accepted,
    }
}

/// Poll until the instance settles or `timing.max_wait` runs out
///
/// Right after `ModifyDBInstance` the instance can still report `available`
/// with the password pending, then pass through `resetting-master-credentials`
/// or `modifying`. Only a settled snapshot is judged.
async fn await_settled<F, Fut>(
    instance_id: &str,
    mut describe: F,
    username: Option<&str>,
    timing: SettleTiming,
) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<InstanceSnapshot>>,
{
    let deadline = Instant::now() + timing.max_wait;
    loop {
        let snapshot = describe().await?;
        match judge(&snapshot, username) {
            Verdict::Accepted => return Ok(true),
            Verdict::Rejected => {
                debug!(instance_id, status = ?snapshot.status, "RDS instance rejected pending credentials");
                return Ok(false);
            }
            Verdict::Settling if Instant::now() + timing.poll_interval > deadline => {
                return Err(anyhow!(
                    "RDS instance {instance_id} did not settle within {}s (status {}, password change pending: {})",
                    timing.max_wait.as_secs(),
                    snapshot.status.as_deref().unwrap_or("unknown"),
                    snapshot.password_change_pending
                ));
            }
            Verdict::Settling => {
                debug!(
                    instance_id,
                    status = ?snapshot.status,
                    password_change_pending = snapshot.password_change_pending,
                    "Waiting for RDS instance to settle"
                );
                tokio::time::sleep(timing.poll_interval).await;
            }
        }
    }
}
