//! # RDS Password Rotator
//!
//! Lambda entry point. Builds the AWS clients and the rotation coordinator
//! once per cold start, then serves rotation invocations until the runtime
//! shuts the process down.

use anyhow::{anyhow, Context, Result};
use lambda_runtime::{service_fn, LambdaEvent};
use rds_password_rotator::observability::init_tracing;
use rds_password_rotator::provider::aws::{auth, AwsRdsAdmin, AwsSecretsManager};
use rds_password_rotator::{RotationConfig, RotationCoordinator, RotationEvent};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RotationConfig::from_env();
    config.validate().context("Invalid rotator configuration")?;
    init_tracing(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("BUILD_GIT_HASH"),
        build_datetime = env!("BUILD_DATETIME"),
        "Starting RDS password rotator"
    );
    info!(
        password_length = config.password_length,
        rds_settle_timeout_secs = config.rds_settle_timeout_secs,
        log_format = %config.log_format,
        "Loaded configuration"
    );

    let sdk_config = auth::create_sdk_config(config.aws_region.as_deref()).await;
    let secrets_manager = Arc::new(AwsSecretsManager::new(
        &sdk_config,
        config.secrets_manager_endpoint.as_deref(),
    ));
    let rds = Arc::new(
        AwsRdsAdmin::new(&sdk_config, config.rds_endpoint.as_deref())
            .with_settle_timing(config.settle_timing()),
    );

    let coordinator = RotationCoordinator::new(
        secrets_manager,
        Arc::<AwsRdsAdmin>::clone(&rds),
        rds,
        config.password_policy(),
    );
    let coordinator = &coordinator;

    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<RotationEvent>| async move {
            coordinator.handle(&event.payload).await
        },
    ))
    .await
    .map_err(|e| anyhow!(e))
}
