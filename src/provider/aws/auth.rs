//! # AWS SDK Configuration
//!
//! Builds the shared SDK config and per-service clients.
//!
//! Credentials always come from the SDK default chain (the Lambda execution
//! role in production). Endpoint overrides point a client at a local stack
//! or mock server instead of AWS.

use aws_config::SdkConfig;
use tracing::{info, warn};

/// Load the shared SDK config, pinning the region when one is configured
pub async fn create_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

    match region {
        Some(region) => {
            info!("Using AWS region: {}", region);
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        None => {
            info!("No AWS_REGION configured, using SDK default region chain");
        }
    }

    loader.load().await
}

/// Secrets Manager client, optionally routed to `endpoint`
#[must_use]
pub fn secrets_manager_client(
    sdk_config: &SdkConfig,
    endpoint: Option<&str>,
) -> aws_sdk_secretsmanager::Client {
    let mut builder = aws_sdk_secretsmanager::config::Builder::from(sdk_config);
    if let Some(endpoint) = endpoint {
        check_endpoint_override("secretsmanager", endpoint);
        builder = builder.endpoint_url(endpoint);
    }
    aws_sdk_secretsmanager::Client::from_conf(builder.build())
}

/// RDS client, optionally routed to `endpoint`
#[must_use]
pub fn rds_client(sdk_config: &SdkConfig, endpoint: Option<&str>) -> aws_sdk_rds::Client {
    let mut builder = aws_sdk_rds::config::Builder::from(sdk_config);
    if let Some(endpoint) = endpoint {
        check_endpoint_override("rds", endpoint);
        builder = builder.endpoint_url(endpoint);
    }
    aws_sdk_rds::Client::from_conf(builder.build())
}

fn check_endpoint_override(service: &str, endpoint: &str) {
    info!("Overriding AWS {} endpoint to {}", service, endpoint);
    if !looks_like_local_endpoint(endpoint) {
        warn!(
            "Endpoint override '{}' for {} does not look like a local stack or mock server. \
            Verify this is intended.",
            endpoint, service
        );
    }
}

/// Whether an endpoint looks like a local stack, container or mock server
#[must_use]
pub fn looks_like_local_endpoint(endpoint: &str) -> bool {
    endpoint.starts_with("http://localhost")
        || endpoint.starts_with("http://127.0.0.1")
        || endpoint.starts_with("http://[::1]")
        || endpoint.contains("host.docker.internal")
        || endpoint.contains("localstack")
        || endpoint.contains("pact")
        || endpoint.contains("mock")
}
