//! # AWS Providers
//!
//! AWS-backed implementations of the provider traits.
//!
//! - [`AwsSecretsManager`]: `SecretStore` over AWS Secrets Manager
//! - [`AwsRdsAdmin`]: `DatabaseAdmin` and `CredentialTester` over Amazon RDS
//!
//! Both share one `SdkConfig` built by [`auth::create_sdk_config`].

pub mod auth;
mod rds;
mod secrets_manager;

pub use rds::{AwsRdsAdmin, SettleTiming};
pub use secrets_manager::AwsSecretsManager;

use aws_config::SdkConfig;

/// Region name for logs and spans
pub(crate) fn region_label(sdk_config: &SdkConfig) -> String {
    sdk_config
        .region()
        .map_or_else(|| "unknown".to_string(), ToString::to_string)
}
