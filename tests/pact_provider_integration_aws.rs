//! Pact integration tests for the AWS providers
//!
//! These tests verify that `AwsSecretsManager` and `AwsRdsAdmin` work against
//! Pact mock servers by:
//! 1. Starting a Pact mock server
//! 2. Pointing the real SDK-backed provider at the mock server endpoint
//! 3. Calling the actual provider methods
//! 4. Checking how the responses are mapped
//!
//! Request bodies are the exact bytes the SDK sends: compact JSON for
//! Secrets Manager, form-encoded query parameters for RDS, with members in
//! the SDK's serialization order.

mod common;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_secretsmanager::config::Credentials;
use pact_consumer::prelude::*;
use rds_password_rotator::constants::{AWS_CURRENT, AWS_PENDING};
use rds_password_rotator::provider::aws::{AwsRdsAdmin, AwsSecretsManager};
use rds_password_rotator::provider::{CredentialTester, DatabaseAdmin, SecretStore, VersionSelector};
use rds_password_rotator::rotation::SecretRecord;
use serde_json::json;

const CONSUMER: &str = "RDS-Password-Rotator";
const SECRETS_MANAGER: &str = "AWS-Secrets-Manager";
const RDS: &str = "AWS-RDS";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Static credentials and a pinned region so nothing reaches the default chain
async fn mock_sdk_config() -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("test", "test", None, None, "pact-test"))
        .retry_config(RetryConfig::disabled())
        .load()
        .await
}

fn endpoint(server_url: impl std::fmt::Display) -> String {
    let mut base_url = server_url.to_string();
    if base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}

#[tokio::test]
async fn test_aws_describe_secret_maps_rotation_flag_with_pact() {
    common::init_tracing();

    let mut pact_builder = PactBuilder::new(CONSUMER, SECRETS_MANAGER);
    pact_builder.interaction("describe a secret with rotation disabled", "", |mut i| {
        i.given("secret S1 exists with rotation disabled and a pending version");
        i.request
            .method("POST")
            .path("/")
            .header("content-type", "application/x-amz-json-1.1")
            .header("x-amz-target", "secretsmanager.DescribeSecret")
            .body(r#"{"SecretId":"S1"}"#);
        i.response
            .status(200)
            .header("content-type", "application/x-amz-json-1.1")
            .json_body(json!({
                "ARN": "arn:aws:secretsmanager:us-east-1:123456789012:secret:S1-abc123",
                "Name": "S1",
                "RotationEnabled": false,
                "VersionIdsToStages": {
                    "v1": ["AWSCURRENT"],
                    "T1": ["AWSPENDING"]
                }
            }));
        i
    });

    // Keep mock server alive for the duration of the test
    let mock_server = pact_builder.start_mock_server(None, None);
    let sdk_config = mock_sdk_config().await;
    let provider = AwsSecretsManager::new(&sdk_config, Some(&endpoint(mock_server.url())));

    let metadata = provider
        .describe_secret("S1")
        .await
        .expect("describe_secret");

    assert_eq!(metadata.rotation_enabled, Some(false));
    assert!(!metadata.rotation_allowed());
    assert_eq!(metadata.version_ids_to_stages.len(), 2);
    assert_eq!(
        metadata.version_ids_to_stages.get("v1"),
        Some(&vec![AWS_CURRENT.to_string()])
    );
    assert_eq!(
        metadata.version_ids_to_stages.get("T1"),
        Some(&vec![AWS_PENDING.to_string()])
    );
}

#[tokio::test]
async fn test_aws_missing_pending_version_is_none_with_pact() {
    common::init_tracing();

    let mut pact_builder = PactBuilder::new(CONSUMER, SECRETS_MANAGER);
    pact_builder.interaction("get an AWSPENDING version that does not exist", "", |mut i| {
        i.given("no AWSPENDING version exists for token T1");
        i.request
            .method("POST")
            .path("/")
            .header("content-type", "application/x-amz-json-1.1")
            .header("x-amz-target", "secretsmanager.GetSecretValue")
            // SDK order: SecretId, VersionId, VersionStage
            .body(r#"{"SecretId":"S1","VersionId":"T1","VersionStage":"AWSPENDING"}"#);
        i.response
            .status(400)
            .header("content-type", "application/x-amz-json-1.1")
            .json_body(json!({
                "__type": "ResourceNotFoundException",
                "message": "Secrets Manager can't find the specified secret value for VersionId: T1"
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let sdk_config = mock_sdk_config().await;
    let provider = AwsSecretsManager::new(&sdk_config, Some(&endpoint(mock_server.url())));

    let value = provider
        .get_secret_value("S1", &VersionSelector::pending("T1"))
        .await
        .expect("not found maps to None, not an error");

    assert!(value.is_none());
}

#[tokio::test]
async fn test_aws_modify_instance_password_applies_immediately_with_pact() {
    common::init_tracing();

    let mut pact_builder = PactBuilder::new(CONSUMER, RDS);
    pact_builder.interaction("set a new master password, applied immediately", "", |mut i| {
        i.given("RDS instance db1 is available");
        i.request
            .method("POST")
            .path("/")
            .header("content-type", FORM_CONTENT_TYPE)
            // SDK order: DBInstanceIdentifier, ApplyImmediately, MasterUserPassword
            .body(
                "Action=ModifyDBInstance&Version=2014-10-31&DBInstanceIdentifier=db1\
                &ApplyImmediately=true&MasterUserPassword=n3wPa55w0rd",
            );
        i.response
            .status(200)
            .header("content-type", "text/xml")
            .body(
                "<ModifyDBInstanceResponse xmlns=\"http://rds.amazonaws.com/doc/2014-10-31/\">\
                <ModifyDBInstanceResult><DBInstance>\
                <DBInstanceIdentifier>db1</DBInstanceIdentifier>\
                <DBInstanceStatus>available</DBInstanceStatus>\
                <MasterUsername>admin</MasterUsername>\
                <PendingModifiedValues><MasterUserPassword>****</MasterUserPassword></PendingModifiedValues>\
                </DBInstance></ModifyDBInstanceResult>\
                </ModifyDBInstanceResponse>",
            );
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let sdk_config = mock_sdk_config().await;
    let rds = AwsRdsAdmin::new(&sdk_config, Some(&endpoint(mock_server.url())));

    rds.modify_instance_password("db1", "n3wPa55w0rd", true)
        .await
        .expect("modify_instance_password");
}

#[tokio::test]
async fn test_aws_settled_instance_accepts_pending_credentials_with_pact() {
    common::init_tracing();

    let mut pact_builder = PactBuilder::new(CONSUMER, RDS);
    pact_builder.interaction("describe an instance that has applied the new password", "", |mut i| {
        i.given("RDS instance db1 has applied the new master password");
        i.request
            .method("POST")
            .path("/")
            .header("content-type", FORM_CONTENT_TYPE)
            .body("Action=DescribeDBInstances&Version=2014-10-31&DBInstanceIdentifier=db1");
        i.response
            .status(200)
            .header("content-type", "text/xml")
            .body(
                "<DescribeDBInstancesResponse xmlns=\"http://rds.amazonaws.com/doc/2014-10-31/\">\
                <DescribeDBInstancesResult><DBInstances><DBInstance>\
                <DBInstanceIdentifier>db1</DBInstanceIdentifier>\
                <DBInstanceStatus>available</DBInstanceStatus>\
                <MasterUsername>admin</MasterUsername>\
                <PendingModifiedValues/>\
                </DBInstance></DBInstances></DescribeDBInstancesResult>\
                </DescribeDBInstancesResponse>",
            );
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let sdk_config = mock_sdk_config().await;
    let rds = AwsRdsAdmin::new(&sdk_config, Some(&endpoint(mock_server.url())));
    let pending = SecretRecord::parse(
        &json!({
            "dbInstanceIdentifier": "db1",
            "username": "admin",
            "password": "n3wPa55w0rd"
        })
        .to_string(),
    )
    .expect("pending record");

    let accepted = rds
        .test_credentials("db1", &pending)
        .await
        .expect("test_credentials");

    assert!(accepted);
}
