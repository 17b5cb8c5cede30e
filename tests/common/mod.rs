//! Common test utilities
//!
//! Seeds the in-memory doubles with the reference secret `S1` backed by
//! instance `db1`, and builds coordinators wired to them.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use rds_password_rotator::provider::memory::{InMemoryDatabase, InMemorySecretStore};
use rds_password_rotator::rotation::PasswordPolicy;
use rds_password_rotator::{RotationCoordinator, RotationEvent, RotationResponse};
use rds_password_rotator::RotationError;
use serde_json::json;
use std::sync::{Arc, Once};

pub const SECRET_ID: &str = "S1";
pub const INITIAL_VERSION: &str = "v1";
pub const TOKEN: &str = "T1";
pub const INSTANCE_ID: &str = "db1";
pub const OLD_PASSWORD: &str = "old";

static TRACING_INIT: Once = Once::new();

/// Route rotator logs to the test writer once per test binary
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "rds_password_rotator=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn initial_secret_string() -> String {
    json!({
        "dbInstanceIdentifier": INSTANCE_ID,
        "password": OLD_PASSWORD,
        "host": "h1"
    })
    .to_string()
}

/// Store, database and coordinator sharing the same doubles
#[derive(Debug)]
pub struct Fixture {
    pub store: InMemorySecretStore,
    pub database: InMemoryDatabase,
    pub coordinator: RotationCoordinator,
}

impl Fixture {
    /// `S1` with rotation enabled, current version `v1`, and `db1` at the old password
    pub async fn new() -> Self {
        Self::with_rotation_enabled(Some(true)).await
    }

    pub async fn with_rotation_enabled(rotation_enabled: Option<bool>) -> Self {
        Self::with_secret_string(&initial_secret_string(), rotation_enabled).await
    }

    pub async fn with_secret_string(secret_string: &str, rotation_enabled: Option<bool>) -> Self {
        init_tracing();

        let store = InMemorySecretStore::new();
        store
            .insert_secret(SECRET_ID, INITIAL_VERSION, secret_string, rotation_enabled)
            .await;

        let database = InMemoryDatabase::new();
        database.add_instance(INSTANCE_ID, OLD_PASSWORD).await;

        let coordinator = RotationCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(database.clone()),
            Arc::new(database.clone()),
            PasswordPolicy::default(),
        );

        Self {
            store,
            database,
            coordinator,
        }
    }

    pub async fn run(&self, step: &str) -> Result<RotationResponse, RotationError> {
        self.run_with_token(TOKEN, step).await
    }

    pub async fn run_with_token(
        &self,
        token: &str,
        step: &str,
    ) -> Result<RotationResponse, RotationError> {
        self.coordinator
            .handle(&RotationEvent::new(SECRET_ID, token, step))
            .await
    }

    /// Parsed secret string of a stored version
    pub async fn version_json(&self, version_id: &str) -> serde_json::Value {
        let secret_string = self
            .store
            .secret_string(SECRET_ID, version_id)
            .await
            .unwrap_or_else(|| panic!("version {version_id} not stored"));
        serde_json::from_str(&secret_string).expect("stored version is JSON")
    }
}
