//! # In-Memory Providers
//!
//! Ephemeral stand-ins for Secrets Manager and RDS, used by the test suite and
//! for local dry runs of the rotation flow.
//!
//! `InMemorySecretStore` keeps ordered versions per secret plus a
//! label -> version map, so a label can only ever point at one version.
//! Every mutating call takes the write lock once, which makes stage moves
//! atomic.
//!
//! Both stand-ins can be told to fail their next call so error propagation
//! can be exercised.

use super::{
    CredentialTester, DatabaseAdmin, SecretMetadata, SecretStore, SecretValue, VersionSelector,
};
use crate::constants::{AWS_CURRENT, AWS_PENDING, AWS_PREVIOUS};
use crate::rotation::SecretRecord;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct StoredVersion {
    version_id: String,
    secret_string: String,
}

#[derive(Debug, Clone, Default)]
struct SecretEntry {
    rotation_enabled: Option<bool>,
    /// Oldest first
    versions: Vec<StoredVersion>,
    /// Staging label -> version id
    staging_labels: HashMap<String, String>,
}

impl SecretEntry {
    fn find(&self, version_id: &str) -> Option<&StoredVersion> {
        self.versions.iter().find(|v| v.version_id == version_id)
    }

    fn stages_of(&self, version_id: &str) -> Vec<String> {
        let mut stages: Vec<String> = self
            .staging_labels
            .iter()
            .filter(|(_, id)| id.as_str() == version_id)
            .map(|(label, _)| label.clone())
            .collect();
        stages.sort();
        stages
    }

    fn resolve(&self, selector: &VersionSelector) -> Option<&StoredVersion> {
        let stage = selector.version_stage.as_deref();
        match (selector.version_id.as_deref(), stage) {
            (Some(version_id), Some(stage)) => {
                let labelled = self.staging_labels.get(stage)?;
                if labelled == version_id {
                    self.find(version_id)
                } else {
                    None
                }
            }
            (Some(version_id), None) => self.find(version_id),
            (None, stage) => {
                let version_id = self.staging_labels.get(stage.unwrap_or(AWS_CURRENT))?;
                self.find(version_id)
            }
        }
    }
}

/// In-memory secret store with versions and staging labels
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<HashMap<String, SecretEntry>>>,
    mutations: Arc<AtomicUsize>,
    fail_next: Arc<Mutex<Option<String>>>,
}

impl InMemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a secret whose only version is `AWSCURRENT`.
    /// Seeding is not counted as a mutation.
    pub async fn insert_secret(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: &str,
        rotation_enabled: Option<bool>,
    ) {
        let mut secrets = self.secrets.write().await;
        let entry = SecretEntry {
            rotation_enabled,
            versions: vec![StoredVersion {
                version_id: version_id.to_string(),
                secret_string: secret_string.to_string(),
            }],
            staging_labels: HashMap::from([(AWS_CURRENT.to_string(), version_id.to_string())]),
        };
        secrets.insert(secret_id.to_string(), entry);
        info!("  Seeded secret {} with version {}", secret_id, version_id);
    }

    pub async fn set_rotation_enabled(&self, secret_id: &str, rotation_enabled: Option<bool>) {
        if let Some(entry) = self.secrets.write().await.get_mut(secret_id) {
            entry.rotation_enabled = rotation_enabled;
        }
    }

    /// Make the next trait call fail with `message`
    pub async fn fail_next_call(&self, message: &str) {
        *self.fail_next.lock().await = Some(message.to_string());
    }

    /// Number of successful `put_secret_value`/`update_version_stage` calls
    /// that changed state
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub async fn version_count(&self, secret_id: &str) -> usize {
        self.secrets
            .read()
            .await
            .get(secret_id)
            .map_or(0, |entry| entry.versions.len())
    }

    /// Version ids carrying `stage` (at most one by construction)
    pub async fn versions_with_stage(&self, secret_id: &str, stage: &str) -> Vec<String> {
        self.secrets
            .read()
            .await
            .get(secret_id)
            .and_then(|entry| entry.staging_labels.get(stage).cloned())
            .into_iter()
            .collect()
    }

    /// Sorted staging labels attached to a version
    pub async fn stages_of(&self, secret_id: &str, version_id: &str) -> Vec<String> {
        self.secrets
            .read()
            .await
            .get(secret_id)
            .map(|entry| entry.stages_of(version_id))
            .unwrap_or_default()
    }

    pub async fn secret_string(&self, secret_id: &str, version_id: &str) -> Option<String> {
        self.secrets
            .read()
            .await
            .get(secret_id)
            .and_then(|entry| entry.find(version_id))
            .map(|v| v.secret_string.clone())
    }

    async fn check_injected_failure(&self) -> Result<()> {
        match self.fail_next.lock().await.take() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}

fn not_found(secret_id: &str) -> anyhow::Error {
    anyhow!("ResourceNotFoundException: Secrets Manager can't find the specified secret {secret_id}")
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn describe_secret(&self, secret_id: &str) -> Result<SecretMetadata> {
        self.check_injected_failure().await?;

        let secrets = self.secrets.read().await;
        let entry = secrets.get(secret_id).ok_or_else(|| not_found(secret_id))?;

        let mut version_ids_to_stages: HashMap<String, Vec<String>> = HashMap::new();
        for (label, version_id) in &entry.staging_labels {
            version_ids_to_stages
                .entry(version_id.clone())
                .or_default()
                .push(label.clone());
        }

        Ok(SecretMetadata {
            rotation_enabled: entry.rotation_enabled,
            version_ids_to_stages,
        })
    }

    async fn get_secret_value(
        &self,
        secret_id: &str,
        selector: &VersionSelector,
    ) -> Result<Option<SecretValue>> {
        self.check_injected_failure().await?;

        let secrets = self.secrets.read().await;
        let Some(entry) = secrets.get(secret_id) else {
            return Ok(None);
        };

        Ok(entry.resolve(selector).map(|version| SecretValue {
            version_id: version.version_id.clone(),
            secret_string: version.secret_string.clone(),
            version_stages: entry.stages_of(&version.version_id),
        }))
    }

    async fn put_secret_value(
        &self,
        secret_id: &str,
        client_request_token: &str,
        secret_string: &str,
        version_stage: &str,
    ) -> Result<()> {
        self.check_injected_failure().await?;

        let mut secrets = self.secrets.write().await;
        let entry = secrets.get_mut(secret_id).ok_or_else(|| not_found(secret_id))?;

        if let Some(existing) = entry.find(client_request_token) {
            if existing.secret_string == secret_string {
                debug!(
                    "  Version {} already exists with identical content, no-op",
                    client_request_token
                );
                return Ok(());
            }
            return Err(anyhow!(
                "ResourceExistsException: version {client_request_token} of secret {secret_id} already exists with different content"
            ));
        }

        entry.versions.push(StoredVersion {
            version_id: client_request_token.to_string(),
            secret_string: secret_string.to_string(),
        });
        entry
            .staging_labels
            .insert(version_stage.to_string(), client_request_token.to_string());

        self.mutations.fetch_add(1, Ordering::SeqCst);
        info!(
            "  Added version {} ({}) to secret: {}",
            client_request_token, version_stage, secret_id
        );
        Ok(())
    }

    async fn update_version_stage(
        &self,
        secret_id: &str,
        version_stage: &str,
        move_to_version_id: &str,
        remove_from_version_id: &str,
    ) -> Result<()> {
        self.check_injected_failure().await?;

        let mut secrets = self.secrets.write().await;
        let entry = secrets.get_mut(secret_id).ok_or_else(|| not_found(secret_id))?;

        if entry.find(move_to_version_id).is_none() {
            return Err(anyhow!(
                "ResourceNotFoundException: version {move_to_version_id} of secret {secret_id} does not exist"
            ));
        }

        let holder = entry.staging_labels.get(version_stage).cloned();
        if holder.as_deref() == Some(move_to_version_id) {
            return Ok(());
        }
        if holder.as_deref() != Some(remove_from_version_id) {
            return Err(anyhow!(
                "InvalidParameterException: {version_stage} is attached to {}, not {remove_from_version_id}",
                holder.as_deref().unwrap_or("no version")
            ));
        }

        entry
            .staging_labels
            .insert(version_stage.to_string(), move_to_version_id.to_string());

        if version_stage == AWS_CURRENT {
            entry
                .staging_labels
                .insert(AWS_PREVIOUS.to_string(), remove_from_version_id.to_string());
            if entry.staging_labels.get(AWS_PENDING).map(String::as_str) == Some(move_to_version_id)
            {
                entry.staging_labels.remove(AWS_PENDING);
            }
        }

        self.mutations.fetch_add(1, Ordering::SeqCst);
        info!(
            "  Moved {} from {} to {} on secret: {}",
            version_stage, remove_from_version_id, move_to_version_id, secret_id
        );
        Ok(())
    }
}

/// A master password change issued against [`InMemoryDatabase`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub instance_id: String,
    pub new_password: String,
    pub apply_immediately: bool,
}

/// In-memory database control plane.
///
/// A credential record is accepted when its password equals the instance's
/// current master password.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    master_passwords: Arc<RwLock<HashMap<String, String>>>,
    password_changes: Arc<RwLock<Vec<PasswordChange>>>,
    fail_next: Arc<Mutex<Option<String>>>,
}

impl InMemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_instance(&self, instance_id: &str, master_password: &str) {
        self.master_passwords
            .write()
            .await
            .insert(instance_id.to_string(), master_password.to_string());
    }

    pub async fn master_password(&self, instance_id: &str) -> Option<String> {
        self.master_passwords.read().await.get(instance_id).cloned()
    }

    pub async fn password_changes(&self) -> Vec<PasswordChange> {
        self.password_changes.read().await.clone()
    }

    /// Make the next trait call fail with `message`
    pub async fn fail_next_call(&self, message: &str) {
        *self.fail_next.lock().await = Some(message.to_string());
    }

    async fn check_injected_failure(&self) -> Result<()> {
        match self.fail_next.lock().await.take() {
            Some(message) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DatabaseAdmin for InMemoryDatabase {
    async fn modify_instance_password(
        &self,
        instance_id: &str,
        new_password: &str,
        apply_immediately: bool,
    ) -> Result<()> {
        self.check_injected_failure().await?;

        let mut passwords = self.master_passwords.write().await;
        let password = passwords
            .get_mut(instance_id)
            .ok_or_else(|| anyhow!("DBInstanceNotFound: {instance_id}"))?;
        new_password.clone_into(password);

        self.password_changes.write().await.push(PasswordChange {
            instance_id: instance_id.to_string(),
            new_password: new_password.to_string(),
            apply_immediately,
        });
        Ok(())
    }
}

#[async_trait]
impl CredentialTester for InMemoryDatabase {
    async fn test_credentials(
        &self,
        instance_id: &str,
        credentials: &SecretRecord,
    ) -> Result<bool> {
        self.check_injected_failure().await?;

        let passwords = self.master_passwords.read().await;
        let master = passwords
            .get(instance_id)
            .ok_or_else(|| anyhow!("DBInstanceNotFound: {instance_id}"))?;

        Ok(credentials.password().is_ok_and(|p| p == master.as_str()))
    }
}
