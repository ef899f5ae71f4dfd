//! In-memory vault service with simulated propagation lag.
//!
//! Mutations apply to authoritative state and are acknowledged at once.
//! Reads, however, see soft-delete and recovery transitions only after the
//! configured lag, the way the real control plane trails acknowledgement.
//! That gap is what [`crate::poll`] exists to absorb; running against this
//! service exercises the same waiting the live one requires.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::debug;

use crate::client::{CertificateClient, KeyClient, SecretClient, VaultClient};
use crate::error::ServiceError;
use crate::model::{
    Certificate, CertificatePolicy, CreateVaultOptions, DeletedSecret, DeletedVault, Key, KeyKind,
    ResourceBackup, ResourceKind, Secret, SecretProperties, Vault,
};

/// Days a tombstone is kept before the service purges it on its own.
const SOFT_DELETE_RETENTION_DAYS: i64 = 90;

/// In-memory implementation of all four client traits.
pub struct MemoryService {
    lag: Duration,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    vaults: HashMap<String, VaultEntry>,
    deleted_vaults: HashMap<String, DeletedVaultEntry>,
}

struct VaultEntry {
    vault: Vault,
    visible_at: Instant,
    secrets: HashMap<String, SecretEntry>,
    deleted_secrets: HashMap<String, DeletedSecretEntry>,
    keys: HashMap<String, Key>,
    certificates: HashMap<String, Certificate>,
}

impl VaultEntry {
    fn new(vault: Vault) -> Self {
        Self {
            vault,
            visible_at: Instant::now(),
            secrets: HashMap::new(),
            deleted_secrets: HashMap::new(),
            keys: HashMap::new(),
            certificates: HashMap::new(),
        }
    }
}

struct DeletedVaultEntry {
    /// Frozen contents, restored wholesale on recovery.
    entry: VaultEntry,
    tombstone: DeletedVault,
    visible_at: Instant,
}

struct SecretEntry {
    secret: Secret,
    visible_at: Instant,
}

struct DeletedSecretEntry {
    secret: Secret,
    tombstone: DeletedSecret,
    visible_at: Instant,
}

impl State {
    fn vault(&self, name: &str) -> Result<&VaultEntry, ServiceError> {
        self.vaults
            .get(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Vault, name))
    }

    fn vault_mut(&mut self, name: &str) -> Result<&mut VaultEntry, ServiceError> {
        self.vaults
            .get_mut(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Vault, name))
    }
}

impl MemoryService {
    /// Service with no lag; reads see every write immediately.
    pub fn new() -> Self {
        Self::with_lag(Duration::ZERO)
    }

    /// Service whose delete and recover transitions become visible to
    /// reads only after `lag`.
    pub fn with_lag(lag: Duration) -> Self {
        Self {
            lag,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, ServiceError> {
        self.state
            .lock()
            .map_err(|_| ServiceError::Unavailable("service state poisoned".to_string()))
    }

    fn becomes_visible(&self) -> Instant {
        Instant::now() + self.lag
    }
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

fn is_visible(at: Instant) -> bool {
    Instant::now() >= at
}

fn validate_name(kind: ResourceKind, name: &str) -> Result<(), ServiceError> {
    let len_ok = match kind {
        ResourceKind::Vault => (3..=24).contains(&name.len()),
        _ => (1..=127).contains(&name.len()),
    };
    let starts_alpha = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let charset_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if len_ok && starts_alpha && charset_ok {
        Ok(())
    } else {
        Err(ServiceError::InvalidRequest(format!(
            "{} name {:?} is malformed",
            kind, name
        )))
    }
}

fn validate_policy(policy: &CertificatePolicy) -> Result<(), ServiceError> {
    if !matches!(policy.key_size, 2048 | 3072 | 4096) {
        return Err(ServiceError::InvalidRequest(format!(
            "unsupported certificate key size {}",
            policy.key_size
        )));
    }
    if policy.validity_months == 0 {
        return Err(ServiceError::InvalidRequest(
            "certificate validity must be at least one month".to_string(),
        ));
    }
    if policy.subject.trim().is_empty() {
        return Err(ServiceError::InvalidRequest(
            "certificate subject is required".to_string(),
        ));
    }
    Ok(())
}

fn decode_backup<T: DeserializeOwned>(
    expected: ResourceKind,
    backup: &ResourceBackup,
) -> Result<T, ServiceError> {
    if backup.kind != expected {
        return Err(ServiceError::InvalidRequest(format!(
            "backup holds a {}, not a {}",
            backup.kind, expected
        )));
    }
    serde_json::from_slice(&backup.payload)
        .map_err(|err| ServiceError::InvalidRequest(format!("malformed backup payload: {}", err)))
}

fn encode_backup<T: serde::Serialize>(
    kind: ResourceKind,
    resource: &T,
) -> Result<ResourceBackup, ServiceError> {
    let payload = serde_json::to_vec(resource)
        .map_err(|err| ServiceError::Unavailable(format!("backup serialization failed: {}", err)))?;
    Ok(ResourceBackup { kind, payload })
}

#[async_trait]
impl VaultClient for MemoryService {
    async fn create_vault(
        &self,
        name: &str,
        options: CreateVaultOptions,
    ) -> Result<Vault, ServiceError> {
        validate_name(ResourceKind::Vault, name)?;
        let mut state = self.lock()?;
        if state.vaults.contains_key(name) {
            return Err(ServiceError::Conflict(format!(
                "vault {} already exists",
                name
            )));
        }
        if state.deleted_vaults.contains_key(name) {
            return Err(ServiceError::Conflict(format!(
                "vault name {} is held by a soft-deleted vault; recover or purge it first",
                name
            )));
        }
        let vault = Vault {
            name: name.to_string(),
            uri: format!("https://{}.vault.local", name),
            location: options.location,
            group: options.group,
            soft_delete: options.soft_delete,
            created: Utc::now(),
        };
        state
            .vaults
            .insert(name.to_string(), VaultEntry::new(vault.clone()));
        debug!(vault = name, "created vault");
        Ok(vault)
    }

    async fn get_vault(&self, name: &str) -> Result<Vault, ServiceError> {
        let state = self.lock()?;
        state
            .vaults
            .get(name)
            .filter(|entry| is_visible(entry.visible_at))
            .map(|entry| entry.vault.clone())
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Vault, name))
    }

    async fn list_vaults(&self) -> Result<Vec<Vault>, ServiceError> {
        let state = self.lock()?;
        let mut vaults: Vec<Vault> = state
            .vaults
            .values()
            .filter(|entry| is_visible(entry.visible_at))
            .map(|entry| entry.vault.clone())
            .collect();
        vaults.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vaults)
    }

    async fn delete_vault(&self, name: &str) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        let entry = state
            .vaults
            .remove(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Vault, name))?;
        if entry.vault.soft_delete {
            let deleted_at = Utc::now();
            let tombstone = DeletedVault {
                name: entry.vault.name.clone(),
                location: entry.vault.location.clone(),
                deleted_at,
                scheduled_purge_at: deleted_at
                    + chrono::Duration::days(SOFT_DELETE_RETENTION_DAYS),
            };
            state.deleted_vaults.insert(
                name.to_string(),
                DeletedVaultEntry {
                    entry,
                    tombstone,
                    visible_at: self.becomes_visible(),
                },
            );
            debug!(vault = name, "soft-deleted vault");
        } else {
            debug!(vault = name, "deleted vault outright");
        }
        Ok(())
    }

    async fn get_deleted_vault(&self, name: &str) -> Result<DeletedVault, ServiceError> {
        let state = self.lock()?;
        state
            .deleted_vaults
            .get(name)
            .filter(|record| is_visible(record.visible_at))
            .map(|record| record.tombstone.clone())
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Vault, name))
    }

    async fn list_deleted_vaults(&self) -> Result<Vec<DeletedVault>, ServiceError> {
        let state = self.lock()?;
        let mut tombstones: Vec<DeletedVault> = state
            .deleted_vaults
            .values()
            .filter(|record| is_visible(record.visible_at))
            .map(|record| record.tombstone.clone())
            .collect();
        tombstones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tombstones)
    }

    async fn recover_vault(&self, name: &str) -> Result<Vault, ServiceError> {
        let mut state = self.lock()?;
        let record = state
            .deleted_vaults
            .remove(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Vault, name))?;
        let mut entry = record.entry;
        entry.visible_at = self.becomes_visible();
        let vault = entry.vault.clone();
        state.vaults.insert(name.to_string(), entry);
        debug!(vault = name, "recovered vault");
        Ok(vault)
    }

    async fn purge_vault(&self, name: &str) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        state
            .deleted_vaults
            .remove(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Vault, name))?;
        debug!(vault = name, "purged vault");
        Ok(())
    }
}

#[async_trait]
impl SecretClient for MemoryService {
    async fn set_secret(
        &self,
        vault: &str,
        name: &str,
        value: &str,
    ) -> Result<Secret, ServiceError> {
        validate_name(ResourceKind::Secret, name)?;
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        if entry.deleted_secrets.contains_key(name) {
            return Err(ServiceError::Conflict(format!(
                "secret {} is soft-deleted; recover or purge it first",
                name
            )));
        }
        let now = Utc::now();
        let created = entry
            .secrets
            .get(name)
            .map(|existing| existing.secret.created)
            .unwrap_or(now);
        let secret = Secret {
            name: name.to_string(),
            value: value.to_string(),
            enabled: true,
            created,
            updated: now,
        };
        entry.secrets.insert(
            name.to_string(),
            SecretEntry {
                secret: secret.clone(),
                visible_at: Instant::now(),
            },
        );
        Ok(secret)
    }

    async fn get_secret(&self, vault: &str, name: &str) -> Result<Secret, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        entry
            .secrets
            .get(name)
            .filter(|record| is_visible(record.visible_at))
            .map(|record| record.secret.clone())
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Secret, name))
    }

    async fn list_secrets(&self, vault: &str) -> Result<Vec<SecretProperties>, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        let mut secrets: Vec<SecretProperties> = entry
            .secrets
            .values()
            .filter(|record| is_visible(record.visible_at))
            .map(|record| record.secret.properties())
            .collect();
        secrets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(secrets)
    }

    async fn delete_secret(&self, vault: &str, name: &str) -> Result<(), ServiceError> {
        let visible_at = self.becomes_visible();
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        let record = entry
            .secrets
            .remove(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Secret, name))?;
        if entry.vault.soft_delete {
            let deleted_at = Utc::now();
            entry.deleted_secrets.insert(
                name.to_string(),
                DeletedSecretEntry {
                    secret: record.secret,
                    tombstone: DeletedSecret {
                        name: name.to_string(),
                        deleted_at,
                        scheduled_purge_at: deleted_at
                            + chrono::Duration::days(SOFT_DELETE_RETENTION_DAYS),
                    },
                    visible_at,
                },
            );
            debug!(vault, secret = name, "soft-deleted secret");
        } else {
            debug!(vault, secret = name, "deleted secret outright");
        }
        Ok(())
    }

    async fn get_deleted_secret(
        &self,
        vault: &str,
        name: &str,
    ) -> Result<DeletedSecret, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        entry
            .deleted_secrets
            .get(name)
            .filter(|record| is_visible(record.visible_at))
            .map(|record| record.tombstone.clone())
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Secret, name))
    }

    async fn list_deleted_secrets(
        &self,
        vault: &str,
    ) -> Result<Vec<DeletedSecret>, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        let mut tombstones: Vec<DeletedSecret> = entry
            .deleted_secrets
            .values()
            .filter(|record| is_visible(record.visible_at))
            .map(|record| record.tombstone.clone())
            .collect();
        tombstones.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tombstones)
    }

    async fn recover_secret(&self, vault: &str, name: &str) -> Result<Secret, ServiceError> {
        let visible_at = self.becomes_visible();
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        let record = entry
            .deleted_secrets
            .remove(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Secret, name))?;
        let secret = record.secret;
        entry.secrets.insert(
            name.to_string(),
            SecretEntry {
                secret: secret.clone(),
                visible_at,
            },
        );
        debug!(vault, secret = name, "recovered secret");
        Ok(secret)
    }

    async fn purge_secret(&self, vault: &str, name: &str) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        entry
            .deleted_secrets
            .remove(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Secret, name))?;
        debug!(vault, secret = name, "purged secret");
        Ok(())
    }

    async fn backup_secret(
        &self,
        vault: &str,
        name: &str,
    ) -> Result<ResourceBackup, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        let record = entry
            .secrets
            .get(name)
            .filter(|record| is_visible(record.visible_at))
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Secret, name))?;
        encode_backup(ResourceKind::Secret, &record.secret)
    }

    async fn restore_secret(
        &self,
        vault: &str,
        backup: ResourceBackup,
    ) -> Result<Secret, ServiceError> {
        let secret: Secret = decode_backup(ResourceKind::Secret, &backup)?;
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        if entry.secrets.contains_key(&secret.name)
            || entry.deleted_secrets.contains_key(&secret.name)
        {
            return Err(ServiceError::Conflict(format!(
                "secret {} already exists in vault {}",
                secret.name, vault
            )));
        }
        entry.secrets.insert(
            secret.name.clone(),
            SecretEntry {
                secret: secret.clone(),
                visible_at: Instant::now(),
            },
        );
        Ok(secret)
    }
}

#[async_trait]
impl KeyClient for MemoryService {
    async fn create_key(
        &self,
        vault: &str,
        name: &str,
        kind: KeyKind,
    ) -> Result<Key, ServiceError> {
        validate_name(ResourceKind::Key, name)?;
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        if entry.keys.contains_key(name) {
            return Err(ServiceError::Conflict(format!(
                "key {} already exists",
                name
            )));
        }
        let key = Key {
            name: name.to_string(),
            id: format!("{}/keys/{}", entry.vault.uri, name),
            kind,
            created: Utc::now(),
        };
        entry.keys.insert(name.to_string(), key.clone());
        Ok(key)
    }

    async fn list_keys(&self, vault: &str) -> Result<Vec<Key>, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        let mut keys: Vec<Key> = entry.keys.values().cloned().collect();
        keys.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(keys)
    }

    async fn backup_key(&self, vault: &str, name: &str) -> Result<ResourceBackup, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        let key = entry
            .keys
            .get(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Key, name))?;
        encode_backup(ResourceKind::Key, key)
    }

    async fn restore_key(&self, vault: &str, backup: ResourceBackup) -> Result<Key, ServiceError> {
        let mut key: Key = decode_backup(ResourceKind::Key, &backup)?;
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        if entry.keys.contains_key(&key.name) {
            return Err(ServiceError::Conflict(format!(
                "key {} already exists in vault {}",
                key.name, vault
            )));
        }
        // The identifier follows the key into its new vault.
        key.id = format!("{}/keys/{}", entry.vault.uri, key.name);
        entry.keys.insert(key.name.clone(), key.clone());
        Ok(key)
    }
}

#[async_trait]
impl CertificateClient for MemoryService {
    async fn create_certificate(
        &self,
        vault: &str,
        name: &str,
        policy: CertificatePolicy,
    ) -> Result<Certificate, ServiceError> {
        validate_name(ResourceKind::Certificate, name)?;
        validate_policy(&policy)?;
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        if entry.certificates.contains_key(name) {
            return Err(ServiceError::Conflict(format!(
                "certificate {} already exists",
                name
            )));
        }
        let certificate = Certificate {
            name: name.to_string(),
            id: format!("{}/certificates/{}", entry.vault.uri, name),
            subject: policy.subject,
            validity_months: policy.validity_months,
            created: Utc::now(),
        };
        entry
            .certificates
            .insert(name.to_string(), certificate.clone());
        Ok(certificate)
    }

    async fn list_certificates(&self, vault: &str) -> Result<Vec<Certificate>, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        let mut certificates: Vec<Certificate> = entry.certificates.values().cloned().collect();
        certificates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(certificates)
    }

    async fn backup_certificate(
        &self,
        vault: &str,
        name: &str,
    ) -> Result<ResourceBackup, ServiceError> {
        let state = self.lock()?;
        let entry = state.vault(vault)?;
        let certificate = entry
            .certificates
            .get(name)
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Certificate, name))?;
        encode_backup(ResourceKind::Certificate, certificate)
    }

    async fn restore_certificate(
        &self,
        vault: &str,
        backup: ResourceBackup,
    ) -> Result<Certificate, ServiceError> {
        let mut certificate: Certificate = decode_backup(ResourceKind::Certificate, &backup)?;
        let mut state = self.lock()?;
        let entry = state.vault_mut(vault)?;
        if entry.certificates.contains_key(&certificate.name) {
            return Err(ServiceError::Conflict(format!(
                "certificate {} already exists in vault {}",
                certificate.name, vault
            )));
        }
        certificate.id = format!("{}/certificates/{}", entry.vault.uri, certificate.name);
        entry
            .certificates
            .insert(certificate.name.clone(), certificate.clone());
        Ok(certificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::Classify;
    use tokio::time::sleep;

    fn options() -> CreateVaultOptions {
        CreateVaultOptions::new("local", "coffer-samples")
    }

    fn hard_delete_options() -> CreateVaultOptions {
        CreateVaultOptions {
            soft_delete: false,
            ..options()
        }
    }

    #[tokio::test]
    async fn test_create_and_get_vault() {
        let service = MemoryService::new();
        let created = service.create_vault("vault-keen-reef-12", options()).await.unwrap();
        assert_eq!(created.uri, "https://vault-keen-reef-12.vault.local");
        assert!(created.soft_delete);

        let fetched = service.get_vault("vault-keen-reef-12").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_vault_name_conflicts() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        let err = service.create_vault("vault-a", options()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_malformed_vault_name_rejected() {
        let service = MemoryService::new();
        for name in ["ab", "1vault", "vault_underscore", "UPPER CASE"] {
            let err = service.create_vault(name, options()).await.unwrap_err();
            assert!(
                matches!(err, ServiceError::InvalidRequest(_)),
                "{} was accepted",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_hard_delete_leaves_no_tombstone() {
        let service = MemoryService::new();
        service
            .create_vault("vault-a", hard_delete_options())
            .await
            .unwrap();
        service.delete_vault("vault-a").await.unwrap();

        let err = service.get_deleted_vault("vault-a").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(service.list_deleted_vaults().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_soft_delete_schedules_purge_date() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.delete_vault("vault-a").await.unwrap();

        let tombstone = service.get_deleted_vault("vault-a").await.unwrap();
        assert_eq!(
            tombstone.scheduled_purge_at - tombstone.deleted_at,
            chrono::Duration::days(SOFT_DELETE_RETENTION_DAYS)
        );
        assert!(service.get_vault("vault-a").await.unwrap_err().is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lag_hides_tombstone_until_elapsed() {
        let service = MemoryService::with_lag(Duration::from_millis(500));
        service.create_vault("vault-a", options()).await.unwrap();
        service.delete_vault("vault-a").await.unwrap();

        // Acknowledged but not yet visible.
        assert!(service
            .get_deleted_vault("vault-a")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(service.list_deleted_vaults().await.unwrap().is_empty());

        sleep(Duration::from_millis(500)).await;
        assert_eq!(
            service.get_deleted_vault("vault-a").await.unwrap().name,
            "vault-a"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_restores_contents_after_lag() {
        let service = MemoryService::with_lag(Duration::from_millis(300));
        service.create_vault("vault-a", options()).await.unwrap();
        service
            .set_secret("vault-a", "db-password", "hunter2")
            .await
            .unwrap();

        service.delete_vault("vault-a").await.unwrap();
        sleep(Duration::from_millis(300)).await;

        service.recover_vault("vault-a").await.unwrap();
        assert!(service.get_vault("vault-a").await.unwrap_err().is_not_found());

        sleep(Duration::from_millis(300)).await;
        assert_eq!(service.get_vault("vault-a").await.unwrap().name, "vault-a");
        let secret = service.get_secret("vault-a", "db-password").await.unwrap();
        assert_eq!(secret.value, "hunter2");
    }

    #[tokio::test]
    async fn test_soft_deleted_name_reserved_until_purge() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.delete_vault("vault-a").await.unwrap();

        let err = service.create_vault("vault-a", options()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        service.purge_vault("vault-a").await.unwrap();
        assert!(service
            .get_deleted_vault("vault-a")
            .await
            .unwrap_err()
            .is_not_found());
        service.create_vault("vault-a", options()).await.unwrap();
    }

    #[tokio::test]
    async fn test_secret_listings_sorted_and_value_free() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.set_secret("vault-a", "zeta", "z").await.unwrap();
        service.set_secret("vault-a", "alpha", "a").await.unwrap();

        let listed = service.list_secrets("vault-a").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_update_keeps_secret_creation_time() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        let first = service.set_secret("vault-a", "alpha", "one").await.unwrap();
        let second = service.set_secret("vault-a", "alpha", "two").await.unwrap();

        assert_eq!(second.created, first.created);
        assert_eq!(
            service.get_secret("vault-a", "alpha").await.unwrap().value,
            "two"
        );
    }

    #[tokio::test]
    async fn test_secret_operations_require_the_vault() {
        let service = MemoryService::new();
        let err = service.get_secret("vault-a", "alpha").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::NotFound {
                kind: ResourceKind::Vault,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_tombstoned_secret_blocks_set() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.set_secret("vault-a", "alpha", "one").await.unwrap();
        service.delete_secret("vault-a", "alpha").await.unwrap();

        let err = service
            .set_secret("vault-a", "alpha", "two")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let recovered = service.recover_secret("vault-a", "alpha").await.unwrap();
        assert_eq!(recovered.value, "one");
        service.set_secret("vault-a", "alpha", "two").await.unwrap();
    }

    #[tokio::test]
    async fn test_purged_secret_is_gone_for_good() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.set_secret("vault-a", "alpha", "one").await.unwrap();
        service.delete_secret("vault-a", "alpha").await.unwrap();
        service.purge_secret("vault-a", "alpha").await.unwrap();

        assert!(service
            .recover_secret("vault-a", "alpha")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(service.list_deleted_secrets("vault-a").await.unwrap().is_empty());
        service.set_secret("vault-a", "alpha", "fresh").await.unwrap();
    }

    #[tokio::test]
    async fn test_secret_backup_restores_into_another_vault() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.create_vault("vault-b", options()).await.unwrap();
        let original = service
            .set_secret("vault-a", "alpha", "payload")
            .await
            .unwrap();

        let backup = service.backup_secret("vault-a", "alpha").await.unwrap();
        let restored = service.restore_secret("vault-b", backup).await.unwrap();

        assert_eq!(restored.value, "payload");
        assert_eq!(restored.created, original.created);
        assert_eq!(
            service.get_secret("vault-b", "alpha").await.unwrap().value,
            "payload"
        );
    }

    #[tokio::test]
    async fn test_restore_refuses_to_overwrite() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.set_secret("vault-a", "alpha", "payload").await.unwrap();

        let backup = service.backup_secret("vault-a", "alpha").await.unwrap();
        let err = service.restore_secret("vault-a", backup).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_restore_rejects_foreign_and_malformed_backups() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service
            .create_key("vault-a", "signing", KeyKind::Rsa)
            .await
            .unwrap();

        let key_backup = service.backup_key("vault-a", "signing").await.unwrap();
        let err = service
            .restore_secret("vault-a", key_backup)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));

        let garbage = ResourceBackup {
            kind: ResourceKind::Secret,
            payload: b"not json".to_vec(),
        };
        let err = service.restore_secret("vault-a", garbage).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_key_restore_rewrites_the_identifier() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.create_vault("vault-b", options()).await.unwrap();
        let created = service
            .create_key("vault-a", "signing", KeyKind::Rsa)
            .await
            .unwrap();
        assert!(created.id.starts_with("https://vault-a.vault.local/keys/"));

        let backup = service.backup_key("vault-a", "signing").await.unwrap();
        let restored = service.restore_key("vault-b", backup).await.unwrap();

        assert_eq!(restored.kind, KeyKind::Rsa);
        assert_eq!(restored.id, "https://vault-b.vault.local/keys/signing");
    }

    #[tokio::test]
    async fn test_certificate_policy_is_validated() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();

        let weak = CertificatePolicy {
            key_size: 1024,
            ..CertificatePolicy::default()
        };
        let err = service
            .create_certificate("vault-a", "tls", weak)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_certificate_backup_round_trips_between_vaults() {
        let service = MemoryService::new();
        service.create_vault("vault-a", options()).await.unwrap();
        service.create_vault("vault-b", options()).await.unwrap();
        service
            .create_certificate("vault-a", "tls", CertificatePolicy::default())
            .await
            .unwrap();

        let backup = service.backup_certificate("vault-a", "tls").await.unwrap();
        let restored = service.restore_certificate("vault-b", backup).await.unwrap();

        assert_eq!(restored.subject, "CN=www.contoso.com");
        assert_eq!(restored.validity_months, 12);
        assert_eq!(
            restored.id,
            "https://vault-b.vault.local/certificates/tls"
        );
        assert_eq!(service.list_certificates("vault-b").await.unwrap().len(), 1);
    }
}
