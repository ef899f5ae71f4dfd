//! Client traits for the vault service.
//!
//! One trait per resource family, matching the service's client split.
//! Implementations are shared across tasks, so every method takes `&self`
//! and the traits require `Send + Sync`.
//!
//! Mutations are acknowledged before they are visible: after `delete_*`
//! succeeds, the matching `get_deleted_*` may still return `NotFound` for
//! a while, and likewise `get_*` after `recover_*`. Callers wait that gap
//! out with [`crate::poll::perform_and_wait`].

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::model::{
    Certificate, CertificatePolicy, CreateVaultOptions, DeletedSecret, DeletedVault, Key, KeyKind,
    ResourceBackup, Secret, SecretProperties, Vault,
};

/// Vault lifecycle operations.
#[async_trait]
pub trait VaultClient: Send + Sync {
    /// Create a vault. Fails with `Conflict` if the name is taken, live or
    /// soft-deleted.
    async fn create_vault(
        &self,
        name: &str,
        options: CreateVaultOptions,
    ) -> Result<Vault, ServiceError>;

    async fn get_vault(&self, name: &str) -> Result<Vault, ServiceError>;

    async fn list_vaults(&self) -> Result<Vec<Vault>, ServiceError>;

    /// Delete a vault. Soft-delete vaults become recoverable tombstones,
    /// others are removed outright.
    async fn delete_vault(&self, name: &str) -> Result<(), ServiceError>;

    async fn get_deleted_vault(&self, name: &str) -> Result<DeletedVault, ServiceError>;

    async fn list_deleted_vaults(&self) -> Result<Vec<DeletedVault>, ServiceError>;

    /// Recover a soft-deleted vault together with its contents.
    async fn recover_vault(&self, name: &str) -> Result<Vault, ServiceError>;

    /// Permanently remove a soft-deleted vault and its contents.
    async fn purge_vault(&self, name: &str) -> Result<(), ServiceError>;
}

/// Secret operations within a vault.
#[async_trait]
pub trait SecretClient: Send + Sync {
    /// Create or update a secret. Fails with `Conflict` while a tombstone
    /// of the same name exists.
    async fn set_secret(&self, vault: &str, name: &str, value: &str)
        -> Result<Secret, ServiceError>;

    async fn get_secret(&self, vault: &str, name: &str) -> Result<Secret, ServiceError>;

    /// List secret metadata; values are withheld.
    async fn list_secrets(&self, vault: &str) -> Result<Vec<SecretProperties>, ServiceError>;

    async fn delete_secret(&self, vault: &str, name: &str) -> Result<(), ServiceError>;

    async fn get_deleted_secret(
        &self,
        vault: &str,
        name: &str,
    ) -> Result<DeletedSecret, ServiceError>;

    async fn list_deleted_secrets(&self, vault: &str)
        -> Result<Vec<DeletedSecret>, ServiceError>;

    async fn recover_secret(&self, vault: &str, name: &str) -> Result<Secret, ServiceError>;

    async fn purge_secret(&self, vault: &str, name: &str) -> Result<(), ServiceError>;

    async fn backup_secret(&self, vault: &str, name: &str)
        -> Result<ResourceBackup, ServiceError>;

    /// Restore a backed-up secret into `vault` under its original name.
    async fn restore_secret(
        &self,
        vault: &str,
        backup: ResourceBackup,
    ) -> Result<Secret, ServiceError>;
}

/// Key operations within a vault.
#[async_trait]
pub trait KeyClient: Send + Sync {
    async fn create_key(&self, vault: &str, name: &str, kind: KeyKind)
        -> Result<Key, ServiceError>;

    async fn list_keys(&self, vault: &str) -> Result<Vec<Key>, ServiceError>;

    async fn backup_key(&self, vault: &str, name: &str) -> Result<ResourceBackup, ServiceError>;

    async fn restore_key(&self, vault: &str, backup: ResourceBackup) -> Result<Key, ServiceError>;
}

/// Certificate operations within a vault.
#[async_trait]
pub trait CertificateClient: Send + Sync {
    /// Issue a self-signed certificate under the given policy.
    async fn create_certificate(
        &self,
        vault: &str,
        name: &str,
        policy: CertificatePolicy,
    ) -> Result<Certificate, ServiceError>;

    async fn list_certificates(&self, vault: &str) -> Result<Vec<Certificate>, ServiceError>;

    async fn backup_certificate(
        &self,
        vault: &str,
        name: &str,
    ) -> Result<ResourceBackup, ServiceError>;

    async fn restore_certificate(
        &self,
        vault: &str,
        backup: ResourceBackup,
    ) -> Result<Certificate, ServiceError>;
}
