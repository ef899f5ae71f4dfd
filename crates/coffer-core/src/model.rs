//! Data model for vaults and the resources they hold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource families the vault service manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Vault,
    Secret,
    Key,
    Certificate,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vault => "vault",
            ResourceKind::Secret => "secret",
            ResourceKind::Key => "key",
            ResourceKind::Certificate => "certificate",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vault and its service-assigned properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    pub name: String,
    pub uri: String,
    /// Placement label the vault was created in.
    pub location: String,
    /// Group label used to scope listings and cleanup.
    pub group: String,
    /// Whether deletions produce recoverable tombstones.
    pub soft_delete: bool,
    pub created: DateTime<Utc>,
}

/// Options for creating a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVaultOptions {
    pub location: String,
    pub group: String,
    /// Soft delete can be enabled at creation and never disabled later.
    pub soft_delete: bool,
}

impl CreateVaultOptions {
    /// Options for a soft-delete vault in the given location and group.
    pub fn new(location: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            group: group.into(),
            soft_delete: true,
        }
    }
}

/// Tombstone of a soft-deleted vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedVault {
    pub name: String,
    pub location: String,
    pub deleted_at: DateTime<Utc>,
    /// When the service will remove the tombstone on its own.
    pub scheduled_purge_at: DateTime<Utc>,
}

/// A secret with its value and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub value: String,
    pub enabled: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Secret {
    /// Metadata view of this secret, value withheld.
    pub fn properties(&self) -> SecretProperties {
        SecretProperties {
            name: self.name.clone(),
            enabled: self.enabled,
            created: self.created,
            updated: self.updated,
        }
    }
}

/// Secret metadata as returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretProperties {
    pub name: String,
    pub enabled: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Tombstone of a soft-deleted secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedSecret {
    pub name: String,
    pub deleted_at: DateTime<Utc>,
    pub scheduled_purge_at: DateTime<Utc>,
}

/// Key algorithms supported for generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Rsa,
    Ec,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Rsa => "rsa",
            KeyKind::Ec => "ec",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cryptographic key held by a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub name: String,
    /// Service-assigned identifier, `{vault uri}/keys/{name}`.
    pub id: String,
    pub kind: KeyKind,
    pub created: DateTime<Utc>,
}

/// Issuance policy for a self-signed certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificatePolicy {
    pub key_size: u32,
    /// Reissue with the same key pair instead of generating a fresh one.
    pub reuse_key: bool,
    pub subject: String,
    pub validity_months: u32,
}

impl Default for CertificatePolicy {
    /// The walkthrough policy: 4096-bit key, fresh key per issuance,
    /// 12-month validity.
    fn default() -> Self {
        Self {
            key_size: 4096,
            reuse_key: false,
            subject: "CN=www.contoso.com".to_string(),
            validity_months: 12,
        }
    }
}

/// A certificate issued into a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub name: String,
    /// Service-assigned identifier, `{vault uri}/certificates/{name}`.
    pub id: String,
    pub subject: String,
    pub validity_months: u32,
    pub created: DateTime<Utc>,
}

/// Opaque blob produced by a backup operation.
///
/// Restores only into vaults on the same service, and only as the kind it
/// was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBackup {
    pub kind: ResourceKind,
    pub payload: Vec<u8>,
}
