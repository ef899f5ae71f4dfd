//! coffer-backup - Backup and restore walkthroughs.
//!
//! Each flow creates a resource in a fresh source vault, exports it as an
//! opaque backup blob, and restores the blob into a second vault. Backups
//! are non-destructive and restores land immediately, so unlike deletes
//! and recoveries these flows never need to poll.

use anyhow::{ensure, Context, Result};

use coffer_core::config::Config;
use coffer_core::model::{CertificatePolicy, CreateVaultOptions, KeyKind};
use coffer_core::naming::sample_name;
use coffer_core::{CertificateClient, KeyClient, SecretClient, VaultClient};

const SECRET_VALUE: &str = "a value worth keeping";

/// What a single round trip touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRun {
    pub source_vault: String,
    pub target_vault: String,
    pub resource: String,
}

/// Stage a source and a target vault for one round trip.
async fn stage_vaults<S>(service: &S, config: &Config) -> Result<(String, String)>
where
    S: VaultClient + ?Sized,
{
    let source = sample_name("vault");
    let target = sample_name("vault");
    let options = CreateVaultOptions::new(&config.location, &config.group);
    service
        .create_vault(&source, options.clone())
        .await
        .with_context(|| format!("creating source vault {}", source))?;
    service
        .create_vault(&target, options)
        .await
        .with_context(|| format!("creating target vault {}", target))?;
    println!("Created vaults {} and {}", source, target);
    Ok((source, target))
}

/// Back a key up from one vault and restore it into another.
pub async fn backup_restore_key<S>(service: &S, config: &Config) -> Result<BackupRun>
where
    S: VaultClient + KeyClient + ?Sized,
{
    let (source, target) = stage_vaults(service, config).await?;

    let name = sample_name("key");
    let created = service
        .create_key(&source, &name, KeyKind::Rsa)
        .await
        .with_context(|| format!("creating key {}", name))?;
    println!("Created key {} in vault {}", name, source);
    println!("  Id: {}", created.id);

    let backup = service
        .backup_key(&source, &name)
        .await
        .with_context(|| format!("backing up key {}", name))?;
    println!("success: key {} backed up ({} bytes)", name, backup.payload.len());

    let restored = service
        .restore_key(&target, backup)
        .await
        .with_context(|| format!("restoring key {} into vault {}", name, target))?;
    println!("success: key {} restored into vault {}", name, target);
    println!("{}", serde_json::to_string_pretty(&restored)?);

    let listed = service
        .list_keys(&target)
        .await
        .with_context(|| format!("listing keys in vault {}", target))?;
    ensure!(
        listed.iter().any(|key| key.name == name),
        "key {} missing from vault {} after restore",
        name,
        target
    );

    Ok(BackupRun {
        source_vault: source,
        target_vault: target,
        resource: name,
    })
}

/// Back a secret up from one vault and restore it into another.
pub async fn backup_restore_secret<S>(service: &S, config: &Config) -> Result<BackupRun>
where
    S: VaultClient + SecretClient + ?Sized,
{
    let (source, target) = stage_vaults(service, config).await?;

    let name = sample_name("secret");
    service
        .set_secret(&source, &name, SECRET_VALUE)
        .await
        .with_context(|| format!("setting secret {}", name))?;
    println!("Created secret {} in vault {}", name, source);

    let backup = service
        .backup_secret(&source, &name)
        .await
        .with_context(|| format!("backing up secret {}", name))?;
    println!(
        "success: secret {} backed up ({} bytes)",
        name,
        backup.payload.len()
    );

    let restored = service
        .restore_secret(&target, backup)
        .await
        .with_context(|| format!("restoring secret {} into vault {}", name, target))?;
    println!("success: secret {} restored into vault {}", name, target);
    // Print the metadata view; the value itself stays off the console.
    println!("{}", serde_json::to_string_pretty(&restored.properties())?);
    ensure!(
        restored.value == SECRET_VALUE,
        "secret {} lost its value in the round trip",
        name
    );

    Ok(BackupRun {
        source_vault: source,
        target_vault: target,
        resource: name,
    })
}

/// Back a certificate up from one vault and restore it into another.
pub async fn backup_restore_certificate<S>(service: &S, config: &Config) -> Result<BackupRun>
where
    S: VaultClient + CertificateClient + ?Sized,
{
    let (source, target) = stage_vaults(service, config).await?;

    let name = sample_name("cert");
    let created = service
        .create_certificate(&source, &name, CertificatePolicy::default())
        .await
        .with_context(|| format!("creating certificate {}", name))?;
    println!("Created certificate {} in vault {}", name, source);
    println!("  Subject: {}", created.subject);

    let backup = service
        .backup_certificate(&source, &name)
        .await
        .with_context(|| format!("backing up certificate {}", name))?;
    println!(
        "success: certificate {} backed up ({} bytes)",
        name,
        backup.payload.len()
    );

    let restored = service
        .restore_certificate(&target, backup)
        .await
        .with_context(|| format!("restoring certificate {} into vault {}", name, target))?;
    println!(
        "success: certificate {} restored into vault {}",
        name, target
    );
    println!("{}", serde_json::to_string_pretty(&restored)?);

    let listed = service
        .list_certificates(&target)
        .await
        .with_context(|| format!("listing certificates in vault {}", target))?;
    ensure!(
        listed.iter().any(|cert| cert.name == name),
        "certificate {} missing from vault {} after restore",
        name,
        target
    );

    Ok(BackupRun {
        source_vault: source,
        target_vault: target,
        resource: name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::memory::MemoryService;
    use coffer_core::naming::sample_name_pattern;

    #[tokio::test]
    async fn test_key_round_trip_lands_in_the_target_vault() {
        let service = MemoryService::new();
        let config = Config::default();

        let run = backup_restore_key(&service, &config).await.unwrap();

        let pattern = sample_name_pattern("key").unwrap();
        assert!(pattern.is_match(&run.resource));

        // The original stays put; the backup is a copy.
        let in_source = service.list_keys(&run.source_vault).await.unwrap();
        let in_target = service.list_keys(&run.target_vault).await.unwrap();
        assert_eq!(in_source.len(), 1);
        assert_eq!(in_target.len(), 1);
        assert!(in_target[0].id.contains(&run.target_vault));
    }

    #[tokio::test]
    async fn test_secret_round_trip_preserves_the_value() {
        let service = MemoryService::new();
        let config = Config::default();

        let run = backup_restore_secret(&service, &config).await.unwrap();

        let copy = service
            .get_secret(&run.target_vault, &run.resource)
            .await
            .unwrap();
        assert_eq!(copy.value, SECRET_VALUE);
    }

    #[tokio::test]
    async fn test_certificate_round_trip_keeps_the_policy() {
        let service = MemoryService::new();
        let config = Config::default();

        let run = backup_restore_certificate(&service, &config).await.unwrap();

        let listed = service.list_certificates(&run.target_vault).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].subject, "CN=www.contoso.com");
        assert_eq!(listed[0].validity_months, 12);
    }

    #[tokio::test]
    async fn test_each_flow_uses_its_own_pair_of_vaults() {
        let service = MemoryService::new();
        let config = Config::default();

        let key_run = backup_restore_key(&service, &config).await.unwrap();
        let secret_run = backup_restore_secret(&service, &config).await.unwrap();

        assert_ne!(key_run.source_vault, secret_run.source_vault);
        let vaults = service.list_vaults().await.unwrap();
        assert_eq!(vaults.len(), 4);
    }
}
