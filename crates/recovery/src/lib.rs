//! coffer-recovery - Soft-delete recovery walkthrough
//!
//! Walks a vault service through the full soft-delete lifecycle:
//! - precreate sample vaults
//! - delete two vaults, recover one from its tombstone, purge the other
//! - delete two secrets, recover one, purge the other
//! - clean up leftover sample vaults from this or earlier runs
//!
//! Every delete and recover is acknowledged before it is visible, so each
//! one is paired with a read probe and polled until the service reports
//! the new state.

use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use coffer_core::client::{SecretClient, VaultClient};
use coffer_core::config::Config;
use coffer_core::error::ServiceError;
use coffer_core::model::{CreateVaultOptions, DeletedVault};
use coffer_core::naming::{sample_name, sample_name_pattern};
use coffer_core::poll::{perform_and_wait, perform_and_wait_cancellable, PollError};

/// Vaults created up front for the walkthrough.
#[derive(Debug, Clone)]
pub struct SampleVaults {
    pub to_recover: String,
    pub to_purge: String,
    pub for_secrets: String,
}

/// What a cleanup pass actually did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub purged: Vec<String>,
    /// True when the cancel signal fired before cleanup finished.
    pub cancelled: bool,
}

/// Create the three sample vaults concurrently.
pub async fn precreate_vaults<S>(service: &S, config: &Config) -> Result<SampleVaults>
where
    S: VaultClient + ?Sized,
{
    let to_recover = sample_name("vault");
    let to_purge = sample_name("vault");
    let for_secrets = sample_name("vault");
    let options = CreateVaultOptions::new(&config.location, &config.group);

    let (first, second, third) = tokio::join!(
        service.create_vault(&to_recover, options.clone()),
        service.create_vault(&to_purge, options.clone()),
        service.create_vault(&for_secrets, options),
    );
    first.with_context(|| format!("creating vault {}", to_recover))?;
    second.with_context(|| format!("creating vault {}", to_purge))?;
    third.with_context(|| format!("creating vault {}", for_secrets))?;

    println!("Created sample vaults:");
    println!("  to recover:  {}", to_recover);
    println!("  to purge:    {}", to_purge);
    println!("  for secrets: {}", for_secrets);

    Ok(SampleVaults {
        to_recover,
        to_purge,
        for_secrets,
    })
}

/// Delete both vaults, recover the first from its tombstone, purge the
/// second.
pub async fn vault_recovery<S>(
    service: &S,
    config: &Config,
    to_recover: &str,
    to_purge: &str,
) -> Result<()>
where
    S: VaultClient + ?Sized,
{
    println!("Deleting vaults {} and {}", to_recover, to_purge);
    let (first, second) = tokio::join!(
        perform_and_wait(
            service.delete_vault(to_recover),
            || service.get_deleted_vault(to_recover),
            config.poll,
        ),
        perform_and_wait(
            service.delete_vault(to_purge),
            || service.get_deleted_vault(to_purge),
            config.poll,
        ),
    );
    let recover_tombstone = first.with_context(|| format!("deleting vault {}", to_recover))?;
    let purge_tombstone = second.with_context(|| format!("deleting vault {}", to_purge))?;

    let deleted = service
        .list_deleted_vaults()
        .await
        .context("listing deleted vaults")?;
    println!("Deleted vaults:");
    for tombstone in &deleted {
        println!("  {} (purge scheduled {})", tombstone.name, tombstone.scheduled_purge_at);
    }
    ensure!(
        deleted.iter().any(|t| t.name == to_recover),
        "deleted vault listing is missing {}",
        to_recover
    );
    ensure!(
        deleted.iter().any(|t| t.name == to_purge),
        "deleted vault listing is missing {}",
        to_purge
    );

    println!("Recovering vault {} from:", to_recover);
    println!("{}", serde_json::to_string_pretty(&recover_tombstone)?);
    let recovered = perform_and_wait(
        service.recover_vault(to_recover),
        || service.get_vault(to_recover),
        config.poll,
    )
    .await
    .with_context(|| format!("recovering vault {}", to_recover))?;
    println!("success: vault {} recovered", recovered.name);

    println!("Purging vault {} from:", to_purge);
    println!("{}", serde_json::to_string_pretty(&purge_tombstone)?);
    service
        .purge_vault(to_purge)
        .await
        .with_context(|| format!("purging vault {}", to_purge))?;
    let remaining = service
        .list_deleted_vaults()
        .await
        .context("listing deleted vaults after purge")?;
    ensure!(
        remaining.iter().all(|t| t.name != to_purge),
        "vault {} still listed after purge",
        to_purge
    );
    println!("success: vault {} purged", to_purge);

    Ok(())
}

/// Create two secrets, delete both, recover one, purge the other.
pub async fn secret_recovery<S>(service: &S, config: &Config, vault: &str) -> Result<()>
where
    S: SecretClient + ?Sized,
{
    let to_recover = sample_name("secret");
    let to_purge = sample_name("secret");

    println!("Creating secrets in vault {}", vault);
    let (first, second) = tokio::join!(
        service.set_secret(vault, &to_recover, "a secret to bring back"),
        service.set_secret(vault, &to_purge, "a secret to discard"),
    );
    first.with_context(|| format!("setting secret {}", to_recover))?;
    second.with_context(|| format!("setting secret {}", to_purge))?;

    let listed = service
        .list_secrets(vault)
        .await
        .context("listing secrets")?;
    println!("Vault {} holds {} secrets", vault, listed.len());

    println!("Deleting secrets {} and {}", to_recover, to_purge);
    let (first, second) = tokio::join!(
        perform_and_wait(
            service.delete_secret(vault, &to_recover),
            || service.get_deleted_secret(vault, &to_recover),
            config.poll,
        ),
        perform_and_wait(
            service.delete_secret(vault, &to_purge),
            || service.get_deleted_secret(vault, &to_purge),
            config.poll,
        ),
    );
    first.with_context(|| format!("deleting secret {}", to_recover))?;
    second.with_context(|| format!("deleting secret {}", to_purge))?;

    let tombstones = service
        .list_deleted_secrets(vault)
        .await
        .context("listing deleted secrets")?;
    println!("Deleted secrets:");
    for tombstone in &tombstones {
        println!("  {} (purge scheduled {})", tombstone.name, tombstone.scheduled_purge_at);
    }

    println!("Recovering secret {}", to_recover);
    let recovered = perform_and_wait(
        service.recover_secret(vault, &to_recover),
        || service.get_secret(vault, &to_recover),
        config.poll,
    )
    .await
    .with_context(|| format!("recovering secret {}", to_recover))?;
    ensure!(
        recovered.value == "a secret to bring back",
        "secret {} lost its value during recovery",
        to_recover
    );
    println!("success: secret {} recovered", to_recover);

    println!("Purging secret {}", to_purge);
    service
        .purge_secret(vault, &to_purge)
        .await
        .with_context(|| format!("purging secret {}", to_purge))?;

    let remaining = service
        .list_secrets(vault)
        .await
        .context("listing remaining secrets")?;
    println!(
        "success: {} secret(s) remain in vault {}",
        remaining.len(),
        vault
    );

    Ok(())
}

/// Delete every leftover sample vault in the configured group, then purge
/// their tombstones.
///
/// Each vault gets its own polling task with its own budget; a failure on
/// one never stops the others. The cancel signal aborts pollers that are
/// still waiting, and skips the purge phase entirely.
pub async fn cleanup<S>(
    service: &Arc<S>,
    config: &Config,
    cancel: watch::Receiver<bool>,
) -> Result<CleanupReport>
where
    S: VaultClient + 'static,
{
    let pattern = sample_name_pattern("vault").context("compiling cleanup filter")?;
    let vaults = service.list_vaults().await.context("listing vaults")?;
    let targets: Vec<String> = vaults
        .into_iter()
        .filter(|vault| vault.group == config.group && pattern.is_match(&vault.name))
        .map(|vault| vault.name)
        .collect();
    println!("Cleaning up {} sample vault(s)", targets.len());

    let mut report = CleanupReport::default();

    let mut deletions: JoinSet<(String, Result<DeletedVault, PollError<ServiceError>>)> =
        JoinSet::new();
    for name in targets {
        let service = Arc::clone(service);
        let settings = config.poll;
        let cancel = cancel.clone();
        deletions.spawn(async move {
            let outcome = perform_and_wait_cancellable(
                service.delete_vault(&name),
                || service.get_deleted_vault(&name),
                settings,
                cancelled(cancel),
            )
            .await;
            (name, outcome)
        });
    }
    while let Some(joined) = deletions.join_next().await {
        let (name, outcome) = joined.context("cleanup delete task panicked")?;
        match outcome {
            Ok(_) => {
                info!(vault = %name, "deleted sample vault");
                report.deleted.push(name);
            }
            Err(PollError::Cancelled) => report.cancelled = true,
            Err(err) => warn!(vault = %name, error = %err, "failed to delete sample vault"),
        }
    }

    if report.cancelled {
        warn!("cleanup cancelled, leaving tombstones in place");
        return Ok(report);
    }

    let tombstones = service
        .list_deleted_vaults()
        .await
        .context("listing deleted vaults")?;
    let mut purges: JoinSet<(String, Result<(), ServiceError>)> = JoinSet::new();
    for tombstone in tombstones
        .into_iter()
        .filter(|t| pattern.is_match(&t.name))
    {
        let service = Arc::clone(service);
        purges.spawn(async move {
            let outcome = service.purge_vault(&tombstone.name).await;
            (tombstone.name, outcome)
        });
    }
    while let Some(joined) = purges.join_next().await {
        let (name, outcome) = joined.context("cleanup purge task panicked")?;
        match outcome {
            Ok(()) => {
                info!(vault = %name, "purged sample vault");
                report.purged.push(name);
            }
            Err(err) => warn!(vault = %name, error = %err, "failed to purge sample vault"),
        }
    }

    Ok(report)
}

/// Resolves when the cancel signal fires; never resolves once the sender
/// is gone.
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    if cancel.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
