//! coffer-recovery - Soft-delete recovery walkthrough CLI.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use coffer_core::config::Config;
use coffer_core::memory::MemoryService;
use coffer_recovery::{
    cleanup, precreate_vaults, secret_recovery, vault_recovery, CleanupReport,
};

#[derive(Parser)]
#[command(name = "coffer-recovery")]
#[command(about = "Soft-delete recovery walkthrough for the coffer vault service")]
#[command(version)]
#[command(after_help = r#"FLOWS:
    run           Full walkthrough: vaults, secrets, then cleanup (default)
    vaults        Delete two vaults, recover one, purge the other
    secrets       Delete two secrets, recover one, purge the other
    cleanup       Remove leftover sample vaults and their tombstones

POLLING:
    Deletes and recoveries are acknowledged before they are visible.
    Each one is followed by a read probe polled at a fixed delay until
    the service reports the new state, up to the attempt budget.

ENVIRONMENT:
    COFFER_LOCATION             Vault placement label (default: local)
    COFFER_GROUP                Vault group label (default: coffer-samples)
    COFFER_PROPAGATION_LAG_MS   Simulated visibility lag (default: 150)
    COFFER_POLL_ATTEMPTS        Probe budget per wait (default: 15)
    COFFER_POLL_DELAY_MS        Delay between probes (default: 3000)

EXAMPLES:
    coffer-recovery                    # Full walkthrough
    coffer-recovery vaults
    coffer-recovery cleanup --lag-ms 0
    coffer-recovery secrets --attempts 30 --delay-ms 500

Press Ctrl-C during cleanup to stop pollers that are still waiting.
"#)]
struct Cli {
    /// Simulated propagation lag in milliseconds
    #[arg(long, global = true)]
    lag_ms: Option<u64>,

    /// Probe attempts per polling loop
    #[arg(long, global = true)]
    attempts: Option<u32>,

    /// Delay between probes in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full walkthrough
    Run,
    /// Vault delete, recover, and purge
    Vaults,
    /// Secret delete, recover, and purge
    Secrets,
    /// Remove leftover sample vaults
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = apply_overrides(
        Config::from_env().context("reading environment configuration")?,
        &cli,
    );
    let service = Arc::new(MemoryService::with_lag(config.propagation_lag));

    let (cancel_tx, cancel) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(&service, &config, cancel).await,
        Commands::Vaults => cmd_vaults(&service, &config).await,
        Commands::Secrets => cmd_secrets(&service, &config).await,
        Commands::Cleanup => cmd_cleanup(&service, &config, cancel).await,
    }
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(ms) = cli.lag_ms {
        config.propagation_lag = Duration::from_millis(ms);
    }
    if let Some(attempts) = cli.attempts {
        config.poll.max_attempts = attempts;
    }
    if let Some(ms) = cli.delay_ms {
        config.poll.retry_delay = Duration::from_millis(ms);
    }
    config
}

async fn cmd_run(
    service: &Arc<MemoryService>,
    config: &Config,
    cancel: watch::Receiver<bool>,
) -> Result<()> {
    println!("Precreating sample vaults");
    let vaults = precreate_vaults(service.as_ref(), config).await?;
    println!();

    println!("Vault recovery");
    vault_recovery(
        service.as_ref(),
        config,
        &vaults.to_recover,
        &vaults.to_purge,
    )
    .await?;
    println!();

    println!("Secret recovery");
    secret_recovery(service.as_ref(), config, &vaults.for_secrets).await?;
    println!();

    println!("Cleanup");
    let report = cleanup(service, config, cancel).await?;
    print_report(&report);
    Ok(())
}

async fn cmd_vaults(service: &Arc<MemoryService>, config: &Config) -> Result<()> {
    let vaults = precreate_vaults(service.as_ref(), config).await?;
    vault_recovery(
        service.as_ref(),
        config,
        &vaults.to_recover,
        &vaults.to_purge,
    )
    .await?;
    println!(
        "info: vaults {} and {} left behind; run cleanup to remove them",
        vaults.to_recover, vaults.for_secrets
    );
    Ok(())
}

async fn cmd_secrets(service: &Arc<MemoryService>, config: &Config) -> Result<()> {
    use coffer_core::model::CreateVaultOptions;
    use coffer_core::naming::sample_name;
    use coffer_core::VaultClient;

    let vault = sample_name("vault");
    service
        .create_vault(
            &vault,
            CreateVaultOptions::new(&config.location, &config.group),
        )
        .await
        .with_context(|| format!("creating vault {}", vault))?;
    println!("Created vault {}", vault);

    secret_recovery(service.as_ref(), config, &vault).await?;
    println!(
        "info: vault {} left behind; run cleanup to remove it",
        vault
    );
    Ok(())
}

async fn cmd_cleanup(
    service: &Arc<MemoryService>,
    config: &Config,
    cancel: watch::Receiver<bool>,
) -> Result<()> {
    let report = cleanup(service, config, cancel).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &CleanupReport) {
    if report.cancelled {
        println!("warning: cleanup cancelled before finishing");
    }
    println!(
        "success: {} vault(s) deleted, {} tombstone(s) purged",
        report.deleted.len(),
        report.purged.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_the_full_walkthrough() {
        let cli = Cli::try_parse_from(["coffer-recovery"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.lag_ms.is_none());
    }

    #[test]
    fn test_parses_overrides_after_the_subcommand() {
        let cli =
            Cli::try_parse_from(["coffer-recovery", "cleanup", "--lag-ms", "0", "--attempts", "3"])
                .unwrap();
        assert!(matches!(cli.command, Some(Commands::Cleanup)));
        assert_eq!(cli.lag_ms, Some(0));
        assert_eq!(cli.attempts, Some(3));
    }

    #[test]
    fn test_overrides_reach_the_config() {
        let cli = Cli::try_parse_from([
            "coffer-recovery",
            "--lag-ms",
            "10",
            "--delay-ms",
            "20",
            "vaults",
        ])
        .unwrap();
        let config = apply_overrides(Config::default(), &cli);
        assert_eq!(config.propagation_lag, Duration::from_millis(10));
        assert_eq!(config.poll.retry_delay, Duration::from_millis(20));
        assert_eq!(config.poll.max_attempts, 15);
    }

    #[test]
    fn test_rejects_unknown_flows() {
        assert!(Cli::try_parse_from(["coffer-recovery", "restore"]).is_err());
    }
}
