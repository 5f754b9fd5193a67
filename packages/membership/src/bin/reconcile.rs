// Batch runner: applies a ledger file to a directory snapshot file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{de::DeserializeOwned, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use membership::{AccountRecord, LedgerEntry, MemoryDirectory, ReconcileConfig, Reconciler, TracingNotifier};

#[derive(Parser, Debug)]
#[command(name = "reconcile", about = "Apply paid ledger entries to the member directory")]
struct Args {
    /// Ledger batch (JSON array of entries). Processed stamps are written back.
    #[arg(long)]
    ledger: PathBuf,

    /// Directory snapshot (JSON array of accounts). Created if missing.
    #[arg(long)]
    directory: PathBuf,

    /// Run the batch but write nothing back.
    #[arg(long)]
    dry_run: bool,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,membership=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = ReconcileConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(scope = %config.scope, domain = %config.domain, "Configuration loaded");

    let mut entries: Vec<LedgerEntry> = read_json(&args.ledger)?;
    let accounts: Vec<AccountRecord> = if args.directory.exists() {
        read_json(&args.directory)?
    } else {
        tracing::warn!(path = %args.directory.display(), "No directory snapshot, starting empty");
        vec![]
    };

    let directory = Arc::new(MemoryDirectory::new(config.scope.clone()).with_records(accounts));
    let reconciler = Reconciler::new(config, directory.clone(), Arc::new(TracingNotifier::new()));

    let report = reconciler
        .run_batch(&mut entries)
        .await
        .context("Batch failed")?;

    if args.dry_run {
        tracing::info!("Dry run, nothing written");
    } else {
        write_json(&args.ledger, &entries)?;
        write_json(&args.directory, &directory.snapshot().await)?;
    }

    println!("{}", report);
    Ok(())
}
