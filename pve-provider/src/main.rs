//! pve-provider: drive single CRUD operations against a Proxmox VE cluster.
//!
//! Each invocation:
//! - Logs in with the provider flags (or `PROXMOX_*` environment variables)
//! - Reads the JSON state document(s) for one resource
//! - Runs the matching reconciler operation to completion
//! - Prints the resulting state document to stdout

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pve_provider::{Provider, ProviderArgs, ProviderConfig, ProviderError, ResourceKind};

/// Proxmox VE resource provider
#[derive(Parser, Debug)]
#[command(name = "pve-provider", version, about)]
struct Args {
    #[command(flatten)]
    provider: ProviderArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a resource from a planned state document
    Create {
        /// Resource type (e.g., proxmox_container)
        #[arg(long = "type", value_parser = parse_kind)]
        kind: ResourceKind,

        /// Planned state (JSON)
        #[arg(long)]
        state: PathBuf,
    },
    /// Refresh a state document from the cluster
    Read {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: ResourceKind,

        /// Current state (JSON)
        #[arg(long)]
        state: PathBuf,
    },
    /// Apply the difference between current and planned state
    Update {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: ResourceKind,

        /// Current state (JSON)
        #[arg(long)]
        state: PathBuf,

        /// Planned state (JSON)
        #[arg(long)]
        planned: PathBuf,
    },
    /// Delete the resource described by a state document
    Delete {
        #[arg(long = "type", value_parser = parse_kind)]
        kind: ResourceKind,

        /// Current state (JSON)
        #[arg(long)]
        state: PathBuf,
    },
}

fn parse_kind(s: &str) -> std::result::Result<ResourceKind, String> {
    s.parse().map_err(|e: ProviderError| e.to_string())
}

async fn load(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn emit(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout carries state documents, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pve_provider=info,pve_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = ProviderConfig::from(args.provider);
    let provider = Provider::configure(&config)
        .await
        .context("Failed to configure provider")?;

    match args.command {
        Command::Create { kind, state } => {
            let planned = load(&state).await?;
            let created = provider
                .create(kind, planned)
                .await
                .with_context(|| format!("Failed to create {}", kind))?;
            emit(&created)?;
        }
        Command::Read { kind, state } => {
            let current = load(&state).await?;
            let refreshed = provider
                .read(kind, current)
                .await
                .with_context(|| format!("Failed to read {}", kind))?;
            emit(&refreshed)?;
        }
        Command::Update {
            kind,
            state,
            planned,
        } => {
            let current = load(&state).await?;
            let planned = load(&planned).await?;
            let outcome = match provider.update(kind, current, planned).await {
                Ok(outcome) => outcome,
                Err(ProviderError::PartialUpdate {
                    state,
                    changes,
                    source,
                }) => {
                    // Emit what was applied so the caller can persist it
                    warn!(
                        resource = %kind,
                        applied = ?changes.applied_fields(),
                        pending = ?changes.pending_fields(),
                        "Update partially applied"
                    );
                    emit(&state)?;
                    return Err(anyhow::Error::new(*source)
                        .context(format!("Failed to update {}", kind)));
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e).context(format!("Failed to update {}", kind)));
                }
            };
            info!(
                resource = %kind,
                applied = ?outcome.changes.applied_fields(),
                "Update applied"
            );
            emit(&outcome.state)?;
        }
        Command::Delete { kind, state } => {
            let current = load(&state).await?;
            provider
                .delete(kind, current)
                .await
                .with_context(|| format!("Failed to delete {}", kind))?;
            info!(resource = %kind, "Resource deleted");
        }
    }

    Ok(())
}
