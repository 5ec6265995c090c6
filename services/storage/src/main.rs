//! Storage CLI - Maintenance commands for the dashboard bucket
//!
//! Usage:
//!   # List icons:
//!   cargo run --bin storage -- list --prefix sg-dashboard/assets/icons/
//!
//!   # Fetch a document:
//!   cargo run --bin storage -- download sg-dashboard/dashboard.json ./dashboard.json
//!
//!   # Remove a blob:
//!   cargo run --bin storage -- delete sg-dashboard/assets/icons/old.svg

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storage::{build_store, StorageConfig};
use tokio::fs;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storage", about = "Inspects and maintains the dashboard bucket")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List blobs under a prefix
    List {
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Download a blob to a local file
    Download { remote: String, local: PathBuf },
    /// Upload a local file to a blob path
    Upload { local: PathBuf, remote: String },
    /// Delete a blob
    Delete { remote: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = StorageConfig::from_env().context("Invalid storage configuration")?;
    let store = build_store(&config).context("Failed to build storage backend")?;

    println!("=== Dashboard Storage ===");
    println!("Backend: {}", store.location());

    match args.command {
        Command::List { prefix } => {
            let blobs = store.list(&prefix).await.context("Failed to list blobs")?;
            println!("{:-<60}", "");
            for blob in &blobs {
                println!("  {} ({} bytes)", blob.name, blob.size);
                println!("      {}", blob.url);
            }
            println!("{:-<60}", "");
            println!("{} blob(s)", blobs.len());
        }
        Command::Download { remote, local } => {
            let bytes = store
                .download(&remote)
                .await
                .context("Failed to download blob")?
                .with_context(|| format!("Blob not found: {}", remote))?;
            if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&local, &bytes).await?;
            println!("✓ {} -> {} ({} bytes)", remote, local.display(), bytes.len());
        }
        Command::Upload { local, remote } => {
            let receipt = store
                .upload(&local, &remote)
                .await
                .context("Failed to upload file")?;
            println!("✓ {} -> {}", local.display(), receipt.url);
            println!("  Hash: {}", receipt.checksum);
        }
        Command::Delete { remote } => {
            store.delete(&remote).await.context("Failed to delete blob")?;
            println!("✓ Deleted {}", remote);
        }
    }

    Ok(())
}
