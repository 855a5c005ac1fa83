use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use lumo_editor::{deserialize, Registry};
use lumo_workspace::{DirectoryGateway, LoadOutcome, PersistenceGateway};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Blob file to store
    pub input: PathBuf,

    /// Content id to store it under
    #[arg(long)]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Content id to fetch
    #[arg(long, required_unless_present = "latest", conflicts_with = "latest")]
    pub id: Option<String>,

    /// Fetch whichever document was stored most recently
    #[arg(long)]
    pub latest: bool,

    /// Where to write the blob
    pub output: PathBuf,
}

/// Validate a blob and put it in the store
pub async fn push(args: PushArgs, config: &Config, cwd: &str) -> Result<()> {
    let blob = fs::read_to_string(&args.input)?;

    // Refuse to store something that would not load again
    let loaded = deserialize(
        &blob,
        Arc::new(Registry::builtin()),
        &args.id,
        config.editor.load_mode(),
    )?;

    let store_dir = config.get_store_dir(cwd);
    tracing::debug!(store = %store_dir.display(), id = %args.id, "Pushing blob");
    let gateway = DirectoryGateway::new(store_dir);
    gateway.save(&args.id, blob).await?;

    println!(
        "  {} Stored {} as {} ({} nodes)",
        "✓".green(),
        args.input.display(),
        args.id.bright_white(),
        loaded.document.len()
    );
    Ok(())
}

/// Fetch a stored blob into a file
pub async fn pull(args: PullArgs, config: &Config, cwd: &str) -> Result<()> {
    let gateway = DirectoryGateway::new(config.get_store_dir(cwd));

    let outcome = match &args.id {
        Some(id) => gateway.load(id).await?,
        None => gateway.load_latest().await?,
    };

    let stored = match outcome {
        LoadOutcome::Found(stored) => stored,
        LoadOutcome::NotFound => {
            return Err(anyhow::anyhow!(
                "Nothing stored under {}",
                args.id.as_deref().unwrap_or("any id")
            ))
        }
    };

    fs::write(&args.output, &stored.blob)?;
    println!(
        "  {} Wrote {} to {} (saved {})",
        "✓".green(),
        stored.content_id.bright_white(),
        args.output.display(),
        stored.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}
