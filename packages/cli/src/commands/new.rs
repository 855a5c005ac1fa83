use super::content_id_for;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use lumo_editor::{serialize_pretty, Command, Document, Registry};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Where to write the new blob
    pub output: PathBuf,

    /// Document tag (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Widget type of the root node
    #[arg(short, long, default_value = "canvas")]
    pub root: String,

    /// Force overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

pub(crate) fn build_document(args: &NewArgs) -> Result<Document> {
    let registry = Arc::new(Registry::builtin());
    if !registry.accepts_children(&args.root) {
        return Err(anyhow::anyhow!(
            "Root widget must be a container type, got: {}",
            args.root
        ));
    }

    let mut doc = Document::with_root(registry, &content_id_for(&args.output), &args.root)?;
    if !args.tags.is_empty() {
        Command::SetTags {
            tags: args.tags.clone(),
        }
        .apply(&mut doc)?;
    }
    Ok(doc)
}

pub fn new_document(args: NewArgs, _config: &Config) -> Result<()> {
    if args.output.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            args.output.display().to_string().bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let doc = build_document(&args)?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&args.output, serialize_pretty(&doc)?)?;

    println!("  {} Created {}", "✓".green(), args.output.display());
    println!("     Root: {} ({})", doc.root_id(), args.root);
    if !args.tags.is_empty() {
        println!("     Tags: {}", args.tags.join(", "));
    }

    Ok(())
}
