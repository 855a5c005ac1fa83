use super::content_id_for;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use lumo_editor::{deserialize, serialize_pretty, Document, Registry};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Blob file to inspect
    pub input: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn inspect(args: InspectArgs, config: &Config) -> Result<()> {
    let blob = fs::read_to_string(&args.input)?;
    let registry = Arc::new(Registry::builtin());
    let loaded = deserialize(
        &blob,
        registry,
        &content_id_for(&args.input),
        config.editor.load_mode(),
    )?;
    let doc = &loaded.document;

    match args.format.as_str() {
        "json" => {
            println!("{}", serialize_pretty(doc)?);
        }
        "text" => {
            println!("📄 {}", args.input.display().to_string().bright_white().bold());
            println!("   Nodes: {}", doc.len());
            if !doc.tags().is_empty() {
                println!("   Tags:  {}", doc.tags().join(", "));
            }
            if !loaded.placeholders.is_empty() {
                println!(
                    "   {} {}",
                    "Placeholders:".yellow(),
                    loaded.placeholders.join(", ")
                );
            }
            println!();
            for line in outline(doc) {
                println!("{}", line);
            }
        }
        other => {
            return Err(anyhow::anyhow!(
                "Unknown format: {}. Use: text or json",
                other
            ))
        }
    }

    Ok(())
}

/// One line per node in render order, indented by depth
fn outline(doc: &Document) -> Vec<String> {
    let registry = doc.registry();
    doc.subtree(doc.root_id())
        .map(|node| {
            let depth = doc.ancestors(&node.id).count();
            let rendered = registry.render(node);

            let mut line = format!("{}{} <{}>", "  ".repeat(depth), node.widget, rendered.element);
            if !rendered.label.is_empty() {
                line.push_str(&format!(" \"{}\"", rendered.label));
            }
            if node.locked {
                line.push_str(" [locked]");
            }
            if rendered.opaque {
                line.push_str(" [placeholder]");
            }
            line.push_str(&format!("  {}", node.id.dimmed()));
            line
        })
        .collect()
}
