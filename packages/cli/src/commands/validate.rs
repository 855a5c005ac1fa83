use super::content_id_for;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use lumo_editor::{deserialize, LoadMode, Registry};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Blob file, or a directory searched for .json blobs
    pub input: PathBuf,

    /// Keep unknown widget types as placeholders instead of failing
    #[arg(short, long)]
    pub tolerant: bool,
}

/// Outcome of checking one blob
#[derive(Debug, PartialEq)]
pub(crate) enum Verdict {
    Valid { nodes: usize, placeholders: usize },
    Invalid(String),
}

pub(crate) fn check_blob(path: &Path, registry: &Arc<Registry>, mode: LoadMode) -> Result<Verdict> {
    let blob = fs::read_to_string(path)?;

    let loaded = match deserialize(&blob, Arc::clone(registry), &content_id_for(path), mode) {
        Ok(loaded) => loaded,
        Err(err) => return Ok(Verdict::Invalid(err.to_string())),
    };

    Ok(match loaded.document.check_integrity() {
        Ok(()) => Verdict::Valid {
            nodes: loaded.document.len(),
            placeholders: loaded.placeholders.len(),
        },
        Err(defect) => Verdict::Invalid(defect.to_string()),
    })
}

pub fn validate(args: ValidateArgs, config: &Config) -> Result<()> {
    let mode = if args.tolerant {
        LoadMode::Tolerant
    } else {
        config.editor.load_mode()
    };

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_blobs(&args.input)
    } else {
        return Err(anyhow::anyhow!(
            "Input path does not exist: {}",
            args.input.display()
        ));
    };

    println!("🔍 {} {} blob(s)", "Validating".green().bold(), files.len());
    println!();

    let registry = Arc::new(Registry::builtin());
    let mut failed = 0;

    for file in &files {
        match check_blob(file, &registry, mode)? {
            Verdict::Valid {
                nodes,
                placeholders: 0,
            } => {
                println!("  {} {} ({} nodes)", "✓".green(), file.display(), nodes);
            }
            Verdict::Valid {
                nodes,
                placeholders,
            } => {
                println!(
                    "  {} {} ({} nodes, {} placeholders)",
                    "⚠️".yellow(),
                    file.display(),
                    nodes,
                    placeholders
                );
            }
            Verdict::Invalid(reason) => {
                failed += 1;
                println!("  {} {}: {}", "✗".red(), file.display(), reason);
            }
        }
    }

    println!();
    if failed > 0 {
        return Err(anyhow::anyhow!(
            "{} of {} blob(s) failed validation",
            failed,
            files.len()
        ));
    }

    println!("{}", "✅ All blobs valid".green().bold());
    Ok(())
}

fn find_blobs(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"{"version":1,"rootId":"r","nodes":{"r":{"type":"canvas","children":["w"]},"w":{"type":"legacy-widget"}}}"#;

    #[test]
    fn test_check_blob() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::builtin());

        let legacy = dir.path().join("legacy.json");
        fs::write(&legacy, LEGACY).unwrap();

        assert!(matches!(
            check_blob(&legacy, &registry, LoadMode::Strict).unwrap(),
            Verdict::Invalid(_)
        ));
        assert_eq!(
            check_blob(&legacy, &registry, LoadMode::Tolerant).unwrap(),
            Verdict::Valid {
                nodes: 2,
                placeholders: 1
            }
        );
    }

    #[test]
    fn test_find_blobs_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("nested/b.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = find_blobs(dir.path());
        assert_eq!(found.len(), 2);
    }
}
