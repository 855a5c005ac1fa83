mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    inspect, new_document, pull, push, validate, widgets, InspectArgs, NewArgs, PullArgs,
    PushArgs, ValidateArgs,
};
use config::Config;

/// Lumo CLI - Tooling for Lumo Creator lesson documents
#[derive(Parser, Debug)]
#[command(name = "lumo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that blobs load cleanly
    Validate(ValidateArgs),

    /// Print a document outline
    Inspect(InspectArgs),

    /// Create an empty document blob
    New(NewArgs),

    /// List the builtin widget types
    Widgets,

    /// Store a blob in the document store
    Push(PushArgs),

    /// Fetch a blob from the document store
    Pull(PullArgs),
}

async fn run(command: Command, cwd: &str) -> anyhow::Result<()> {
    let config = Config::load(cwd)?;

    match command {
        Command::Validate(args) => validate(args, &config),
        Command::Inspect(args) => inspect(args, &config),
        Command::New(args) => new_document(args, &config),
        Command::Widgets => widgets(),
        Command::Push(args) => push(args, &config, cwd).await,
        Command::Pull(args) => pull(args, &config, cwd).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => run(cli.command, &cwd.display().to_string()).await,
        Err(err) => Err(anyhow::anyhow!("Cannot get current directory: {}", err)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
