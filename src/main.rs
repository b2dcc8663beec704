// ABOUTME: Entry point for the pagepush CLI application.
// ABOUTME: Parses arguments, wires Ctrl-C to cancellation, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, EventArgs};
use commands::DeployArgs;
use pagepush::config::Config;
use pagepush::error::Result;
use pagepush::output::{Output, OutputMode};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    if let Err(e) = run(cli, mode, cancel).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode, cancel: CancellationToken) -> Result<()> {
    let cwd = env::current_dir()?;
    let output = Output::new(mode);

    match cli.command {
        Commands::Init { repository, force } => {
            commands::init(&cwd, repository.as_deref(), force, &output)
        }
        Commands::Deploy {
            dir,
            event: EventArgs { event, branch, pr },
            sha,
            patterns,
            target,
            dry_run,
            force,
        } => {
            let config = Config::discover_or_default(&cwd)?;
            let args = DeployArgs {
                dir,
                event,
                branch,
                pr,
                sha,
                patterns,
                target,
                dry_run,
                force,
            };
            commands::deploy(config, args, cancel, output).await
        }
        Commands::Rollback { to } => {
            let config = Config::discover_or_default(&cwd)?;
            commands::rollback(config, to, cancel, output).await
        }
        Commands::Preview { dir, patterns } => {
            let config = Config::discover_or_default(&cwd)?;
            commands::preview(&config, &dir, patterns, &output)
        }
        Commands::Path {
            event: EventArgs { event, branch, pr },
        } => {
            let config = Config::discover_or_default(&cwd)?;
            commands::path(&config, event, branch, pr, &output)
        }
    }
}
