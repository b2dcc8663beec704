// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pagepush")]
#[command(about = "Publish CI build artifacts to a static-hosting branch")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CI context overrides; unset values come from the GitHub Actions environment.
#[derive(Args, Debug, Default, Clone)]
pub struct EventArgs {
    /// Triggering event name (e.g. push, pull_request)
    #[arg(long)]
    pub event: Option<String>,

    /// Source branch or ref
    #[arg(long)]
    pub branch: Option<String>,

    /// Pull request number
    #[arg(long)]
    pub pr: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a pagepush.yml template in the current directory
    Init {
        /// Repository as owner/name
        #[arg(long)]
        repository: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Publish a directory of artifacts
    Deploy {
        /// Directory holding the built site
        dir: PathBuf,

        #[command(flatten)]
        event: EventArgs,

        /// Source commit recorded in the commit message
        #[arg(long)]
        sha: Option<String>,

        /// Extra cleanup pattern (repeatable)
        #[arg(long = "pattern")]
        patterns: Vec<String>,

        /// Deploy to this exact path instead of resolving one (e.g. pr/42)
        #[arg(long)]
        target: Option<String>,

        /// Do everything except pushing
        #[arg(long)]
        dry_run: bool,

        /// Force-push the target branch
        #[arg(long)]
        force: bool,
    },

    /// Reset the target branch to an earlier commit
    Rollback {
        /// Commit to restore
        #[arg(long)]
        to: String,
    },

    /// List what cleanup would remove from a directory
    Preview {
        dir: PathBuf,

        /// Extra cleanup pattern (repeatable)
        #[arg(long = "pattern")]
        patterns: Vec<String>,
    },

    /// Print the deployment path for a CI context
    Path {
        #[command(flatten)]
        event: EventArgs,
    },
}
