use anyhow::Context;
use clap::{Parser, Subcommand};
use git_asset_state::commands::*;
use git_asset_state::core::{
    error::{AssetStateError, Result},
    print_error,
};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-asset-state")]
#[command(about = "Git and Git LFS state of the assets in a repository")]
#[command(version = "0.1.0")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Print machine-readable JSON instead of colored text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh and show file, lock and remote state
    Status {
        /// Files or directories to refresh (default: the whole repository)
        paths: Vec<PathBuf>,
    },
    /// List LFS locks
    Locks {
        /// Ignore the lock cache and ask the server
        #[arg(short, long)]
        force: bool,
    },
    /// Show lockable files that are newer on the upstream or a status branch
    Remote,
    /// Show the revisions of a file
    History {
        file: PathBuf,
        /// Only the incoming revision of an unresolved merge
        #[arg(long)]
        conflict: bool,
    },
    /// Check which wildcard patterns are marked lockable in .gitattributes
    Lockable {
        /// Patterns such as "*.uasset"
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Refresh locks and fetch from the remote
    Fetch,
    /// Rebase onto the upstream branch
    Pull,
}

fn run(command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Status { paths } => execute_status(paths, json),
        Commands::Locks { force } => execute_locks(force, json),
        Commands::Remote => execute_remote(json),
        Commands::History { file, conflict } => execute_history(file, conflict, json),
        Commands::Lockable { patterns } => execute_lockable(patterns, json),
        Commands::Fetch => execute_fetch(json),
        Commands::Pull => execute_pull(json),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::try_init().context("failed to initialise logging")?;

    if let Err(e) = run(cli.command, cli.json) {
        if let AssetStateError::NotInGitRepo = e {
            print_error("Not in a git repository");
        } else {
            print_error(&e.to_string());
        }
        std::process::exit(1);
    }

    Ok(())
}
