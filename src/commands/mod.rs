//! One module per CLI subcommand.
//!
//! Every command opens the [`Engine`] for the repository containing the current
//! directory, runs one operation, and prints either colored text or `--json`.

pub mod fetch;
pub mod history;
pub mod lockable;
pub mod locks;
pub mod pull;
pub mod remote;
pub mod status;

pub use fetch::*;
pub use history::*;
pub use lockable::*;
pub use locks::*;
pub use pull::*;
pub use remote::*;
pub use status::*;

use crate::core::{engine::Engine, error::Result, output::print_warning, paths::normalize};
use path_slash::PathExt as _;
use std::env;
use std::path::{Path, PathBuf};

/// Engine for the repository containing the current directory
pub(crate) fn open_engine() -> Result<Engine> {
    let current_dir = env::current_dir()?;
    Engine::open(&current_dir)
}

/// Absolute form of command-line paths, resolved against the current directory
pub(crate) fn resolve_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let current_dir = env::current_dir()?;
    Ok(paths
        .iter()
        .map(|path| normalize(&current_dir.join(path)))
        .collect())
}

/// `path` relative to the repository root for display, or as given when outside it
pub(crate) fn display_path(engine: &Engine, path: &Path) -> String {
    path.strip_prefix(engine.repo_root())
        .unwrap_or(path)
        .to_slash_lossy()
        .into_owned()
}

/// Backend errors that did not stop the command
pub(crate) fn report_errors(errors: &[String]) {
    for error in errors {
        log::debug!("backend: {error}");
        print_warning(error);
    }
}
