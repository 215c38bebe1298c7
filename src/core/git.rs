//! Repository discovery and metadata queries.
//!
//! Discovery goes through `git2` ([`GitRepo`], [`find_root_directory`]); everything that
//! must match what the `git` executable itself reports (branch names, upstreams, remote
//! URLs, tracked files) is asked through the [`GitRunner`].
//!
//! # Public API
//! - [`GitRepo`]: opened repository handle
//! - [`find_root_directory`]: working tree root containing a path
//! - Metadata queries: [`get_branch_name`], [`get_remote_branch_name`],
//!   [`get_remote_branches_wildcard`], [`get_commit_info`], [`get_remote_url`],
//!   [`get_user_config`], [`list_files_in_directory_recurse`]

use crate::core::{
    error::{AssetStateError, Result},
    paths::{absolute_filenames, normalize},
    runner::GitRunner,
};
use git2::Repository;
use std::path::{Path, PathBuf};

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path)?;
        Ok(GitRepo { repo })
    }

    /// Absolute working tree root
    pub fn root(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(normalize)
            .ok_or(AssetStateError::NotInGitRepo)
    }

    pub fn get_repository(&self) -> &Repository {
        &self.repo
    }

    /// `user.name` / `user.email` from the merged git configuration
    pub fn get_user_config(&self) -> (Option<String>, Option<String>) {
        match self.repo.config() {
            Ok(config) => (
                config.get_string("user.name").ok(),
                config.get_string("user.email").ok(),
            ),
            Err(e) => {
                log::debug!("Could not read git config: {e}");
                (None, None)
            }
        }
    }
}

/// Working tree root of the repository containing `path`.
///
/// Falls back to looking for a `.git` entry in the ancestors when libgit2 cannot open
/// the repository (unsupported extensions, partial clones).
pub fn find_root_directory(path: &Path) -> Option<PathBuf> {
    match Repository::discover(path) {
        Ok(repo) => {
            if let Some(workdir) = repo.workdir() {
                return Some(normalize(workdir));
            }
        }
        Err(e) => log::debug!("git2 discovery failed for {}: {e}", path.display()),
    }

    path.ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(normalize)
}

/// Current branch, or `HEAD detached at <hash>`
pub fn get_branch_name(runner: &GitRunner) -> Result<String> {
    let output = runner.run_command(
        "symbolic-ref",
        &["--short".to_string(), "--quiet".to_string(), "HEAD".to_string()],
        &[],
    );
    if let (true, Some(branch)) = (output.success, output.results.first()) {
        return Ok(branch.clone());
    }

    let detached = runner.run_command(
        "log",
        &["-1".to_string(), "--format=%h".to_string()],
        &[],
    );
    match detached.results.first() {
        Some(hash) if detached.success => Ok(format!("HEAD detached at {hash}")),
        _ => Err(AssetStateError::command_failed("symbolic-ref", &detached.errors)),
    }
}

/// Upstream of the current branch (`origin/main`)
pub fn get_remote_branch_name(runner: &GitRunner) -> Result<String> {
    let output = runner.run_command(
        "rev-parse",
        &[
            "--abbrev-ref".to_string(),
            "--symbolic-full-name".to_string(),
            "@{u}".to_string(),
        ],
        &[],
    );
    match output.results.first() {
        Some(upstream) if output.success => Ok(upstream.clone()),
        _ => {
            log::debug!("No upstream branch: {}", output.errors.join(" | "));
            Err(AssetStateError::NoUpstreamBranch)
        }
    }
}

/// Remote branches matching `pattern` (`origin/release/*`)
pub fn get_remote_branches_wildcard(runner: &GitRunner, pattern: &str) -> Result<Vec<String>> {
    let output = runner.run_command(
        "branch",
        &[
            "--remotes".to_string(),
            "--list".to_string(),
            pattern.to_string(),
        ],
        &[],
    );
    let branches = output.into_result("branch")?;
    Ok(branches
        .iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.contains(" -> "))
        .collect())
}

/// `(full hash, subject)` of HEAD
pub fn get_commit_info(runner: &GitRunner) -> Result<(String, String)> {
    let output = runner.run_command(
        "log",
        &["-1".to_string(), "--format=%H %s".to_string()],
        &[],
    );
    let lines = output.into_result("log")?;
    let line = lines.first().map(String::as_str).unwrap_or_default();
    let (hash, subject) = line.split_once(' ').unwrap_or((line, ""));
    Ok((hash.to_string(), subject.to_string()))
}

pub fn get_remote_url(runner: &GitRunner) -> Result<String> {
    let output = runner.run_command(
        "remote",
        &["get-url".to_string(), "origin".to_string()],
        &[],
    );
    let lines = output.into_result("remote")?;
    Ok(lines.into_iter().next().unwrap_or_default())
}

/// `user.name` and `user.email` as seen by the git executable
pub fn get_user_config(runner: &GitRunner) -> (Option<String>, Option<String>) {
    let read = |key: &str| {
        let output = runner.run_command("config", &[key.to_string()], &[]);
        if output.success {
            output.results.into_iter().next()
        } else {
            None
        }
    };
    (read("user.name"), read("user.email"))
}

/// Every tracked file under `directory`, as absolute paths
pub fn list_files_in_directory_recurse(
    runner: &GitRunner,
    directory: &Path,
) -> Result<Vec<PathBuf>> {
    let output = runner.run_command(
        "ls-files",
        &[],
        &[directory.to_string_lossy().into_owned()],
    );
    let files = output.into_result("ls-files")?;
    Ok(absolute_filenames(&files, runner.repo_root()))
}
