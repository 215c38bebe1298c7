//! Git repository management and setup utilities
//!
//! Provides functions for creating test repositories, remotes and clones, and for
//! running the binary inside them.

#![allow(dead_code)]

use assert_cmd::prelude::*;
use git_asset_state::core::config::{EngineConfig, REPO_CONFIG_FILE};
use git_asset_state::core::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Test repository setup result containing both the temporary directory
/// and the repository path. The TempDir must be kept alive for the duration
/// of the test to prevent cleanup.
pub struct TestRepo {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The binary, run from the repository root
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("git-asset-state").expect("binary is built");
        cmd.current_dir(&self.path);
        cmd
    }
}

/// Runs `git <args>` in `dir`, failing on a non-zero exit
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).current_dir(dir).output()?;
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn configure_user(dir: &Path) -> Result<()> {
    git(dir, &["config", "user.name", "Test User"])?;
    git(dir, &["config", "user.email", "test@example.com"])?;
    git(dir, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

/// Writes a repository config with LFS locking turned off, so tests do not depend on
/// git-lfs being installed
pub fn write_engine_config(repo_path: &Path, config: &EngineConfig) -> Result<()> {
    config.save(&repo_path.join(REPO_CONFIG_FILE))
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        using_lfs_locking: false,
        lock_user: Some("Test User".to_string()),
        ..Default::default()
    }
}

/// Sets up a fresh git repository with a committed engine config
pub fn setup_test_repo() -> Result<TestRepo> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("project");
    fs::create_dir_all(&path)?;

    git(&path, &["init", "--quiet"])?;
    configure_user(&path)?;
    write_engine_config(&path, &test_config())?;
    git_add(&path, REPO_CONFIG_FILE)?;
    git_commit(&path, "Add engine config")?;

    Ok(TestRepo { temp_dir, path })
}

/// Sets up a repository with `Content/Hero.uasset` committed
pub fn setup_test_repo_with_asset() -> Result<TestRepo> {
    let repo = setup_test_repo()?;
    create_file(&repo.path, "Content/Hero.uasset", "hero v1\n")?;
    git_add(&repo.path, ".")?;
    git_commit(&repo.path, "Add hero")?;
    Ok(repo)
}

/// Creates a file, and its parent directories, with specified content
pub fn create_file(repo_path: &Path, filename: &str, content: &str) -> Result<()> {
    let path = repo_path.join(filename);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

pub fn remove_file(repo_path: &Path, filename: &str) -> Result<()> {
    fs::remove_file(repo_path.join(filename))?;
    Ok(())
}

pub fn git_add(repo_path: &Path, filename: &str) -> Result<()> {
    git(repo_path, &["add", filename])?;
    Ok(())
}

pub fn git_commit(repo_path: &Path, message: &str) -> Result<()> {
    git(repo_path, &["commit", "--quiet", "-m", message])?;
    Ok(())
}

/// A bare remote seeded from `repo`, plus a second clone of it playing a teammate.
///
/// `repo` tracks the remote's branch afterwards.
pub fn setup_remote_and_teammate(repo: &TestRepo) -> Result<PathBuf> {
    let remote = repo.temp_dir.path().join("remote.git");
    let teammate = repo.temp_dir.path().join("teammate");
    let base = repo.temp_dir.path();

    let remote_arg = remote.to_string_lossy().into_owned();
    let teammate_arg = teammate.to_string_lossy().into_owned();

    git(base, &["init", "--quiet", "--bare", remote_arg.as_str()])?;
    git(&repo.path, &["remote", "add", "origin", remote_arg.as_str()])?;
    git(&repo.path, &["push", "--quiet", "-u", "origin", "HEAD"])?;
    git(
        base,
        &["clone", "--quiet", remote_arg.as_str(), teammate_arg.as_str()],
    )?;
    configure_user(&teammate)?;

    Ok(teammate)
}
