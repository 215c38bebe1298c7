//! Engine configuration.
//!
//! [`EngineConfig`] is a plain serde structure read from JSON. A repository-local
//! `.git-asset-state.json` wins over the per-user `config.json` in the configuration
//! directory; when neither exists the defaults are used.

use crate::core::dirs::get_config_directory;
use crate::core::error::{AssetStateError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const REPO_CONFIG_FILE: &str = ".git-asset-state.json";
pub const USER_CONFIG_FILE: &str = "config.json";

/// The maximum number of files submitted in a single backend invocation
pub const MAX_FILES_PER_BATCH: usize = 50;

/// Validity window of the lock cache, in seconds
pub const LOCK_CACHE_TTL_SECS: u64 = 30;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub git_binary: PathBuf,
    /// Bundled git-lfs executable; `git lfs` is used when unset or missing on disk
    pub lfs_binary: Option<PathBuf>,
    pub using_lfs_locking: bool,
    /// Identity recorded as lock owner; resolved from `git config user.name` when unset
    pub lock_user: Option<String>,
    pub status_branches: Vec<String>,
    /// Wildcards such as `origin/release/*` resolved with `git branch --remotes --list`
    pub status_branch_patterns: Vec<String>,
    pub lockable_extensions: Vec<String>,
    pub content_dir: String,
    pub reserved_paths: Vec<String>,
    pub max_files_per_batch: usize,
    pub lock_cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            lfs_binary: None,
            using_lfs_locking: true,
            lock_user: None,
            status_branches: Vec::new(),
            status_branch_patterns: Vec::new(),
            lockable_extensions: vec![".uasset".to_string(), ".umap".to_string()],
            content_dir: "Content/".to_string(),
            reserved_paths: vec![
                ".checksum".to_string(),
                "Binaries/".to_string(),
                "Plugins/".to_string(),
            ],
            max_files_per_batch: MAX_FILES_PER_BATCH,
            lock_cache_ttl_secs: LOCK_CACHE_TTL_SECS,
        }
    }
}

impl EngineConfig {
    /// Load the configuration for a repository, falling back to the user file then defaults
    pub fn load(repo_root: &Path) -> Result<Self> {
        let repo_file = repo_root.join(REPO_CONFIG_FILE);
        if repo_file.is_file() {
            log::debug!("Loading repository config from {}", repo_file.display());
            return Self::from_file(&repo_file);
        }

        match get_config_directory() {
            Ok(dir) => {
                let user_file = dir.join(USER_CONFIG_FILE);
                if user_file.is_file() {
                    log::debug!("Loading user config from {}", user_file.display());
                    return Self::from_file(&user_file);
                }
            }
            Err(e) => log::debug!("No user config directory: {e}"),
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AssetStateError::config_read_failed(path, e))?;
        serde_json::from_str(&content).map_err(|e| AssetStateError::config_parse_failed(path, e))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Lock cache lifetime, saturating at the largest representable duration
    pub fn lock_cache_ttl(&self) -> chrono::Duration {
        i64::try_from(self.lock_cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| {
                log::warn!(
                    "lock_cache_ttl_secs {} is out of range, locks stay cached",
                    self.lock_cache_ttl_secs
                );
                chrono::Duration::MAX
            })
    }
}
