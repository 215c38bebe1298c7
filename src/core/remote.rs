//! Remote divergence detection.
//!
//! For every watched branch (configured status branches plus the current upstream) the
//! checker lists files touched by commits that are on the branch but not in HEAD
//! (`git log ..branch`). When status branches are configured it also takes the
//! three-dot diff against the branch and keeps only files present in both lists, so a
//! file that was changed and later reverted on the branch is not reported as stale.
//!
//! Lockable files are reported per path with the branch that is ahead. Other files
//! only matter when they land on the current upstream under a reserved path
//! (`Binaries/`, `Plugins/`, `.checksum`): those mean the running binaries are out of
//! date and a restart is pending after the next pull.

use crate::core::lockable::LockableTypes;
use crate::core::paths::absolute_path;
use crate::core::runner::GitRunner;
use crate::core::state::{PartialStateUpdate, RemoteStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Inputs of one divergence check
#[derive(Debug, Clone, Default)]
pub struct RemoteCheck {
    pub status_branches: Vec<String>,
    /// Upstream of the current branch (`origin/main`), if any
    pub upstream: Option<String>,
    /// Pathspecs the log and diff are restricted to
    pub diff_paths: Vec<String>,
    /// Non-lockable paths whose arrival on the upstream requires a restart
    pub reserved_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DivergenceReport {
    /// Absolute path of each lockable file that is newer on a watched branch
    pub newer_files: HashMap<PathBuf, RemoteStatus>,
    pub pending_restart: bool,
    pub errors: Vec<String>,
}

impl DivergenceReport {
    /// Write remote state into the updates already collected for a pass.
    ///
    /// Files without an update are not tracked by the caller and are ignored.
    pub fn apply(&self, updates: &mut HashMap<PathBuf, PartialStateUpdate>) {
        for (path, remote) in &self.newer_files {
            if let Some(update) = updates.get_mut(path) {
                update.remote = Some(remote.clone());
            }
        }
    }
}

impl RemoteCheck {
    /// Branches to compare against, status branches first, upstream last and unique
    pub fn branches(&self) -> Vec<String> {
        let mut branches: Vec<String> = Vec::new();
        for branch in self.status_branches.iter().chain(self.upstream.iter()) {
            if !branches.contains(branch) {
                branches.push(branch.clone());
            }
        }
        branches
    }

    fn is_upstream(&self, branch: &str) -> bool {
        self.upstream.as_deref() == Some(branch)
    }

    fn is_reserved(&self, file: &str) -> bool {
        self.reserved_paths.iter().any(|reserved| {
            if reserved.ends_with('/') {
                file.get(..reserved.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(reserved))
            } else {
                file == reserved
            }
        })
    }

    pub fn run(&self, runner: &GitRunner, lockable: &LockableTypes) -> DivergenceReport {
        let mut report = DivergenceReport::default();
        let branches = self.branches();
        if branches.is_empty() {
            log::debug!("No status branches or upstream, skipping remote check");
            return report;
        }

        let mut newer: HashMap<PathBuf, String> = HashMap::new();
        for branch in &branches {
            let on_upstream = self.is_upstream(branch);
            let Some(changed) = self.changed_on_branch(runner, branch, &mut report.errors) else {
                continue;
            };

            for file in changed {
                if !lockable.is_file_lockable(&file) {
                    if on_upstream && self.is_reserved(&file) {
                        log::info!("'{file}' changed on {branch}, restart pending");
                        report.pending_restart = true;
                    }
                    continue;
                }
                let path = absolute_path(runner.repo_root(), &file);
                // The upstream outranks other status branches
                if on_upstream || !newer.contains_key(&path) {
                    newer.insert(path, branch.clone());
                }
            }
        }

        report.newer_files = newer
            .into_iter()
            .map(|(path, branch)| {
                let status = if self.is_upstream(&branch) {
                    RemoteStatus::NotAtHead(branch)
                } else {
                    RemoteStatus::NotLatest(branch)
                };
                (path, status)
            })
            .collect();
        report
    }

    /// Files changed on `branch` but not in HEAD; `None` when the log fails
    fn changed_on_branch(
        &self,
        runner: &GitRunner,
        branch: &str,
        errors: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        let log_params = vec![
            "--pretty=".to_string(),
            "--name-only".to_string(),
            format!("..{branch}"),
            "--".to_string(),
        ];
        let log = runner.run_command("log", &log_params, &self.diff_paths);
        if !log.success {
            errors.extend(log.errors);
            return None;
        }

        if self.status_branches.is_empty() {
            return Some(log.results);
        }

        let diff_params = vec![
            "--name-only".to_string(),
            format!("...{branch}"),
            "--".to_string(),
        ];
        let diff = runner.run_command("diff", &diff_params, &self.diff_paths);
        errors.extend(diff.errors);

        Some(
            diff.results
                .into_iter()
                .filter(|file| log.results.contains(file))
                .collect(),
        )
    }
}
