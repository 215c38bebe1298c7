//! Time-bounded cache of git-lfs lock ownership.
//!
//! Querying the lock server is slow, while status refreshes ask for lock state
//! constantly. [`LockCache`] keeps the last known `path -> owner` mapping and only goes
//! back to the server when the mapping is older than its TTL or the caller forces it.
//! When the server cannot be reached it degrades to git-lfs' own offline views, and
//! failing that to whatever is already in memory.
//!
//! Every change to the mapping is reported to a [`LockChangeHook`]; the default
//! [`ReadOnlyToggle`] makes files writable while the operator holds their lock and
//! read-only again when it is released.
//!
//! # Public API
//! - [`LockCache`]: `get_all_locks`, `set_locked_files`, `add_locked_file`, `remove_locked_file`
//! - [`LockQuery`] / [`LockScope`]: the lock listing source (implemented by [`GitRunner`])
//! - [`LockChangeHook`] / [`ReadOnlyToggle`]: lock transition side effects

use crate::core::lock_parser::parse_lock_lines;
use crate::core::runner::{CommandOutput, GitRunner};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Which lock listing to ask git-lfs for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    /// Authoritative listing from the lock server
    Remote,
    /// Last listing git-lfs received from the server
    Cached,
    /// Locks this clone created itself
    Local,
}

impl LockScope {
    pub fn params(self) -> Vec<String> {
        match self {
            LockScope::Remote => Vec::new(),
            LockScope::Cached => vec!["--cached".to_string()],
            LockScope::Local => vec!["--local".to_string()],
        }
    }
}

/// Source of raw lock listings
pub trait LockQuery {
    fn query_locks(&self, scope: LockScope) -> CommandOutput;
}

impl LockQuery for GitRunner {
    fn query_locks(&self, scope: LockScope) -> CommandOutput {
        self.run_lfs_command("locks", &scope.params(), &[])
    }
}

/// Side effect run whenever a path gains or loses a lock
pub trait LockChangeHook: Send + Sync {
    fn on_lock_changed(&self, path: &Path, user: &str, locked: bool);
}

/// Toggles the read-only bit of files whose lock the operator gains or loses
#[derive(Debug, Clone)]
pub struct ReadOnlyToggle {
    operator: String,
}

impl ReadOnlyToggle {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
        }
    }
}

impl LockChangeHook for ReadOnlyToggle {
    fn on_lock_changed(&self, path: &Path, user: &str, locked: bool) {
        if user != self.operator {
            return;
        }
        if let Err(e) = set_read_only(path, !locked) {
            log::debug!("Could not change permissions of {}: {e}", path.display());
        }
    }
}

#[cfg(unix)]
fn set_read_only(path: &Path, read_only: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    let mode = if read_only { mode & !0o222 } else { mode | 0o200 };
    permissions.set_mode(mode);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn set_read_only(path: &Path, read_only: bool) -> std::io::Result<()> {
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_readonly(read_only);
    std::fs::set_permissions(path, permissions)
}

#[derive(Default)]
struct CacheState {
    locked: HashMap<PathBuf, String>,
    last_updated: Option<DateTime<Utc>>,
}

pub struct LockCache {
    state: Mutex<CacheState>,
    repo_root: PathBuf,
    operator: String,
    ttl: Duration,
    hook: Arc<dyn LockChangeHook>,
}

impl LockCache {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        operator: impl Into<String>,
        ttl: Duration,
        hook: Arc<dyn LockChangeHook>,
    ) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            repo_root: repo_root.into(),
            operator: operator.into(),
            ttl,
            hook,
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.lock_state().last_updated
    }

    /// Snapshot of the in-memory mapping
    pub fn locked_files(&self) -> HashMap<PathBuf, String> {
        self.lock_state().locked.clone()
    }

    /// Force the next `get_all_locks` to query the server
    pub fn invalidate(&self) {
        self.lock_state().last_updated = None;
    }

    /// All known locks, refreshing from `query` when the cache is stale.
    ///
    /// Never fails: query errors are appended to `errors` and the best available
    /// mapping is returned.
    pub fn get_all_locks(
        &self,
        query: &dyn LockQuery,
        errors: &mut Vec<String>,
        force: bool,
    ) -> HashMap<PathBuf, String> {
        self.get_all_locks_at(Utc::now(), query, errors, force)
    }

    pub fn get_all_locks_at(
        &self,
        now: DateTime<Utc>,
        query: &dyn LockQuery,
        errors: &mut Vec<String>,
        force: bool,
    ) -> HashMap<PathBuf, String> {
        if !self.is_expired(now, force) {
            return self.locked_files();
        }

        let remote = query.query_locks(LockScope::Remote);
        if remote.success {
            let locks = self.to_mapping(&remote.results);
            log::debug!("Refreshed {} lock(s) from the server", locks.len());
            self.set_locked_files_at(locks.clone(), now);
            return locks;
        }
        errors.extend(remote.errors);

        log::info!("Lock server unavailable, using cached and local lock listings");
        let cached = query.query_locks(LockScope::Cached);
        let local = query.query_locks(LockScope::Local);
        let success = cached.success && local.success;

        let mut locks: HashMap<PathBuf, String> = self
            .to_mapping(&cached.results)
            .into_iter()
            .filter(|(_, user)| *user != self.operator)
            .collect();
        locks.extend(
            self.to_mapping(&local.results)
                .into_iter()
                .filter(|(_, user)| *user == self.operator),
        );
        errors.extend(cached.errors);
        errors.extend(local.errors);

        if success {
            return locks;
        }

        log::warn!("Lock listings unavailable, returning last known locks");
        self.locked_files()
    }

    /// Replace the mapping wholesale, notifying the hook for every path that changed
    pub fn set_locked_files(&self, locks: HashMap<PathBuf, String>) {
        let mut state = self.lock_state();
        self.replace_locked(&mut state, locks);
    }

    pub fn add_locked_file(&self, path: impl Into<PathBuf>, user: impl Into<String>) {
        let path = path.into();
        let user = user.into();
        let mut state = self.lock_state();
        self.hook.on_lock_changed(&path, &user, true);
        state.locked.insert(path, user);
    }

    pub fn remove_locked_file(&self, path: &Path) {
        let mut state = self.lock_state();
        if let Some(user) = state.locked.remove(path) {
            self.hook.on_lock_changed(path, &user, false);
        }
    }

    fn set_locked_files_at(&self, locks: HashMap<PathBuf, String>, now: DateTime<Utc>) {
        let mut state = self.lock_state();
        self.replace_locked(&mut state, locks);
        state.last_updated = Some(now);
    }

    fn replace_locked(&self, state: &mut CacheState, locks: HashMap<PathBuf, String>) {
        for (path, user) in &state.locked {
            if !locks.contains_key(path) {
                self.hook.on_lock_changed(path, user, false);
            }
        }
        for (path, user) in &locks {
            if !state.locked.contains_key(path) {
                self.hook.on_lock_changed(path, user, true);
            }
        }
        state.locked = locks;
    }

    fn is_expired(&self, now: DateTime<Utc>, force: bool) -> bool {
        if force {
            return true;
        }
        match self.lock_state().last_updated {
            Some(last) => now - last > self.ttl,
            None => true,
        }
    }

    fn to_mapping(&self, lines: &[String]) -> HashMap<PathBuf, String> {
        parse_lock_lines(&self.repo_root, lines, &self.operator)
            .into_iter()
            .map(|record| (record.path, record.user))
            .collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
