//! Reconciliation engine.
//!
//! [`Engine`] owns everything one repository needs: the backend runner, the lock cache,
//! the lockable file types and the canonical per-file state. A refresh
//! ([`Engine::refresh`]) runs in a fixed order:
//!
//! 1. `git status` over the requested files, classified line by line
//! 2. lock lookups, only for lockable files seen in step 1
//! 3. remote divergence against the status branches and the upstream
//! 4. merge of the resulting partial updates into the canonical records
//!
//! A pass starts with [`Engine::begin_pass`]. Within a pass, files merged once (by a
//! refresh or by [`Engine::update_cached_states`] after a lock or add) are not queried
//! again. Only one pass should run at a time against an engine; readers may take
//! snapshots concurrently.
//!
//! # Public API
//! - [`Engine`]: the operations exposed to the editor integration layer
//! - [`AssetHost`]: callbacks into the editor around a destructive pull
//! - [`PullOutcome`]: result of [`Engine::pull_origin`]

use crate::core::{
    config::EngineConfig,
    error::{AssetStateError, Result},
    git::{self, GitRepo},
    history::{self, Revision},
    lock_cache::{LockCache, LockChangeHook, ReadOnlyToggle},
    lockable::LockableTypes,
    paths::{absolute_filenames, normalize, relative_filenames, to_arg},
    reconciler::StateCache,
    remote::{DivergenceReport, RemoteCheck},
    runner::{CommandOutput, GitRunner},
    state::{FileState, FileStateRecord, LockStatus, PartialStateUpdate, RemoteStatus, TreeState},
    status_parser::{filename_from_status, parse_status},
};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Editor-side work around a pull that rewrites files on disk.
///
/// Both calls are made synchronously and must return once the editor is done; an
/// implementation that needs a specific thread is responsible for dispatching to it
/// and waiting.
pub trait AssetHost: Send + Sync {
    /// Release loaded packages backing `files`, returning the ones to reload afterwards
    fn unlink_packages(&self, files: &[PathBuf]) -> Vec<PathBuf>;

    fn reload_packages(&self, packages: &[PathBuf]);
}

/// Host used outside the editor: nothing is loaded, nothing to reload
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedHost;

impl AssetHost for DetachedHost {
    fn unlink_packages(&self, _files: &[PathBuf]) -> Vec<PathBuf> {
        Vec::new()
    }

    fn reload_packages(&self, _packages: &[PathBuf]) {}
}

#[derive(Debug, Clone, Default)]
pub struct PullOutcome {
    pub output: CommandOutput,
    /// Absolute paths the pull changed, minus the ones the caller already reloaded
    pub updated_files: Vec<PathBuf>,
}

pub struct Engine {
    config: EngineConfig,
    runner: GitRunner,
    operator: String,
    lockable: LockableTypes,
    locks: LockCache,
    states: StateCache,
    pending_restart: AtomicBool,
    host: Arc<dyn AssetHost>,
}

impl Engine {
    /// Open the repository containing `path` and load its configuration
    pub fn open(path: &Path) -> Result<Self> {
        let repo = GitRepo::open(path).map_err(|e| match e {
            AssetStateError::GitRepo(err) if err.code() == git2::ErrorCode::NotFound => {
                AssetStateError::NotInGitRepo
            }
            other => other,
        })?;
        let root = repo.root()?;
        let mut config = EngineConfig::load(&root)?;
        if config.lock_user.is_none() {
            config.lock_user = repo.get_user_config().0;
        }
        Ok(Self::new(config, root))
    }

    pub fn new(config: EngineConfig, repo_root: impl Into<PathBuf>) -> Self {
        let repo_root: PathBuf = repo_root.into();
        let runner = GitRunner::from_config(&config, normalize(&repo_root));
        Self::with_runner(config, runner)
    }

    /// Build an engine around an existing runner.
    ///
    /// The operator identity is `lock_user` from the configuration, else the
    /// `user.name` git reports.
    pub fn with_runner(config: EngineConfig, runner: GitRunner) -> Self {
        let operator = match &config.lock_user {
            Some(user) => user.clone(),
            None => git::get_user_config(&runner).0.unwrap_or_default(),
        };
        log::debug!("Lock operator identity: '{operator}'");

        let locks = LockCache::new(
            runner.repo_root(),
            operator.clone(),
            config.lock_cache_ttl(),
            Arc::new(ReadOnlyToggle::new(operator.clone())),
        );

        Self {
            lockable: LockableTypes::new(config.lockable_extensions.clone()),
            config,
            runner,
            operator,
            locks,
            states: StateCache::new(),
            pending_restart: AtomicBool::new(false),
            host: Arc::new(DetachedHost),
        }
    }

    pub fn with_host(mut self, host: Arc<dyn AssetHost>) -> Self {
        self.host = host;
        self
    }

    pub fn with_lock_hook(mut self, hook: Arc<dyn LockChangeHook>) -> Self {
        self.locks = LockCache::new(
            self.runner.repo_root(),
            self.operator.clone(),
            self.config.lock_cache_ttl(),
            hook,
        );
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn runner(&self) -> &GitRunner {
        &self.runner
    }

    pub fn repo_root(&self) -> &Path {
        self.runner.repo_root()
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn states(&self) -> &StateCache {
        &self.states
    }

    pub fn lock_cache(&self) -> &LockCache {
        &self.locks
    }

    pub fn pending_restart(&self) -> bool {
        self.pending_restart.load(Ordering::Relaxed)
    }

    /// Run a git command, batching `files`
    pub fn run_command(&self, command: &str, params: &[String], files: &[String]) -> CommandOutput {
        self.runner.run_command(command, params, files)
    }

    /// Start a reconciliation cycle: files merged before this point may be queried again
    pub fn begin_pass(&self) {
        self.states.begin_pass();
    }

    /// Refresh `files` and return their merged records.
    ///
    /// Files already merged since [`Engine::begin_pass`] are served from the canonical
    /// state without asking the backend again, unless `force` is set.
    pub fn refresh(
        &self,
        files: &[PathBuf],
        force: bool,
        errors: &mut Vec<String>,
    ) -> Vec<FileStateRecord> {
        let requested: Vec<PathBuf> = files.iter().map(|file| normalize(file)).collect();
        let pending = if force {
            requested.clone()
        } else {
            self.states.filter_refreshed(requested.clone())
        };

        let mut paths: BTreeSet<PathBuf> = requested
            .into_iter()
            .filter(|file| self.states.was_refreshed(file))
            .collect();

        if pending.is_empty() {
            log::debug!("All {} requested files already refreshed this pass", paths.len());
        } else {
            let (success, updates) = self.run_update_status(&pending, errors);
            if !success {
                log::warn!("Status update failed: {}", errors.join(" | "));
            }
            self.update_cached_states(&updates);
            paths.extend(updates.into_keys());
        }

        paths.iter().map(|path| self.states.get(path)).collect()
    }

    /// Status, lock and divergence updates for `files` (absolute paths).
    ///
    /// Files outside the repository are ignored. The boolean reports whether
    /// `git status` itself succeeded.
    pub fn run_update_status(
        &self,
        files: &[PathBuf],
        errors: &mut Vec<String>,
    ) -> (bool, HashMap<PathBuf, PartialStateUpdate>) {
        let root = self.repo_root();
        let repo_files: Vec<PathBuf> = files
            .iter()
            .map(|file| normalize(file))
            .filter(|file| file.starts_with(root))
            .collect();
        let mut states = HashMap::new();
        if repo_files.is_empty() {
            return (false, states);
        }

        let args: Vec<String> = repo_files.iter().map(|file| to_arg(file)).collect();
        let output = self.runner.run_command(
            "--no-optional-locks status",
            &["--porcelain".to_string(), "-uall".to_string()],
            &args,
        );
        errors.extend(output.errors.iter().cloned());

        let results: HashMap<PathBuf, String> = output
            .results
            .iter()
            .map(|line| {
                let path = crate::core::paths::absolute_path(root, &filename_from_status(line));
                (path, line.clone())
            })
            .collect();

        if output.success {
            self.parse_status_results(&repo_files, &results, &mut states);
        }
        self.check_remote(&mut states, errors);

        (output.success, states)
    }

    /// Classify `files` against status lines keyed by absolute path.
    ///
    /// Directories are expanded to the tracked files they contain. Files with no status
    /// line are unchanged (or not yet on disk). Status lines for files that were not
    /// asked about are kept only for deletions and untracked files, which no file
    /// listing can discover.
    pub fn parse_status_results(
        &self,
        files: &[PathBuf],
        results: &HashMap<PathBuf, String>,
        states: &mut HashMap<PathBuf, PartialStateUpdate>,
    ) {
        let mut expanded: Vec<PathBuf> = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        for file in files {
            if file.is_dir() {
                match git::list_files_in_directory_recurse(&self.runner, file) {
                    Ok(inner) => {
                        for inner_file in inner {
                            if seen.insert(inner_file.clone()) {
                                expanded.push(inner_file);
                            }
                        }
                    }
                    Err(e) => log::warn!("Could not list {}: {e}", file.display()),
                }
            } else if seen.insert(file.clone()) {
                expanded.push(file.clone());
            }
        }

        let mut remaining = results.clone();
        let mut locks: Option<HashMap<PathBuf, String>> = None;

        for file in &expanded {
            let mut update = PartialStateUpdate::default().with_remote(RemoteStatus::UpToDate);

            match remaining.remove(file).as_deref().and_then(parse_status) {
                Some((file_state, tree_state)) => {
                    update.file_state = Some(file_state);
                    update.tree_state = Some(tree_state);
                    if file_state == FileState::Unmerged {
                        let relative = relative_filenames(std::slice::from_ref(file), self.repo_root());
                        if let Some(relative) = relative.first() {
                            update.conflict = history::run_get_conflict_status(&self.runner, relative);
                        }
                    }
                }
                None => {
                    update.file_state = Some(FileState::Unknown);
                    update.tree_state = Some(if file.exists() {
                        TreeState::Unmodified
                    } else {
                        TreeState::NotInRepo
                    });
                }
            }

            update.lock = Some(self.lock_status_for(file, &mut locks));
            states.insert(file.clone(), update);
        }

        for (path, line) in remaining {
            let Some((file_state, tree_state)) = parse_status(&line) else {
                continue;
            };
            if !matches!(file_state, FileState::Deleted | FileState::Missing)
                && tree_state != TreeState::Untracked
            {
                continue;
            }
            let mut update = PartialStateUpdate::default()
                .with_file_state(file_state)
                .with_tree_state(tree_state)
                .with_remote(RemoteStatus::UpToDate);
            if !self.config.using_lfs_locking {
                update.lock = Some(LockStatus::Unlockable);
            }
            states.insert(path, update);
        }
    }

    /// Lock state of one file; the lock listing is fetched at most once per pass
    fn lock_status_for(
        &self,
        file: &Path,
        locks: &mut Option<HashMap<PathBuf, String>>,
    ) -> LockStatus {
        if !self.config.using_lfs_locking || !self.is_file_lockable(file) {
            return LockStatus::Unlockable;
        }

        let locks = locks.get_or_insert_with(|| {
            let mut lock_errors = Vec::new();
            let locks = self.get_all_locks(false, &mut lock_errors);
            for error in lock_errors {
                log::warn!("{error}");
            }
            locks
        });

        match locks.get(file) {
            Some(user) => LockStatus::held_by(user.clone(), &self.operator),
            None => LockStatus::NotLocked,
        }
    }

    /// Every known lock, from the cache when it is fresh
    pub fn get_all_locks(&self, force: bool, errors: &mut Vec<String>) -> HashMap<PathBuf, String> {
        self.locks.get_all_locks(&self.runner, errors, force)
    }

    /// Configured status branches plus those matched by the configured wildcards
    pub fn status_branch_names(&self) -> Vec<String> {
        let mut branches = self.config.status_branches.clone();
        for pattern in &self.config.status_branch_patterns {
            match git::get_remote_branches_wildcard(&self.runner, pattern) {
                Ok(found) => {
                    for branch in found {
                        if !branches.contains(&branch) {
                            branches.push(branch);
                        }
                    }
                }
                Err(e) => log::debug!("Could not resolve status branches '{pattern}': {e}"),
            }
        }
        branches
    }

    /// Mark files in `states` that are newer on a watched branch
    pub fn check_remote(
        &self,
        states: &mut HashMap<PathBuf, PartialStateUpdate>,
        errors: &mut Vec<String>,
    ) -> DivergenceReport {
        let content_dir = self.repo_root().join(&self.config.content_dir);
        let mut diff_paths = vec![to_arg(&content_dir)];
        diff_paths.extend(self.config.reserved_paths.iter().cloned());

        let check = RemoteCheck {
            status_branches: self.status_branch_names(),
            upstream: git::get_remote_branch_name(&self.runner).ok(),
            diff_paths,
            reserved_paths: self.config.reserved_paths.clone(),
        };
        let report = check.run(&self.runner, &self.lockable);

        if report.pending_restart {
            self.pending_restart.store(true, Ordering::Relaxed);
        }
        errors.extend(report.errors.iter().cloned());
        report.apply(states);
        report
    }

    /// Merge partial updates into the canonical records
    pub fn update_cached_states(&self, updates: &HashMap<PathBuf, PartialStateUpdate>) -> bool {
        // Without locking nothing else refreshes saved files, so records are left stale
        let now = self.config.using_lfs_locking.then(Utc::now);
        self.states.update_cached_states(updates, now)
    }

    /// Snapshot of the canonical record for `file`
    pub fn get_state(&self, file: &Path) -> FileStateRecord {
        self.states.get(&normalize(file))
    }

    /// Files among `files` the operator holds a lock on, per the canonical state
    pub fn get_locked_files(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        files
            .iter()
            .filter(|file| self.get_state(file).is_locked_by_operator())
            .cloned()
            .collect()
    }

    pub fn is_file_lockable(&self, file: &Path) -> bool {
        self.lockable.is_file_lockable(&file.to_string_lossy())
    }

    /// Refresh the lockable types from the `lockable` git attribute of `patterns`
    pub fn check_lfs_lockable(&self, patterns: &[String]) -> std::result::Result<Vec<String>, Vec<String>> {
        self.lockable.check_lfs_lockable(&self.runner, patterns)
    }

    pub fn run_get_history(
        &self,
        file: &Path,
        merge_conflict: bool,
        errors: &mut Vec<String>,
    ) -> Result<(bool, Vec<Revision>)> {
        let relative = self.relative(file)?;
        Ok(history::run_get_history(&self.runner, &relative, merge_conflict, errors))
    }

    pub fn get_origin_revision_on_branch(
        &self,
        file: &Path,
        branch: &str,
        errors: &mut Vec<String>,
    ) -> Result<Option<Revision>> {
        let relative = self.relative(file)?;
        Ok(history::get_origin_revision_on_branch(&self.runner, &relative, branch, errors))
    }

    /// Force a lock refresh, then fetch without tags, pruning deleted remote branches
    pub fn fetch_remote(&self, errors: &mut Vec<String>) -> CommandOutput {
        if self.config.using_lfs_locking {
            self.get_all_locks(true, errors);
        }
        self.runner.run_command(
            "fetch",
            &["--no-tags".to_string(), "--prune".to_string()],
            &[],
        )
    }

    /// Rebase onto the upstream, letting the host release and reload changed assets.
    ///
    /// Refused while a restart is pending: pulling new assets into outdated binaries can
    /// corrupt them. `already_reloaded` files are left out of the reported changes.
    pub fn pull_origin(&self, already_reloaded: &[PathBuf]) -> Result<PullOutcome> {
        if self.pending_restart() {
            log::info!("Pull refused, editor binaries need an update");
            return Err(AssetStateError::PendingRestart);
        }

        let upstream = git::get_remote_branch_name(&self.runner)?;
        let diff = self
            .runner
            .run_command("diff", &["--name-only".to_string(), upstream], &[]);
        if !diff.success {
            return Ok(PullOutcome {
                output: diff,
                updated_files: Vec::new(),
            });
        }
        if diff.results.is_empty() {
            log::debug!("Nothing to pull");
            return Ok(PullOutcome {
                output: CommandOutput::succeeded(Vec::new()),
                updated_files: Vec::new(),
            });
        }

        let skip: HashSet<&PathBuf> = already_reloaded.iter().collect();
        let updated_files: Vec<PathBuf> = absolute_filenames(&diff.results, self.repo_root())
            .into_iter()
            .filter(|file| !skip.contains(file))
            .collect();

        let lockable_files: Vec<PathBuf> = updated_files
            .iter()
            .filter(|file| self.is_file_lockable(file))
            .cloned()
            .collect();

        let reload = if lockable_files.is_empty() {
            None
        } else {
            Some(self.host.unlink_packages(&lockable_files))
        };

        let output = self.runner.run_command(
            "pull",
            &["--rebase".to_string(), "--autostash".to_string()],
            &[],
        );

        if let Some(packages) = reload {
            self.host.reload_packages(&packages);
        }

        Ok(PullOutcome {
            output,
            updated_files,
        })
    }

    fn relative(&self, file: &Path) -> Result<String> {
        let file = if file.is_absolute() {
            normalize(file)
        } else {
            normalize(&self.repo_root().join(file))
        };
        relative_filenames(std::slice::from_ref(&file), self.repo_root())
            .into_iter()
            .next()
            .ok_or_else(|| AssetStateError::outside_repository(&file, self.repo_root()))
    }
}
