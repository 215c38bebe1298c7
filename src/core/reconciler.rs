//! Canonical per-file state and the merge of partial updates into it.
//!
//! [`StateCache`] owns one [`FileStateRecord`] per absolute path. Parsing stages never
//! write records directly: they produce [`PartialStateUpdate`]s which
//! [`StateCache::update_cached_states`] merges field by field. A field a stage has no
//! opinion on is `None` and leaves the record untouched.
//!
//! Readers get cloned snapshots, never references into the cache.

use crate::core::state::{
    FileState, FileStateRecord, LockStatus, PartialStateUpdate, RemoteStatus, TreeState,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct StateCache {
    records: RwLock<HashMap<PathBuf, FileStateRecord>>,
    /// Paths already merged during the current pass
    refreshed: RwLock<HashSet<PathBuf>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `updates` into the canonical records, returning whether anything was offered.
    ///
    /// An update that would move an already tracked file to `Added` is dropped as a
    /// whole. Merged records are stamped with `now`; a `None` stamp leaves them looking
    /// stale so the next status request refreshes them again.
    pub fn update_cached_states(
        &self,
        updates: &HashMap<PathBuf, PartialStateUpdate>,
        now: Option<DateTime<Utc>>,
    ) -> bool {
        if updates.is_empty() {
            return false;
        }

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let mut refreshed = self.refreshed.write().unwrap_or_else(PoisonError::into_inner);

        for (path, update) in updates {
            let record = records
                .entry(path.clone())
                .or_insert_with(|| FileStateRecord::new(path.clone()));

            if let Some(file_state) = update.file_state {
                if file_state == FileState::Added && !record.is_unknown() && !record.can_add() {
                    log::debug!(
                        "Ignoring {} -> added for {}",
                        record.file_state,
                        path.display()
                    );
                    continue;
                }
                record.file_state = file_state;
            }
            if let Some(tree_state) = update.tree_state {
                record.tree_state = tree_state;
            }
            if let Some(lock) = &update.lock {
                record.lock = lock.clone();
            }
            if let Some(remote) = &update.remote {
                record.remote = remote.clone();
            }
            if let Some(conflict) = &update.conflict {
                record.conflict = Some(conflict.clone());
            } else if update.file_state.is_some() && record.file_state != FileState::Unmerged {
                record.conflict = None;
            }
            record.last_refreshed = now;

            refreshed.insert(path.clone());
        }

        true
    }

    /// Snapshot of one record; unknown paths get a default record
    pub fn get(&self, path: &Path) -> FileStateRecord {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .unwrap_or_else(|| FileStateRecord::new(path))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    /// Snapshot of every record, sorted by path
    pub fn snapshot(&self) -> Vec<FileStateRecord> {
        let mut records: Vec<FileStateRecord> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new reconciliation pass
    pub fn begin_pass(&self) {
        self.refreshed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether `path` was already merged during the current pass
    pub fn was_refreshed(&self, path: &Path) -> bool {
        self.refreshed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    /// Drop paths already merged this pass from a refresh request
    pub fn filter_refreshed(&self, files: Vec<PathBuf>) -> Vec<PathBuf> {
        let refreshed = self.refreshed.read().unwrap_or_else(PoisonError::into_inner);
        files
            .into_iter()
            .filter(|file| !refreshed.contains(file))
            .collect()
    }
}

/// Turn full records into updates that set every field
pub fn collect_new_states(
    records: &HashMap<PathBuf, FileStateRecord>,
    updates: &mut HashMap<PathBuf, PartialStateUpdate>,
) -> bool {
    if records.is_empty() {
        return false;
    }

    for (path, record) in records {
        updates.insert(
            path.clone(),
            PartialStateUpdate {
                file_state: Some(record.file_state),
                tree_state: Some(record.tree_state),
                lock: Some(record.lock.clone()),
                remote: Some(record.remote.clone()),
                conflict: record.conflict.clone(),
            },
        );
    }
    true
}

/// Record the same field values for every path in `files`, keeping fields left `None`
pub fn collect_new_states_for_files(
    files: &[PathBuf],
    updates: &mut HashMap<PathBuf, PartialStateUpdate>,
    file_state: Option<FileState>,
    tree_state: Option<TreeState>,
    lock: Option<LockStatus>,
    remote: Option<RemoteStatus>,
) -> bool {
    if files.is_empty() {
        return false;
    }

    let template = PartialStateUpdate {
        file_state,
        tree_state,
        lock,
        remote,
        conflict: None,
    };
    for file in files {
        updates
            .entry(file.clone())
            .or_default()
            .overlay(&template);
    }
    true
}
