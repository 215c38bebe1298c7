//! Per-file state model.
//!
//! [`FileStateRecord`] is the canonical, fully-populated view of one tracked file.
//! [`PartialStateUpdate`] is the field-sparse form produced by each parsing stage: a
//! `None` field means "no opinion" and never overwrites a known value when merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Content state of a file relative to HEAD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Unknown,
    Unmodified,
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    Missing,
    Unmerged,
}

/// Where the change lives: index, working tree, or outside version control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeState {
    Working,
    Staged,
    Untracked,
    Ignored,
    Unmodified,
    NotInRepo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Unlockable,
    NotLocked,
    /// Locked by the operator
    Locked,
    LockedOther,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteState {
    UpToDate,
    /// The file's own upstream has newer commits touching it
    NotAtHead,
    /// Another watched branch has newer commits touching it
    NotLatest,
}

/// Lock ownership, carried as one value so state and user always change together
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "user")]
pub enum LockStatus {
    Unlockable,
    NotLocked,
    Locked(String),
    LockedOther(String),
}

impl LockStatus {
    /// Classify a lock holder against the operator's identity
    pub fn held_by(user: impl Into<String>, operator: &str) -> Self {
        let user = user.into();
        if user == operator {
            LockStatus::Locked(user)
        } else {
            LockStatus::LockedOther(user)
        }
    }

    pub fn state(&self) -> LockState {
        match self {
            LockStatus::Unlockable => LockState::Unlockable,
            LockStatus::NotLocked => LockState::NotLocked,
            LockStatus::Locked(_) => LockState::Locked,
            LockStatus::LockedOther(_) => LockState::LockedOther,
        }
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            LockStatus::Locked(user) | LockStatus::LockedOther(user) => Some(user),
            LockStatus::Unlockable | LockStatus::NotLocked => None,
        }
    }
}

/// Divergence from a watched remote branch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "branch")]
pub enum RemoteStatus {
    UpToDate,
    NotAtHead(String),
    NotLatest(String),
}

impl RemoteStatus {
    pub fn state(&self) -> RemoteState {
        match self {
            RemoteStatus::UpToDate => RemoteState::UpToDate,
            RemoteStatus::NotAtHead(_) => RemoteState::NotAtHead,
            RemoteStatus::NotLatest(_) => RemoteState::NotLatest,
        }
    }

    /// Branch that is ahead; empty when up to date
    pub fn head_branch(&self) -> &str {
        match self {
            RemoteStatus::UpToDate => "",
            RemoteStatus::NotAtHead(branch) | RemoteStatus::NotLatest(branch) => branch,
        }
    }
}

/// Revisions involved in an unresolved merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    /// Blob id of the common ancestor (stage 1)
    pub base_revision: String,
    pub base_file: String,
    /// Blob id of the incoming side (stage 3)
    pub remote_revision: String,
    pub remote_file: String,
}

/// Canonical state of one tracked file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStateRecord {
    pub path: PathBuf,
    pub file_state: FileState,
    pub tree_state: TreeState,
    pub lock: LockStatus,
    pub remote: RemoteStatus,
    pub conflict: Option<ConflictInfo>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl FileStateRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_state: FileState::Unknown,
            tree_state: TreeState::NotInRepo,
            lock: LockStatus::NotLocked,
            remote: RemoteStatus::UpToDate,
            conflict: None,
            last_refreshed: None,
        }
    }

    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    pub fn lock_user(&self) -> Option<&str> {
        self.lock.user()
    }

    pub fn remote_state(&self) -> RemoteState {
        self.remote.state()
    }

    pub fn head_branch(&self) -> &str {
        self.remote.head_branch()
    }

    pub fn is_unknown(&self) -> bool {
        self.file_state == FileState::Unknown
    }

    /// Only files outside version control can be added
    pub fn can_add(&self) -> bool {
        matches!(self.tree_state, TreeState::Untracked | TreeState::NotInRepo)
    }

    pub fn is_conflicted(&self) -> bool {
        self.file_state == FileState::Unmerged
    }

    pub fn is_locked_by_operator(&self) -> bool {
        matches!(self.lock, LockStatus::Locked(_))
    }
}

/// Field-sparse state produced by one parsing stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialStateUpdate {
    pub file_state: Option<FileState>,
    pub tree_state: Option<TreeState>,
    pub lock: Option<LockStatus>,
    pub remote: Option<RemoteStatus>,
    pub conflict: Option<ConflictInfo>,
}

impl PartialStateUpdate {
    pub fn with_file_state(mut self, state: FileState) -> Self {
        self.file_state = Some(state);
        self
    }

    pub fn with_tree_state(mut self, state: TreeState) -> Self {
        self.tree_state = Some(state);
        self
    }

    pub fn with_lock(mut self, lock: LockStatus) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_remote(mut self, remote: RemoteStatus) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.file_state.is_none()
            && self.tree_state.is_none()
            && self.lock.is_none()
            && self.remote.is_none()
            && self.conflict.is_none()
    }

    /// Overlay the fields `other` has an opinion on
    pub fn overlay(&mut self, other: &PartialStateUpdate) {
        if other.file_state.is_some() {
            self.file_state = other.file_state;
        }
        if other.tree_state.is_some() {
            self.tree_state = other.tree_state;
        }
        if other.lock.is_some() {
            self.lock = other.lock.clone();
        }
        if other.remote.is_some() {
            self.remote = other.remote.clone();
        }
        if other.conflict.is_some() {
            self.conflict = other.conflict.clone();
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FileState::Unknown => "unknown",
            FileState::Unmodified => "unmodified",
            FileState::Added => "added",
            FileState::Deleted => "deleted",
            FileState::Modified => "modified",
            FileState::Renamed => "renamed",
            FileState::Copied => "copied",
            FileState::Missing => "missing",
            FileState::Unmerged => "unmerged",
        };
        f.write_str(text)
    }
}

impl fmt::Display for TreeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TreeState::Working => "working",
            TreeState::Staged => "staged",
            TreeState::Untracked => "untracked",
            TreeState::Ignored => "ignored",
            TreeState::Unmodified => "unmodified",
            TreeState::NotInRepo => "not in repo",
        };
        f.write_str(text)
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockStatus::Unlockable => f.write_str("unlockable"),
            LockStatus::NotLocked => f.write_str("not locked"),
            LockStatus::Locked(user) => write!(f, "locked by {user} (you)"),
            LockStatus::LockedOther(user) => write!(f, "locked by {user}"),
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteStatus::UpToDate => f.write_str("up to date"),
            RemoteStatus::NotAtHead(branch) => write!(f, "not at head ({branch})"),
            RemoteStatus::NotLatest(branch) => write!(f, "newer on {branch}"),
        }
    }
}
