//! Color mapping for file, lock and remote states.
//!
//! Every command that prints a record goes through these helpers so the same state is
//! always shown in the same color.
//!
//! # Public API
//! - [`get_state_color_style`]: color function for a file state
//! - [`get_aligned_state`]: fixed-width colored file state label
//! - [`get_colored_path`]: path in the color of its file state
//! - [`get_lock_label`] / [`get_remote_label`]: colored lock and divergence labels
//! - [`format_record`]: one complete record line
//!
//! # Color Scheme
//! - **Modified**: Yellow
//! - **Added**: Green
//! - **Deleted/Missing**: Red
//! - **Renamed/Copied**: Blue
//! - **Untracked**: Cyan
//! - **Unmerged**: Red bold

use crate::core::state::{FileState, FileStateRecord, LockStatus, RemoteStatus, TreeState};
use colored::*;

/// Width of the longest file state label
const STATE_WIDTH: usize = 10;

pub fn get_state_color_style(
    file_state: FileState,
    tree_state: TreeState,
) -> Box<dyn Fn(&str) -> ColoredString> {
    if tree_state == TreeState::Untracked {
        return Box::new(|text: &str| text.cyan());
    }
    match file_state {
        FileState::Modified => Box::new(|text: &str| text.yellow()),
        FileState::Added => Box::new(|text: &str| text.green()),
        FileState::Deleted | FileState::Missing => Box::new(|text: &str| text.red()),
        FileState::Renamed | FileState::Copied => Box::new(|text: &str| text.blue()),
        FileState::Unmerged => Box::new(|text: &str| text.red().bold()),
        FileState::Unknown | FileState::Unmodified => Box::new(|text: &str| text.white()),
    }
}

/// Label shown in the state column; untracked files read as `untracked`
fn state_label(file_state: FileState, tree_state: TreeState) -> String {
    match (file_state, tree_state) {
        (FileState::Unknown, TreeState::Untracked) => "untracked".to_string(),
        (FileState::Unknown, TreeState::Ignored) => "ignored".to_string(),
        (FileState::Unknown, TreeState::Unmodified) => "clean".to_string(),
        _ => file_state.to_string(),
    }
}

pub fn get_aligned_state(file_state: FileState, tree_state: TreeState) -> ColoredString {
    let color_fn = get_state_color_style(file_state, tree_state);
    color_fn(&format!(
        "{:<width$}",
        state_label(file_state, tree_state),
        width = STATE_WIDTH
    ))
}

pub fn get_colored_path(file_state: FileState, tree_state: TreeState, path: &str) -> ColoredString {
    let color_fn = get_state_color_style(file_state, tree_state);
    color_fn(path)
}

/// Empty for files that cannot or are not locked
pub fn get_lock_label(lock: &LockStatus) -> ColoredString {
    match lock {
        LockStatus::Unlockable | LockStatus::NotLocked => "".normal(),
        LockStatus::Locked(_) => lock.to_string().green(),
        LockStatus::LockedOther(_) => lock.to_string().red(),
    }
}

/// Empty when up to date
pub fn get_remote_label(remote: &RemoteStatus) -> ColoredString {
    match remote {
        RemoteStatus::UpToDate => "".normal(),
        RemoteStatus::NotAtHead(_) => remote.to_string().magenta(),
        RemoteStatus::NotLatest(_) => remote.to_string().bright_black(),
    }
}

/// `<state> <path> [lock] [remote]` with `display_path` shown instead of the absolute path
pub fn format_record(record: &FileStateRecord, display_path: &str) -> String {
    let mut line = format!(
        "{} {}",
        get_aligned_state(record.file_state, record.tree_state),
        get_colored_path(record.file_state, record.tree_state, display_path)
    );
    for label in [get_lock_label(&record.lock), get_remote_label(&record.remote)] {
        if !label.is_empty() {
            line.push_str(&format!("  {}", label));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file_state: FileState, tree_state: TreeState) -> FileStateRecord {
        FileStateRecord {
            file_state,
            tree_state,
            ..FileStateRecord::new("/project/Content/A.uasset")
        }
    }

    #[test]
    fn test_aligned_state_is_padded() {
        let label = get_aligned_state(FileState::Added, TreeState::Staged);
        assert!(label.to_string().contains("added     "));
    }

    #[test]
    fn test_untracked_label() {
        let label = get_aligned_state(FileState::Unknown, TreeState::Untracked);
        assert!(label.to_string().contains("untracked"));
    }

    #[test]
    fn test_format_record_includes_lock_and_remote() {
        let mut record = record(FileState::Modified, TreeState::Working);
        record.lock = LockStatus::LockedOther("bob".to_string());
        record.remote = RemoteStatus::NotAtHead("origin/main".to_string());

        let line = format_record(&record, "Content/A.uasset");
        assert!(line.contains("modified"));
        assert!(line.contains("Content/A.uasset"));
        assert!(line.contains("locked by bob"));
        assert!(line.contains("not at head (origin/main)"));
    }

    #[test]
    fn test_format_record_omits_empty_labels() {
        let line = format_record(&record(FileState::Deleted, TreeState::Staged), "a.uasset");
        assert!(!line.contains("not locked"));
        assert!(!line.contains("up to date"));
    }

    #[test]
    fn test_color_style_consistency() {
        for file_state in [
            FileState::Modified,
            FileState::Added,
            FileState::Deleted,
            FileState::Renamed,
            FileState::Unmerged,
        ] {
            let color_fn = get_state_color_style(file_state, TreeState::Working);
            assert_eq!(color_fn("test").to_string(), color_fn("test").to_string());
        }
    }
}
