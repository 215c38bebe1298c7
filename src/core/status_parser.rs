//! Parser for `git status --porcelain` lines.
//!
//! Each line is `XY path` (or `XY old -> new` for renames and copies) where `X` is the
//! index state and `Y` the working-tree state. Several codes overlap, so classification
//! walks [`STATUS_RULES`] in order and stops at the first match.
//!
//! # Public API
//! - [`parse_status`]: classify a status line into a `(FileState, TreeState)` pair
//! - [`parse_status_line`]: classify and extract the path in one step
//! - [`filename_from_status`]: extract the (post-rename) path of a status line

use crate::core::state::{FileState, TreeState};

/// One entry of the ordered classification table
pub struct StatusRule {
    pub name: &'static str,
    pub matches: fn(char, char) -> bool,
    pub file_state: FileState,
    /// Overrides the tree state derived from the blank half of the code
    pub tree_state: Option<TreeState>,
}

/// Classification rules, highest precedence first
pub const STATUS_RULES: &[StatusRule] = &[
    StatusRule {
        name: "conflict",
        matches: |x, y| x == 'U' || y == 'U' || (x == 'A' && y == 'A') || (x == 'D' && y == 'D'),
        file_state: FileState::Unmerged,
        tree_state: Some(TreeState::Working),
    },
    StatusRule {
        name: "untracked",
        matches: |x, y| x == '?' || y == '?',
        file_state: FileState::Unknown,
        tree_state: Some(TreeState::Untracked),
    },
    StatusRule {
        name: "ignored",
        matches: |x, y| x == '!' || y == '!',
        file_state: FileState::Unknown,
        tree_state: Some(TreeState::Ignored),
    },
    StatusRule {
        name: "added",
        matches: |x, _| x == 'A',
        file_state: FileState::Added,
        tree_state: None,
    },
    StatusRule {
        name: "deleted",
        matches: |x, _| x == 'D',
        file_state: FileState::Deleted,
        tree_state: None,
    },
    StatusRule {
        name: "missing",
        matches: |_, y| y == 'D',
        file_state: FileState::Missing,
        tree_state: None,
    },
    StatusRule {
        name: "modified",
        matches: |x, y| x == 'M' || y == 'M',
        file_state: FileState::Modified,
        tree_state: None,
    },
    StatusRule {
        name: "renamed",
        matches: |x, _| x == 'R',
        file_state: FileState::Renamed,
        tree_state: None,
    },
    StatusRule {
        name: "copied",
        matches: |x, _| x == 'C',
        file_state: FileState::Copied,
        tree_state: None,
    },
];

/// A classified status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the repository root, as printed by git
    pub path: String,
    pub file_state: FileState,
    pub tree_state: TreeState,
}

/// Tree state implied by which half of the code is blank.
///
/// A blank index half means the change is only in the working tree; a blank
/// working-tree half means it is fully staged. When both halves carry a change the
/// working tree is the most recent edit, so `Working` is reported.
fn baseline_tree_state(x: char, y: char) -> TreeState {
    if x == ' ' {
        TreeState::Working
    } else if y == ' ' {
        TreeState::Staged
    } else {
        TreeState::Working
    }
}

/// Classify the two-character code at the start of `line`.
///
/// Returns `None` for lines too short to hold a code.
pub fn parse_status(line: &str) -> Option<(FileState, TreeState)> {
    let mut chars = line.chars();
    let x = chars.next()?;
    let y = chars.next()?;

    let baseline = baseline_tree_state(x, y);
    let classified = STATUS_RULES
        .iter()
        .find(|rule| (rule.matches)(x, y))
        .map(|rule| {
            log::trace!("'{x}{y}' matched rule {}", rule.name);
            (rule.file_state, rule.tree_state.unwrap_or(baseline))
        })
        // Unmodified files never appear in status output
        .unwrap_or((FileState::Unknown, baseline));

    Some(classified)
}

/// Path of a status line, taking the destination of a rename
pub fn filename_from_status(line: &str) -> String {
    let raw = match line.rfind("->") {
        Some(arrow) => &line[arrow + 2..],
        None => line.char_indices().nth(3).map_or("", |(idx, _)| &line[idx..]),
    };
    raw.trim().trim_matches('"').to_string()
}

/// Classify a status line and extract its path.
///
/// Malformed lines (no code, no path) are skipped by returning `None`.
pub fn parse_status_line(line: &str) -> Option<StatusEntry> {
    let (file_state, tree_state) = parse_status(line)?;
    let path = filename_from_status(line);
    if path.is_empty() {
        log::debug!("Skipping malformed status line '{line}'");
        return None;
    }
    Some(StatusEntry {
        path,
        file_state,
        tree_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(line: &str) -> (FileState, TreeState) {
        parse_status(line).unwrap()
    }

    #[test]
    fn test_conflict_codes() {
        for code in ["UU", "AU", "UD", "AA", "DD", "DU", "UA"] {
            let line = format!("{code} Content/C.asset");
            assert_eq!(
                states(&line),
                (FileState::Unmerged, TreeState::Working),
                "code {code}"
            );
        }
    }

    #[test]
    fn test_untracked_and_ignored() {
        assert_eq!(
            states("?? Content/B.asset"),
            (FileState::Unknown, TreeState::Untracked)
        );
        assert_eq!(states("!! file.sln"), (FileState::Unknown, TreeState::Ignored));
    }

    #[test]
    fn test_staged_and_working_halves() {
        assert_eq!(
            states("M  Content/A.asset"),
            (FileState::Modified, TreeState::Staged)
        );
        assert_eq!(
            states(" M Content/A.asset"),
            (FileState::Modified, TreeState::Working)
        );
        assert_eq!(
            states("MM Content/A.asset"),
            (FileState::Modified, TreeState::Working)
        );
    }

    #[test]
    fn test_added_deleted_missing() {
        assert_eq!(states("A  new.asset"), (FileState::Added, TreeState::Staged));
        assert_eq!(states("AM new.asset"), (FileState::Added, TreeState::Working));
        assert_eq!(states("D  gone.asset"), (FileState::Deleted, TreeState::Staged));
        assert_eq!(
            states(" D gone.asset"),
            (FileState::Missing, TreeState::Working)
        );
    }

    #[test]
    fn test_index_deleted_wins_over_modified() {
        // 'D' in the index is checked before 'M' in either half
        assert_eq!(states("DM x.asset").0, FileState::Deleted);
        assert_eq!(states("MD x.asset").0, FileState::Missing);
    }

    #[test]
    fn test_renamed_and_copied() {
        assert_eq!(
            states("R  old.asset -> new.asset"),
            (FileState::Renamed, TreeState::Staged)
        );
        assert_eq!(
            states("C  a.asset -> b.asset"),
            (FileState::Copied, TreeState::Staged)
        );
        // A working-tree modification on a rename is reported as modified
        assert_eq!(states("RM old.asset -> new.asset").0, FileState::Modified);
    }

    #[test]
    fn test_unrecognised_code_is_unknown() {
        assert_eq!(states("T  link"), (FileState::Unknown, TreeState::Staged));
    }

    #[test]
    fn test_too_short_line() {
        assert_eq!(parse_status(""), None);
        assert_eq!(parse_status("M"), None);
    }

    #[test]
    fn test_rule_order_is_stable() {
        let names: Vec<&str> = STATUS_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "conflict",
                "untracked",
                "ignored",
                "added",
                "deleted",
                "missing",
                "modified",
                "renamed",
                "copied"
            ]
        );
    }

    #[test]
    fn test_filename_extraction() {
        assert_eq!(filename_from_status("R  old.asset -> new.asset"), "new.asset");
        assert_eq!(filename_from_status(" M Content/A.asset"), "Content/A.asset");
        assert_eq!(
            filename_from_status("?? \"Content/With Space.uasset\""),
            "Content/With Space.uasset"
        );
        assert_eq!(
            filename_from_status("R  \"old name.asset\" -> \"new name.asset\""),
            "new name.asset"
        );
    }

    #[test]
    fn test_filename_extraction_is_stable_across_parses() {
        let line = "R  Content/Old.uasset -> Content/New.uasset";
        let first = filename_from_status(line);
        for _ in 0..3 {
            assert_eq!(filename_from_status(line), first);
        }
    }

    #[test]
    fn test_parse_status_line() {
        let entry = parse_status_line("A  Content/New.uasset").unwrap();
        assert_eq!(entry.path, "Content/New.uasset");
        assert_eq!(entry.file_state, FileState::Added);
        assert_eq!(entry.tree_state, TreeState::Staged);

        assert_eq!(parse_status_line("M "), None);
    }
}
