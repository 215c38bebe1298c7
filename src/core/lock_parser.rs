//! Parser for `git lfs locks` output.
//!
//! Lines are tab separated: `path\t[user]\t[ID:n]`. Lock listings that omit the owner
//! (`--local`, or servers that only report ids) describe locks held by the operator.

use crate::core::paths::absolute_path;
use std::path::{Path, PathBuf};

/// One lock as reported by git-lfs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub path: PathBuf,
    pub user: String,
}

/// Parse one line of lock output.
///
/// With `absolute` the path is resolved against `repo_root`; otherwise it is kept as
/// printed. Lines with fewer than two non-empty fields yield `None`.
pub fn parse_lock_line(
    repo_root: &Path,
    line: &str,
    operator: &str,
    absolute: bool,
) -> Option<LockRecord> {
    let fields: Vec<&str> = line.split('\t').filter(|f| !f.is_empty()).collect();
    if fields.len() < 2 {
        log::debug!("Skipping lock line without owner or id: '{line}'");
        return None;
    }

    let filename = fields[0].trim_end();
    let second = fields[1].trim_end();

    let path = if absolute {
        absolute_path(repo_root, filename)
    } else {
        PathBuf::from(filename)
    };

    let user = if fields.len() == 2 || second.is_empty() || second.starts_with("ID:") {
        operator.to_string()
    } else {
        second.to_string()
    };

    Some(LockRecord { path, user })
}

/// Parse every line of a lock listing, skipping malformed lines
pub fn parse_lock_lines<'a>(
    repo_root: &Path,
    lines: impl IntoIterator<Item = &'a String>,
    operator: &str,
) -> Vec<LockRecord> {
    lines
        .into_iter()
        .filter_map(|line| parse_lock_line(repo_root, line, operator, true))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/project";

    fn parse(line: &str) -> Option<LockRecord> {
        parse_lock_line(Path::new(ROOT), line, "me", true)
    }

    #[test]
    fn test_user_and_id() {
        let record = parse("path.asset\tuser1\tID:5").unwrap();
        assert_eq!(record.path, PathBuf::from("/project/path.asset"));
        assert_eq!(record.user, "user1");
    }

    #[test]
    fn test_id_only_belongs_to_operator() {
        assert_eq!(parse("path.asset\tID:5").unwrap().user, "me");
    }

    #[test]
    fn test_empty_user_field_belongs_to_operator() {
        // The empty field is culled, leaving path and id
        assert_eq!(parse("path.asset\t\tID:5").unwrap().user, "me");
    }

    #[test]
    fn test_trailing_whitespace_is_trimmed() {
        let record = parse("Content/Map.umap   \tbob   \tID:12").unwrap();
        assert_eq!(record.path, PathBuf::from("/project/Content/Map.umap"));
        assert_eq!(record.user, "bob");
    }

    #[test]
    fn test_single_field_is_skipped() {
        assert_eq!(parse("path.asset"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("\t\t"), None);
    }

    #[test]
    fn test_relative_paths_are_kept() {
        let record =
            parse_lock_line(Path::new(ROOT), "Content/A.uasset\tbob\tID:1", "me", false).unwrap();
        assert_eq!(record.path, PathBuf::from("Content/A.uasset"));
    }

    #[test]
    fn test_windows_separators_are_normalised() {
        let record = parse("Content\\Maps\\Main.umap\tbob\tID:3").unwrap();
        assert_eq!(record.path, PathBuf::from("/project/Content/Maps/Main.umap"));
    }

    #[test]
    fn test_parse_lock_lines_skips_malformed() {
        let lines = vec![
            "a.uasset\talice\tID:1".to_string(),
            "garbage".to_string(),
            "b.uasset\tID:2".to_string(),
        ];
        let records = parse_lock_lines(Path::new(ROOT), &lines, "me");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].user, "me");
    }
}
