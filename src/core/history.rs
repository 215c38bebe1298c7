//! File history and merge-conflict details.
//!
//! Parses `git log --name-status --pretty=medium --date=raw` into [`Revision`]s,
//! `git ls-tree --long` into blob hash and size, and `git ls-files --unmerged` into
//! [`ConflictInfo`].
//!
//! # Public API
//! - [`run_get_history`]: log of one file with blob details per revision
//! - [`get_origin_revision_on_branch`]: tip commit of a branch
//! - [`run_get_conflict_status`]: base and remote blobs of a conflicted file
//! - [`parse_log_results`], [`parse_ls_tree`], [`parse_unmerged`]: the text parsers

use crate::core::runner::GitRunner;
use crate::core::state::ConflictInfo;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

/// Default cap on revisions fetched for one file
pub const MAX_HISTORY_REVISIONS: usize = 250;

/// What a revision did to the file, from the `--name-status` letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Unmodified,
    Modified,
    Add,
    Delete,
    /// Renamed or copied from another path
    Branch,
    TypeChanged,
    Unmerged,
    Unknown,
    BrokenPairing,
}

impl LogAction {
    pub fn from_status(status: char) -> Option<Self> {
        let action = match status {
            ' ' => LogAction::Unmodified,
            'M' => LogAction::Modified,
            'A' => LogAction::Add,
            'D' => LogAction::Delete,
            'R' | 'C' => LogAction::Branch,
            'T' => LogAction::TypeChanged,
            'U' => LogAction::Unmerged,
            'X' => LogAction::Unknown,
            'B' => LogAction::BrokenPairing,
            _ => return None,
        };
        Some(action)
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogAction::Unmodified => "unmodified",
            LogAction::Modified => "modified",
            LogAction::Add => "add",
            LogAction::Delete => "delete",
            LogAction::Branch => "branch",
            LogAction::TypeChanged => "type changed",
            LogAction::Unmerged => "unmerged",
            LogAction::Unknown => "unknown",
            LogAction::BrokenPairing => "broken pairing",
        };
        f.write_str(text)
    }
}

/// One commit touching a file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Revision {
    pub commit_id: String,
    /// First 8 hex digits of the commit id
    pub short_commit_id: String,
    pub commit_id_number: u32,
    /// 1 for the oldest revision, counting up to the newest
    pub revision_number: usize,
    pub user_name: String,
    pub date: Option<DateTime<Utc>>,
    pub description: String,
    pub action: Option<LogAction>,
    /// Path relative to the repository root at this revision
    pub filename: String,
    /// Index in the history of the revision a rename or copy came from
    pub branch_source: Option<usize>,
    pub file_hash: String,
    pub file_size: Option<u64>,
}

impl Revision {
    fn new(commit_id: &str) -> Self {
        let short_commit_id: String = commit_id.chars().take(8).collect();
        Self {
            commit_id_number: u32::from_str_radix(&short_commit_id, 16).unwrap_or(0),
            commit_id: commit_id.to_string(),
            short_commit_id,
            ..Default::default()
        }
    }
}

/// Leading integer of a raw date (`1700000000 +0100`)
fn parse_raw_date(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: i64 = raw.split_whitespace().next()?.parse().ok()?;
    Utc.timestamp_opt(seconds, 0).single()
}

/// `R100\told\tnew`, `M\tpath`: a status letter, optional score, then a tab
fn parse_name_status(line: &str) -> Option<(char, &str)> {
    let (code, _) = line.split_once('\t')?;
    let mut chars = code.chars();
    let status = chars.next()?;
    if !chars.all(|c| c.is_ascii_digit()) {
        return None;
    }
    let filename = line.rsplit('\t').next()?;
    Some((status, filename))
}

/// Parse `git log --name-status --pretty=medium --date=raw` output, newest first
pub fn parse_log_results(lines: &[String]) -> Vec<Revision> {
    let mut history: Vec<Revision> = Vec::new();
    let mut current: Option<Revision> = None;

    for line in lines {
        if let Some(commit_id) = line.strip_prefix("commit ") {
            if let Some(done) = current.take() {
                history.push(done);
            }
            // `commit <sha> (HEAD -> main)` when decorations are on
            let commit_id = commit_id.split_whitespace().next().unwrap_or(commit_id);
            current = Some(Revision::new(commit_id));
            continue;
        }

        let Some(revision) = current.as_mut() else {
            log::debug!("Ignoring log line outside of a commit: '{line}'");
            continue;
        };

        if let Some(author) = line.strip_prefix("Author: ") {
            revision.user_name = match author.rfind('<') {
                Some(email) => author[..email].trim_end().to_string(),
                None => author.trim().to_string(),
            };
        } else if let Some(date) = line.strip_prefix("Date:   ") {
            revision.date = parse_raw_date(date);
        } else if let Some(message) = line.strip_prefix("    ") {
            revision.description.push_str(message);
            revision.description.push('\n');
        } else if let Some((status, filename)) = parse_name_status(line) {
            revision.action = LogAction::from_status(status);
            revision.filename = filename.to_string();
        }
    }
    if let Some(done) = current.take() {
        history.push(done);
    }

    let count = history.len();
    for (index, revision) in history.iter_mut().enumerate() {
        revision.revision_number = count - index;
        if revision.action == Some(LogAction::Branch) && index + 1 < count {
            revision.branch_source = Some(index + 1);
        }
    }
    history
}

/// Blob hash and size from the first line of `git ls-tree --long`
pub fn parse_ls_tree(line: &str) -> Option<(String, Option<u64>)> {
    let (meta, _path) = line.split_once('\t')?;
    let mut fields = meta.split_whitespace();
    let _mode = fields.next()?;
    let _kind = fields.next()?;
    let hash = fields.next()?.to_string();
    let size = fields.next().and_then(|size| size.parse().ok());
    Some((hash, size))
}

/// Base (stage 1) and remote (stage 3) entries of `git ls-files --unmerged`
pub fn parse_unmerged(lines: &[String]) -> Option<ConflictInfo> {
    let mut info = ConflictInfo::default();
    let mut found = false;

    for line in lines {
        let Some((meta, path)) = line.split_once('\t') else {
            continue;
        };
        let fields: Vec<&str> = meta.split_whitespace().collect();
        let [_mode, blob, stage] = fields[..] else {
            continue;
        };
        match stage {
            "1" => {
                info.base_revision = blob.to_string();
                info.base_file = path.to_string();
                found = true;
            }
            "3" => {
                info.remote_revision = blob.to_string();
                info.remote_file = path.to_string();
                found = true;
            }
            _ => {}
        }
    }

    found.then_some(info)
}

/// History of `file`, newest first, with blob hash and size per revision.
///
/// With `merge_conflict` only the tip of `MERGE_HEAD` is returned. The boolean is false
/// when the log or any `ls-tree` lookup failed; revisions gathered so far are kept.
pub fn run_get_history(
    runner: &GitRunner,
    file: &str,
    merge_conflict: bool,
    errors: &mut Vec<String>,
) -> (bool, Vec<Revision>) {
    let mut params = vec![
        "--follow".to_string(),
        "--date=raw".to_string(),
        "--name-status".to_string(),
        "--pretty=medium".to_string(),
    ];
    if merge_conflict {
        params.push("MERGE_HEAD".to_string());
        params.push("--max-count=1".to_string());
    } else {
        params.push(format!("--max-count={MAX_HISTORY_REVISIONS}"));
    }
    params.push("--".to_string());

    let log = runner.run_command("log", &params, &[file.to_string()]);
    let mut success = log.success;
    errors.extend(log.errors);
    if !success {
        return (false, Vec::new());
    }
    let mut history = parse_log_results(&log.results);

    for revision in &mut history {
        if revision.filename.is_empty() {
            continue;
        }
        let ls_tree = runner.run_command(
            "ls-tree",
            &["--long".to_string(), revision.commit_id.clone()],
            &[revision.filename.clone()],
        );
        success &= ls_tree.success;
        errors.extend(ls_tree.errors);
        if let Some((hash, size)) = ls_tree.results.first().and_then(|l| parse_ls_tree(l)) {
            revision.file_hash = hash;
            revision.file_size = size;
        }
    }

    (success, history)
}

/// Tip commit of `branch`, reported against `relative_file`
pub fn get_origin_revision_on_branch(
    runner: &GitRunner,
    relative_file: &str,
    branch: &str,
    errors: &mut Vec<String>,
) -> Option<Revision> {
    let params = vec![
        branch.to_string(),
        "--no-patch".to_string(),
        "--date=raw".to_string(),
        "--pretty=medium".to_string(),
    ];
    let show = runner.run_command("show", &params, &[]);
    errors.extend(show.errors);
    if !show.success {
        return None;
    }

    let mut revision = parse_log_results(&show.results).into_iter().next()?;
    revision.filename = relative_file.trim_start_matches('/').to_string();
    Some(revision)
}

/// Conflict details of `file` from the index stages
pub fn run_get_conflict_status(runner: &GitRunner, file: &str) -> Option<ConflictInfo> {
    let output = runner.run_command("ls-files", &["--unmerged".to_string()], &[file.to_string()]);
    if !output.success {
        log::debug!("ls-files --unmerged failed for {file}: {:?}", output.errors);
        return None;
    }
    parse_unmerged(&output.results)
}
