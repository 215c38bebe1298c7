//! Common assertion helpers for test output validation

#![allow(dead_code)]

use predicates::prelude::*;
use serde_json::Value;

/// Creates a predicate that checks for git repository error messages
pub fn not_in_git_repo() -> impl Predicate<str> {
    predicates::str::contains("Not in a git repository")
}

pub fn has_branch_info() -> impl Predicate<str> {
    predicates::str::contains("Branch:")
}

pub fn has_parent_info() -> impl Predicate<str> {
    predicates::str::contains("Parent:")
}

/// Parses stdout of a `--json` run
pub fn json_output(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).expect("stdout is valid JSON")
}

/// The record in a `status --json` array whose path ends with `suffix`
pub fn find_record<'a>(records: &'a Value, suffix: &str) -> Option<&'a Value> {
    records.as_array()?.iter().find(|record| {
        record["path"]
            .as_str()
            .is_some_and(|path| path.replace('\\', "/").ends_with(suffix))
    })
}
