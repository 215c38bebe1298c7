//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`AssetStateError`], the error type for every operation that can
//! fail for environmental reasons (repository discovery, configuration, filesystem).
//!
//! Backend command outcomes are deliberately *not* errors: a failed `git` invocation is
//! reported through [`CommandOutput`](crate::core::runner::CommandOutput) with its captured
//! error lines, and callers decide whether that is fatal via
//! [`CommandOutput::into_result`](crate::core::runner::CommandOutput::into_result).
//!
//! # Public API
//! - [`AssetStateError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, AssetStateError>`

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetStateError {
    // Repository errors
    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("Git repository error: {0}")]
    GitRepo(#[from] git2::Error),

    #[error("Path is outside of the repository root '{root}': {path}")]
    OutsideRepository { path: PathBuf, root: PathBuf },

    // Process errors
    #[error("Failed to launch '{program}': {source}")]
    CommandLaunch {
        program: String,
        source: std::io::Error,
    },

    #[error("git {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("No upstream branch configured for the current branch")]
    NoUpstreamBranch,

    #[error("Refusing to pull: editor binaries are out of date and a restart is required")]
    PendingRestart,

    // File operation errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write '{path}': {source}")]
    DumpWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Failed to read config file '{path}': {source}")]
    ConfigReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Could not determine the configuration directory")]
    ConfigDirectoryNotFound,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results using AssetStateError
pub type Result<T> = std::result::Result<T, AssetStateError>;

impl AssetStateError {
    /// Create a launch failure for the given program
    pub fn command_launch(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandLaunch {
            program: program.into(),
            source,
        }
    }

    /// Create a command failure from the captured error lines
    pub fn command_failed(command: impl Into<String>, errors: &[String]) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: errors.join("\n"),
        }
    }

    pub fn outside_repository(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self::OutsideRepository {
            path: path.into(),
            root: root.into(),
        }
    }

    pub fn dump_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DumpWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn config_read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn config_parse_failed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::ConfigParseFailed {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AssetStateError::NotInGitRepo;
        assert_eq!(err.to_string(), "Not in a git repository");
    }

    #[test]
    fn test_command_failed_joins_error_lines() {
        let errors = vec![
            "fatal: bad revision".to_string(),
            "hint: check the name".to_string(),
        ];
        let err = AssetStateError::command_failed("log", &errors);
        assert_eq!(
            err.to_string(),
            "git log failed: fatal: bad revision\nhint: check the name"
        );
    }

    #[test]
    fn test_command_launch_mentions_program() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AssetStateError::command_launch("/opt/git/bin/git", io_err);
        assert!(err.to_string().contains("/opt/git/bin/git"));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_config_parse_failed() {
        let path = std::path::PathBuf::from("/test/config.json");
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid json").unwrap_err();
        let err = AssetStateError::config_parse_failed(&path, json_err);
        assert!(err.to_string().contains("/test/config.json"));
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_outside_repository() {
        let err = AssetStateError::outside_repository("/elsewhere/a.uasset", "/project");
        assert!(err.to_string().contains("/elsewhere/a.uasset"));
        assert!(err.to_string().contains("/project"));
    }
}
