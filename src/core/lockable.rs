//! Which file types take part in git-lfs locking.

use crate::core::runner::GitRunner;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Set of lockable filename suffixes, refreshable from `.gitattributes`
#[derive(Debug, Default)]
pub struct LockableTypes {
    extensions: RwLock<Vec<String>>,
}

impl LockableTypes {
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions: RwLock::new(extensions),
        }
    }

    pub fn extensions(&self) -> Vec<String> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_file_lockable(&self, file: &str) -> bool {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|ext| file.ends_with(ext.as_str()))
    }

    /// Replace the suffix set with the wildcard patterns whose `lockable` attribute is set.
    ///
    /// `patterns` are of the form `*.uasset`. On failure the current set is left empty and
    /// the backend errors are returned.
    pub fn check_lfs_lockable(
        &self,
        runner: &GitRunner,
        patterns: &[String],
    ) -> std::result::Result<Vec<String>, Vec<String>> {
        let mut extensions = self
            .extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        extensions.clear();

        let output = runner.run_command("check-attr", &["lockable".to_string()], patterns);
        if !output.success {
            return Err(output.errors);
        }

        // `<pattern>: lockable: set|unset|unspecified`
        let values: HashMap<&str, &str> = output
            .results
            .iter()
            .filter_map(|line| line.rsplit_once(": lockable: "))
            .collect();
        for pattern in patterns {
            if values.get(pattern.as_str()).is_some_and(|value| value.trim() == "set") {
                let ext = pattern.strip_prefix('*').unwrap_or(pattern);
                extensions.push(ext.to_string());
            }
        }
        log::debug!("Lockable types: {:?}", *extensions);
        Ok(extensions.clone())
    }
}
