//! Backend process execution and file batching.
//!
//! [`GitRunner`] turns a `(command, parameters, files)` request into one or more
//! invocations of the backend executable, splitting long file lists into batches so no
//! single command line grows past platform limits. Results come back as a
//! [`CommandOutput`]: a success flag plus stdout and stderr split into lines.
//!
//! The actual process spawning sits behind the [`ProcessBackend`] trait so the parsing
//! and batching layers can be driven by scripted output in tests.
//!
//! # Public API
//! - [`GitRunner`]: batched command execution against one repository
//! - [`CommandOutput`]: aggregated result of one logical command
//! - [`ProcessBackend`] / [`SystemBackend`]: the process boundary
//! - [`Invocation`] / [`RawOutput`]: one process launch and its captured streams

use crate::core::config::{EngineConfig, MAX_FILES_PER_BATCH};
use crate::core::error::{AssetStateError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

/// One launch of an executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub repo_root: Option<PathBuf>,
    /// Whether the root is passed as `-C <root>` (git) or only used as working directory
    pub root_flag: bool,
    /// Subcommand, possibly with leading options (`--no-optional-locks status`, `lfs locks`)
    pub command: String,
    pub params: Vec<String>,
    pub files: Vec<String>,
}

impl Invocation {
    /// Full argument vector handed to the executable
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(3 + self.params.len() + self.files.len());
        if let (true, Some(root)) = (self.root_flag, &self.repo_root) {
            args.push("-C".to_string());
            args.push(root.to_string_lossy().into_owned());
        }
        args.extend(self.command.split_whitespace().map(str::to_string));
        // Empty parameters are placeholders and never reach the process
        args.extend(self.params.iter().filter(|p| !p.is_empty()).cloned());
        args.extend(self.files.iter().cloned());
        args
    }

    /// Short printable form used in logs
    pub fn display(&self) -> String {
        let program = self
            .program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned());
        format!("{} {}", program, self.args().join(" "))
    }
}

/// Captured streams of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// The process boundary
pub trait ProcessBackend: Send + Sync {
    fn execute(&self, invocation: &Invocation) -> std::io::Result<RawOutput>;
}

/// Spawns real processes through `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBackend;

impl ProcessBackend for SystemBackend {
    fn execute(&self, invocation: &Invocation) -> std::io::Result<RawOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(invocation.args()).stdin(Stdio::null());
        if let Some(root) = &invocation.repo_root {
            cmd.current_dir(root);
        }

        let output = cmd.output()?;
        Ok(RawOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Result of one logical backend command, possibly spanning several batches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub success: bool,
    pub results: Vec<String>,
    pub errors: Vec<String>,
}

impl CommandOutput {
    pub fn succeeded(results: Vec<String>) -> Self {
        Self {
            success: true,
            results,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            errors,
        }
    }

    /// Append a later batch; overall success is the AND of every batch
    pub fn append(&mut self, other: CommandOutput) {
        self.success &= other.success;
        self.results.extend(other.results);
        self.errors.extend(other.errors);
    }

    /// Convert into a hard `Result` for callers that cannot degrade
    pub fn into_result(self, command: &str) -> Result<Vec<String>> {
        if self.success {
            Ok(self.results)
        } else {
            Err(AssetStateError::command_failed(command, &self.errors))
        }
    }

    /// Reclassify error lines containing `filter` as informational output.
    ///
    /// If that empties the error list of a failed command, the command is considered
    /// successful. This is plain substring matching against backend diagnostics and can
    /// misclassify messages that merely mention the filter text.
    pub fn remove_redundant_errors(&mut self, filter: &str) {
        let (redundant, remaining): (Vec<String>, Vec<String>) = std::mem::take(&mut self.errors)
            .into_iter()
            .partition(|line| line.contains(filter));

        let found_redundant = !redundant.is_empty();
        self.results.extend(redundant);
        self.errors = remaining;

        if found_redundant && self.errors.is_empty() && !self.success {
            log::debug!("All errors matched '{filter}', treating command as successful");
            self.success = true;
        }
    }
}

/// Split process output into non-empty lines
pub fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Executes backend commands for one repository
#[derive(Clone)]
pub struct GitRunner {
    backend: Arc<dyn ProcessBackend>,
    git_binary: PathBuf,
    repo_root: PathBuf,
    lfs_binary: Option<PathBuf>,
    batch_size: usize,
}

impl GitRunner {
    pub fn new(git_binary: impl Into<PathBuf>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            backend: Arc::new(SystemBackend),
            git_binary: git_binary.into(),
            repo_root: repo_root.into(),
            lfs_binary: None,
            batch_size: MAX_FILES_PER_BATCH,
        }
    }

    pub fn from_config(config: &EngineConfig, repo_root: impl Into<PathBuf>) -> Self {
        Self::new(config.git_binary.clone(), repo_root)
            .with_lfs_binary(config.lfs_binary.clone())
            .with_batch_size(config.max_files_per_batch)
    }

    pub fn with_backend(mut self, backend: Arc<dyn ProcessBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_lfs_binary(mut self, lfs_binary: Option<PathBuf>) -> Self {
        self.lfs_binary = lfs_binary;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn git_binary(&self) -> &Path {
        &self.git_binary
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run a git command, batching `files` as needed
    pub fn run_command(&self, command: &str, params: &[String], files: &[String]) -> CommandOutput {
        self.run_batched(&self.git_binary, true, command, params, files)
    }

    /// Run a git command without batching, succeeding when the exit code is `expected_code`.
    ///
    /// On success anything written to stderr (push/pull progress and similar) is moved to
    /// the results instead of being reported as errors.
    pub fn run_command_raw(
        &self,
        command: &str,
        params: &[String],
        files: &[String],
        expected_code: i32,
    ) -> CommandOutput {
        let invocation = self.invocation(&self.git_binary, true, command, params, files);
        self.execute(&invocation, expected_code)
    }

    /// Run a git-lfs command through the bundled binary when present, else `git lfs`
    pub fn run_lfs_command(
        &self,
        command: &str,
        params: &[String],
        files: &[String],
    ) -> CommandOutput {
        match self.lfs_binary.as_ref().filter(|path| path.is_file()) {
            Some(lfs_binary) => self.run_batched(lfs_binary, false, command, params, files),
            None => {
                let command = format!("lfs {command}");
                self.run_batched(&self.git_binary, true, &command, params, files)
            }
        }
    }

    /// Stage and commit `files`, amending the first commit with every further batch
    pub fn run_commit(&self, params: &[String], files: &[String]) -> CommandOutput {
        let add_params = vec!["-A".to_string()];
        let mut output = CommandOutput::succeeded(Vec::new());

        for (index, batch) in files.chunks(self.batch_size.max(1)).enumerate() {
            let mut commit_params = params.to_vec();
            if index > 0 {
                commit_params.push("--amend".to_string());
            }
            output.append(self.run_command_raw("add", &add_params, batch, 0));
            output.append(self.run_command_raw("commit", &commit_params, batch, 0));
        }

        if files.is_empty() {
            output.append(self.run_command_raw("add", &add_params, &[], 0));
            output.append(self.run_command_raw("commit", params, &[], 0));
        }

        output
    }

    /// Write the smudged content of `parameter` (`<rev>:<path>`) to `dump_file`
    pub fn run_dump_to_file(&self, parameter: &str, dump_file: &Path) -> Result<()> {
        let invocation = self.invocation(
            &self.git_binary,
            true,
            "cat-file",
            &["--filters".to_string()],
            &[parameter.to_string()],
        );
        log::debug!("$ {}", invocation.display());

        let raw = self
            .backend
            .execute(&invocation)
            .map_err(|e| AssetStateError::command_launch(self.git_binary.to_string_lossy(), e))?;

        if raw.exit_code != Some(0) {
            let errors = split_lines(&raw.stderr);
            log::error!("cat-file exited with {:?}", raw.exit_code);
            return Err(AssetStateError::command_failed("cat-file", &errors));
        }

        std::fs::write(dump_file, &raw.stdout)
            .map_err(|e| AssetStateError::dump_write_failed(dump_file, e))?;
        log::info!("Wrote '{}' ({} bytes)", dump_file.display(), raw.stdout.len());
        Ok(())
    }

    fn run_batched(
        &self,
        program: &Path,
        root_flag: bool,
        command: &str,
        params: &[String],
        files: &[String],
    ) -> CommandOutput {
        if files.len() <= self.batch_size {
            let invocation = self.invocation(program, root_flag, command, params, files);
            return self.execute(&invocation, 0);
        }

        let mut output = CommandOutput::succeeded(Vec::new());
        for batch in files.chunks(self.batch_size) {
            let invocation = self.invocation(program, root_flag, command, params, batch);
            output.append(self.execute(&invocation, 0));
        }
        output
    }

    fn invocation(
        &self,
        program: &Path,
        root_flag: bool,
        command: &str,
        params: &[String],
        files: &[String],
    ) -> Invocation {
        Invocation {
            program: program.to_path_buf(),
            repo_root: Some(self.effective_root(files)),
            root_flag,
            command: command.to_string(),
            params: params.to_vec(),
            files: files.to_vec(),
        }
    }

    /// Files added from outside the project (asset migration) run against their own repository
    fn effective_root(&self, files: &[String]) -> PathBuf {
        if let Some(first) = files.first() {
            let first = Path::new(first);
            if first.is_absolute() && !first.starts_with(&self.repo_root) {
                if let Some(destination) =
                    first.parent().and_then(crate::core::git::find_root_directory)
                {
                    return destination;
                }
            }
        }
        self.repo_root.clone()
    }

    fn execute(&self, invocation: &Invocation, expected_code: i32) -> CommandOutput {
        log::debug!("$ {}", invocation.display());

        let raw = match self.backend.execute(invocation) {
            Ok(raw) => raw,
            Err(e) => {
                let err =
                    AssetStateError::command_launch(invocation.program.to_string_lossy(), e);
                log::error!("{err}");
                return CommandOutput::failed(vec![err.to_string()]);
            }
        };

        let mut results = split_lines(&raw.stdout);
        let mut errors = split_lines(&raw.stderr);
        let success = raw.exit_code == Some(expected_code);

        if success {
            results.append(&mut errors);
        } else {
            log::warn!(
                "{} returned {:?}: {}",
                invocation.display(),
                raw.exit_code,
                errors.join(" | ")
            );
        }

        CommandOutput {
            success,
            results,
            errors,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn files(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("Content/File{i:03}.uasset")).collect()
    }

    #[test]
    fn test_invocation_args_order() {
        let invocation = Invocation {
            program: PathBuf::from("/usr/bin/git"),
            repo_root: Some(PathBuf::from("/project")),
            root_flag: true,
            command: "--no-optional-locks status".to_string(),
            params: vec!["--porcelain".to_string(), String::new()],
            files: vec!["a.uasset".to_string()],
        };
        assert_eq!(
            invocation.args(),
            vec!["-C", "/project", "--no-optional-locks", "status", "--porcelain", "a.uasset"]
        );
        assert_eq!(
            invocation.display(),
            "git -C /project --no-optional-locks status --porcelain a.uasset"
        );
    }

    #[test]
    fn test_batches_large_file_lists_in_order() {
        let backend = ScriptedBackend::new(|invocation| ok(&invocation.files.join("\n")));
        let runner = runner(backend.clone());
        let input = files(120);

        let output = runner.run_command("status", &[], &input);

        assert_eq!(backend.call_count(), 3);
        let batch_sizes: Vec<usize> = backend.calls().iter().map(|c| c.files.len()).collect();
        assert_eq!(batch_sizes, vec![50, 50, 20]);
        assert!(output.success);
        assert_eq!(output.results, input);
    }

    #[test]
    fn test_small_file_list_is_single_invocation() {
        let backend = ScriptedBackend::new(|_| ok("done"));
        let runner = runner(backend.clone());

        let output = runner.run_command("add", &[], &files(50));

        assert_eq!(backend.call_count(), 1);
        assert_eq!(output.results, vec!["done".to_string()]);
    }

    #[test]
    fn test_batch_success_is_logical_and() {
        let backend = ScriptedBackend::new(|invocation| {
            if invocation.files[0].ends_with("050.uasset") {
                fail(1, "error: pathspec did not match")
            } else {
                ok("fine")
            }
        });
        let runner = runner(backend.clone());

        let output = runner.run_command("add", &[], &files(120));

        assert!(!output.success);
        assert_eq!(output.results, vec!["fine".to_string(), "fine".to_string()]);
        assert_eq!(output.errors, vec!["error: pathspec did not match".to_string()]);
    }

    #[test]
    fn test_stderr_merged_into_results_on_expected_code() {
        let backend = ScriptedBackend::new(|_| {
            Ok(RawOutput {
                exit_code: Some(0),
                stdout: b"Already up to date.\n".to_vec(),
                stderr: b"From github.com:org/repo\n".to_vec(),
            })
        });
        let runner = runner(backend);

        let output = runner.run_command("pull", &[], &[]);

        assert!(output.success);
        assert!(output.errors.is_empty());
        assert_eq!(
            output.results,
            vec![
                "Already up to date.".to_string(),
                "From github.com:org/repo".to_string()
            ]
        );
    }

    #[test]
    fn test_unexpected_code_keeps_stderr_as_errors() {
        let backend = ScriptedBackend::new(|_| fail(128, "fatal: not a git repository\n"));
        let runner = runner(backend);

        let output = runner.run_command_raw("status", &[], &[], 0);

        assert!(!output.success);
        assert_eq!(output.errors, vec!["fatal: not a git repository".to_string()]);
    }

    #[test]
    fn test_custom_expected_code() {
        let backend = ScriptedBackend::new(|_| fail(1, "differences found"));
        let runner = runner(backend);

        let output = runner.run_command_raw("diff", &["--quiet".to_string()], &[], 1);

        assert!(output.success);
        assert_eq!(output.results, vec!["differences found".to_string()]);
    }

    #[test]
    fn test_launch_failure_is_failed_output() {
        let backend = ScriptedBackend::new(|_| {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "program not found",
            ))
        });
        let runner = runner(backend);

        let output = runner.run_command("status", &[], &[]);

        assert!(!output.success);
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].contains("program not found"));
    }

    #[test]
    fn test_lfs_command_falls_back_to_git_lfs() {
        let backend = ScriptedBackend::new(|_| ok(""));
        let runner = runner(backend.clone()).with_lfs_binary(Some(PathBuf::from(
            "/definitely/missing/git-lfs",
        )));

        runner.run_lfs_command("locks", &["--local".to_string()], &[]);

        let call = &backend.calls()[0];
        assert_eq!(call.program, PathBuf::from("git"));
        assert_eq!(call.args(), vec!["-C", "/project", "lfs", "locks", "--local"]);
    }

    #[test]
    fn test_lfs_command_uses_bundled_binary() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let lfs = temp_dir.path().join("git-lfs");
        std::fs::write(&lfs, "").unwrap();

        let backend = ScriptedBackend::new(|_| ok(""));
        let runner = runner(backend.clone()).with_lfs_binary(Some(lfs.clone()));

        runner.run_lfs_command("locks", &[], &[]);

        let call = &backend.calls()[0];
        assert_eq!(call.program, lfs);
        assert_eq!(call.args(), vec!["locks"]);
        assert_eq!(call.repo_root, Some(PathBuf::from("/project")));
    }

    #[test]
    fn test_commit_amends_after_first_batch() {
        let backend = ScriptedBackend::new(|_| ok(""));
        let runner = runner(backend.clone());

        let output = runner.run_commit(&["-m".to_string(), "msg".to_string()], &files(60));

        assert!(output.success);
        let commands: Vec<Vec<String>> = backend
            .calls()
            .iter()
            .map(|c| {
                let mut v = vec![c.command.clone()];
                v.extend(c.params.clone());
                v
            })
            .collect();
        assert_eq!(
            commands,
            vec![
                vec!["add", "-A"],
                vec!["commit", "-m", "msg"],
                vec!["add", "-A"],
                vec!["commit", "-m", "msg", "--amend"],
            ]
        );
    }

    #[test]
    fn test_remove_redundant_errors_marks_success() {
        let mut output = CommandOutput {
            success: false,
            results: Vec::new(),
            errors: vec!["Lock exists".to_string(), "Lock exists for b".to_string()],
        };

        output.remove_redundant_errors("Lock exists");

        assert!(output.success);
        assert!(output.errors.is_empty());
        assert_eq!(output.results.len(), 2);
    }

    #[test]
    fn test_remove_redundant_errors_keeps_real_failures() {
        let mut output = CommandOutput {
            success: false,
            results: Vec::new(),
            errors: vec![
                "Lock exists".to_string(),
                "fatal: remote unavailable".to_string(),
            ],
        };

        output.remove_redundant_errors("Lock exists");

        assert!(!output.success);
        assert_eq!(output.errors, vec!["fatal: remote unavailable".to_string()]);
        assert_eq!(output.results, vec!["Lock exists".to_string()]);
    }

    #[test]
    fn test_split_lines_drops_empty_and_carriage_returns() {
        assert_eq!(
            split_lines(b"a\r\n\nb\n"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_dump_to_file_writes_stdout_bytes() {
        let backend = ScriptedBackend::new(|_| {
            Ok(RawOutput {
                exit_code: Some(0),
                stdout: vec![0, 159, 146, 150],
                stderr: Vec::new(),
            })
        });
        let runner = runner(backend.clone());
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dest = temp_dir.path().join("dump.uasset");

        runner.run_dump_to_file("HEAD:Content/A.uasset", &dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), vec![0, 159, 146, 150]);
        assert_eq!(
            backend.calls()[0].args(),
            vec!["-C", "/project", "cat-file", "--filters", "HEAD:Content/A.uasset"]
        );
    }

    #[test]
    fn test_dump_to_file_reports_failure() {
        let backend = ScriptedBackend::new(|_| fail(128, "fatal: invalid object name"));
        let runner = runner(backend);
        let temp_dir = tempfile::TempDir::new().unwrap();

        let err = runner
            .run_dump_to_file("nope:file", &temp_dir.path().join("x"))
            .unwrap_err();

        assert!(matches!(err, AssetStateError::CommandFailed { .. }));
    }
}
