//! CommandRunner trait: the seam between the pipeline and real child processes.
//!
//! Every external step is described as a [`StepCommand`] and handed to a runner.
//! [`NativeRunner`] spawns it and blocks until it exits; tests substitute a
//! recording runner.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One blocking external-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    /// Variables set for the child only; the parent environment is never touched.
    pub env: Vec<(OsString, OsString)>,
    /// Variables removed from the child's environment.
    pub env_remove: Vec<OsString>,
    /// Capture stdout/stderr instead of streaming them to the terminal.
    pub capture: bool,
}

impl StepCommand {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
            env_remove: Vec::new(),
            capture: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn envs(mut self, vars: Vec<(OsString, OsString)>, remove: Vec<OsString>) -> Self {
        self.env = vars;
        self.env_remove = remove;
        self
    }

    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Whether any argument equals `needle`.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }
}

/// Result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    /// Exit code; `None` when the child was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout (empty when streamed).
    pub stdout: String,
    /// Captured stderr (empty when streamed).
    pub stderr: String,
}

impl StepOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Extension point for running step commands.
pub trait CommandRunner: Send + Sync {
    /// Runner name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Run `cmd` to completion. `Err` means the process could not be started.
    fn run(&self, cmd: &StepCommand) -> io::Result<StepOutput>;
}

/// Spawns real child processes with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl CommandRunner for NativeRunner {
    fn name(&self) -> &str {
        "native"
    }

    fn run(&self, cmd: &StepCommand) -> io::Result<StepOutput> {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args).current_dir(&cmd.cwd);
        for key in &cmd.env_remove {
            command.env_remove(key);
        }
        command.envs(cmd.env.iter().map(|(k, v)| (k, v)));
        command.stdin(Stdio::null());

        if cmd.capture {
            let out = command.output()?;
            Ok(StepOutput {
                code: out.status.code(),
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            })
        } else {
            let status = command.status()?;
            Ok(StepOutput {
                code: status.code(),
                ..StepOutput::default()
            })
        }
    }
}

/// Program name as shown in error messages.
pub fn program_label(program: &Path) -> String {
    program.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_command_builder_and_display() {
        let cmd = StepCommand::new("/env/bin/python", "/proj")
            .args(["-m", "pip", "install"])
            .arg("Pillow")
            .capture(true);
        assert_eq!(cmd.display(), "/env/bin/python -m pip install Pillow");
        assert!(cmd.has_arg("pip"));
        assert!(!cmd.has_arg("venv"));
        assert!(cmd.capture);
        assert_eq!(cmd.cwd, PathBuf::from("/proj"));
    }

    #[cfg(unix)]
    #[test]
    fn test_native_runner_reports_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let ok = StepCommand::new("sh", tmp.path())
            .args(["-c", "echo out; echo err >&2"])
            .capture(true);
        let out = NativeRunner.run(&ok).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");

        let failing = StepCommand::new("sh", tmp.path())
            .args(["-c", "exit 3"])
            .capture(true);
        let out = NativeRunner.run(&failing).unwrap();
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_native_runner_passes_child_env() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = StepCommand::new("sh", tmp.path())
            .args(["-c", "printf %s \"$PROVISION_RUNNER_TEST\""])
            .envs(
                vec![("PROVISION_RUNNER_TEST".into(), "child-only".into())],
                Vec::new(),
            )
            .capture(true);
        let out = NativeRunner.run(&cmd).unwrap();
        assert_eq!(out.stdout, "child-only");
        assert!(std::env::var("PROVISION_RUNNER_TEST").is_err());
    }

    #[test]
    fn test_native_runner_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = StepCommand::new(tmp.path().join("does-not-exist"), tmp.path());
        assert!(NativeRunner.run(&cmd).is_err());
    }
}
