//! Build the step commands (venv / pip) and run them through a [`CommandRunner`].

use std::path::{Path, PathBuf};

use provision_core::requirement::Requirement;

use crate::context::EnvContext;
use crate::error::ProvisionError;
use crate::pipeline::Step;
use crate::runner::{program_label, CommandRunner, StepCommand, StepOutput};

/// Interpreter names tried in order when none is configured.
const PYTHON_CANDIDATES: &[&str] = &["python3", "python"];

/// Locate the interpreter used to create the environment.
///
/// An explicit path (anything with a directory component) must be a file; a bare
/// name is looked up on `PATH`.
pub fn find_python(explicit: Option<&Path>) -> Result<PathBuf, ProvisionError> {
    if let Some(python) = explicit {
        let is_path = python.is_absolute() || python.components().count() > 1;
        if is_path {
            return if python.is_file() {
                Ok(python.to_path_buf())
            } else {
                Err(ProvisionError::InterpreterNotFound(
                    python.display().to_string(),
                ))
            };
        }
        return which::which(python)
            .map_err(|_| ProvisionError::InterpreterNotFound(python.display().to_string()));
    }

    PYTHON_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| {
            ProvisionError::InterpreterNotFound(format!(
                "{} not found in PATH",
                PYTHON_CANDIDATES.join(" or ")
            ))
        })
}

/// `<python> -m venv <env>`
pub fn venv_command(python: &Path, env_path: &Path, root: &Path) -> StepCommand {
    StepCommand::new(python, root)
        .args(["-m", "venv"])
        .arg(env_path)
}

/// `<env python> -m pip install --upgrade pip`
pub fn upgrade_installer_command(
    ctx: &EnvContext,
    root: &Path,
    index_url: Option<&str>,
) -> StepCommand {
    let (vars, remove) = ctx.child_env();
    StepCommand::new(&ctx.python, root)
        .args(["-m", "pip", "install", "--upgrade"])
        .args(index_args(index_url))
        .arg("pip")
        .envs(vars, remove)
}

/// `<env python> -m pip install <requirements...>`
pub fn install_command(
    ctx: &EnvContext,
    root: &Path,
    requirements: &[Requirement],
    index_url: Option<&str>,
) -> StepCommand {
    let (vars, remove) = ctx.child_env();
    StepCommand::new(&ctx.python, root)
        .args(["-m", "pip", "install"])
        .args(index_args(index_url))
        .args(requirements.iter().map(|r| r.to_string()))
        .envs(vars, remove)
}

/// `<env python> -m pip list --format=json`
pub fn list_command(ctx: &EnvContext, root: &Path) -> StepCommand {
    let (vars, remove) = ctx.child_env();
    StepCommand::new(&ctx.python, root)
        .args([
            "-m",
            "pip",
            "list",
            "--format=json",
            "--disable-pip-version-check",
        ])
        .envs(vars, remove)
        .capture(true)
}

fn index_args(index_url: Option<&str>) -> Vec<String> {
    match index_url {
        Some(url) => vec!["--index-url".to_string(), url.to_string()],
        None => Vec::new(),
    }
}

/// Run one step command; spawn errors and non-zero exits are fatal.
pub fn run_step(
    runner: &dyn CommandRunner,
    step: Step,
    cmd: &StepCommand,
) -> Result<StepOutput, ProvisionError> {
    tracing::debug!(step = %step, runner = runner.name(), command = %cmd.display(), "running");
    let out = runner.run(cmd).map_err(|source| ProvisionError::Spawn {
        step,
        program: program_label(&cmd.program),
        source,
    })?;
    if !out.success() {
        return Err(ProvisionError::StepFailed {
            step,
            code: out.code,
            output: failure_output(&out),
        });
    }
    Ok(out)
}

/// Captured stdout followed by stderr, skipping empty streams.
fn failure_output(out: &StepOutput) -> String {
    [out.stdout.trim(), out.stderr.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}
