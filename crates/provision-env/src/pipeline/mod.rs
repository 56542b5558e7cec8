//! The provisioning sequence.
//!
//! Six steps run in a fixed order; each either succeeds and hands its result to
//! the next or returns the error that ends the run:
//!
//! 1. resolve the working root
//! 2. create the venv (`python -m venv`)
//! 3. activate it ([`EnvContext`])
//! 4. upgrade pip
//! 5. install the requirements, then write the stamp
//! 6. print the completion banner
//!
//! The plan is checked before step 1 so a bad env dir or an empty requirement
//! set never reaches a child process. Nothing is retried and nothing is cleaned
//! up after a failure.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use provision_core::requirement::Requirement;
use serde::Serialize;

use crate::builder;
use crate::context::{is_virtual_env, EnvContext, VENV_CONFIG};
use crate::error::ProvisionError;
use crate::info_log;
use crate::root::{resolve_root, validate_env_dir};
use crate::runner::CommandRunner;
use crate::stamp::Stamp;


/// One stage of the provisioning sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ResolveRoot,
    CreateEnv,
    Activate,
    UpgradeInstaller,
    InstallDependencies,
    Banner,
}

impl Step {
    /// Execution order.
    pub const ALL: [Step; 6] = [
        Step::ResolveRoot,
        Step::CreateEnv,
        Step::Activate,
        Step::UpgradeInstaller,
        Step::InstallDependencies,
        Step::Banner,
    ];

    /// 1-based position in [`Step::ALL`].
    pub fn number(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .map_or(0, |i| i + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::ResolveRoot => "resolve root",
            Step::CreateEnv => "create environment",
            Step::Activate => "activate environment",
            Step::UpgradeInstaller => "upgrade installer",
            Step::InstallDependencies => "install dependencies",
            Step::Banner => "banner",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when the environment directory already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingEnv {
    /// Run `python -m venv` over it and continue (re-runs are harmless).
    #[default]
    Reuse,
    /// Delete it first, then create from scratch.
    Recreate,
    /// Abort at the create step.
    Fail,
}

/// Inputs for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionPlan {
    /// Explicit root; `None` searches upward from `start_dir`.
    pub root: Option<PathBuf>,
    pub start_dir: PathBuf,
    /// Environment directory, relative to the root.
    pub env_dir: String,
    /// Interpreter used to create the venv; `None` searches `PATH`.
    pub python: Option<PathBuf>,
    pub requirements: Vec<Requirement>,
    pub index_url: Option<String>,
    pub existing: ExistingEnv,
    /// Capture child output instead of streaming it.
    pub quiet: bool,
}

impl ProvisionPlan {
    /// Reject plans that must not start: an env dir that is not a plain name
    /// under the root, or nothing to install.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        validate_env_dir(&self.env_dir)?;
        if self.requirements.is_empty() {
            return Err(provision_core::requirement::RequirementError::NoPackages.into());
        }
        Ok(())
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub root: PathBuf,
    pub env_dir: PathBuf,
    pub python: PathBuf,
    pub requirements: Vec<Requirement>,
    pub steps: Vec<Step>,
}

/// Observer for step progress (console output, journal).
pub trait StepListener {
    fn step_started(&self, _step: Step) {}
    fn step_finished(&self, _step: Step, _elapsed: Duration) {}
    fn step_failed(&self, _step: Step, _error: &ProvisionError) {}
}

/// Listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl StepListener for NoopListener {}

pub struct Provisioner<'a> {
    plan: ProvisionPlan,
    runner: &'a dyn CommandRunner,
    listener: &'a dyn StepListener,
}

impl<'a> Provisioner<'a> {
    pub fn new(plan: ProvisionPlan, runner: &'a dyn CommandRunner) -> Self {
        Self {
            plan,
            runner,
            listener: &NoopListener,
        }
    }

    pub fn with_listener(mut self, listener: &'a dyn StepListener) -> Self {
        self.listener = listener;
        self
    }

    /// Run the whole sequence. The banner goes to `out` and only on success.
    pub fn run(&self, out: &mut dyn Write) -> Result<ProvisionReport, ProvisionError> {
        self.plan.validate()?;
        let mut done = Vec::with_capacity(Step::ALL.len());

        let root = self.step(&mut done, Step::ResolveRoot, || self.resolve_root())?;
        let env_path = self.step(&mut done, Step::CreateEnv, || self.create_env(&root))?;
        let ctx = self.step(&mut done, Step::Activate, || activate(&env_path))?;
        self.step(&mut done, Step::UpgradeInstaller, || {
            self.upgrade_installer(&root, &ctx)
        })?;
        self.step(&mut done, Step::InstallDependencies, || {
            self.install_dependencies(&root, &ctx)
        })?;
        self.step(&mut done, Step::Banner, || self.banner(out, &root, &ctx))?;

        Ok(ProvisionReport {
            root,
            env_dir: ctx.env_dir,
            python: ctx.python,
            requirements: self.plan.requirements.clone(),
            steps: done,
        })
    }

    fn step<T>(
        &self,
        done: &mut Vec<Step>,
        step: Step,
        f: impl FnOnce() -> Result<T, ProvisionError>,
    ) -> Result<T, ProvisionError> {
        self.listener.step_started(step);
        let started = Instant::now();
        match f() {
            Ok(value) => {
                let elapsed = started.elapsed();
                let elapsed_ms = elapsed.as_millis() as u64;
                tracing::debug!(step = %step, elapsed_ms, "step finished");
                self.listener.step_finished(step, elapsed);
                done.push(step);
                Ok(value)
            }
            Err(e) => {
                tracing::error!(step = %step, error = %e, "provisioning aborted");
                self.listener.step_failed(step, &e);
                Err(e)
            }
        }
    }

    fn resolve_root(&self) -> Result<PathBuf, ProvisionError> {
        let root = resolve_root(self.plan.root.as_deref(), &self.plan.start_dir)?;
        info_log!("Working root: {}", root.display());
        Ok(root)
    }

    fn create_env(&self, root: &Path) -> Result<PathBuf, ProvisionError> {
        let python = builder::find_python(self.plan.python.as_deref())?;
        let env_path = crate::root::env_path(root, &self.plan.env_dir)?;

        if env_path.exists() {
            match self.plan.existing {
                ExistingEnv::Fail => return Err(ProvisionError::EnvExists(env_path)),
                ExistingEnv::Recreate => {
                    if !is_virtual_env(&env_path) {
                        tracing::warn!(
                            env = %env_path.display(),
                            "no {} found, not removing", VENV_CONFIG
                        );
                        return Err(ProvisionError::NotVirtualEnv(env_path));
                    }
                    info_log!("Removing existing environment {}", env_path.display());
                    std::fs::remove_dir_all(&env_path).map_err(|e| {
                        ProvisionError::io(Step::CreateEnv, "Remove existing environment", e)
                    })?;
                }
                ExistingEnv::Reuse => {
                    info_log!("Environment {} exists, re-running venv over it", env_path.display());
                }
            }
        }

        info_log!("Creating environment {} with {}", env_path.display(), python.display());
        let cmd = builder::venv_command(&python, &env_path, root).capture(self.plan.quiet);
        builder::run_step(self.runner, Step::CreateEnv, &cmd)?;
        Ok(env_path)
    }

    fn upgrade_installer(&self, root: &Path, ctx: &EnvContext) -> Result<(), ProvisionError> {
        info_log!("Upgrading pip in {}", ctx.env_dir.display());
        let cmd = builder::upgrade_installer_command(ctx, root, self.plan.index_url.as_deref())
            .capture(self.plan.quiet);
        builder::run_step(self.runner, Step::UpgradeInstaller, &cmd)?;
        Ok(())
    }

    fn install_dependencies(&self, root: &Path, ctx: &EnvContext) -> Result<(), ProvisionError> {
        let reqs = &self.plan.requirements;
        info_log!(
            "Installing {}",
            reqs.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
        );
        let cmd = builder::install_command(ctx, root, reqs, self.plan.index_url.as_deref())
            .capture(self.plan.quiet);
        builder::run_step(self.runner, Step::InstallDependencies, &cmd)?;

        Stamp::new(reqs)
            .write(&ctx.env_dir)
            .map_err(|e| ProvisionError::io(Step::InstallDependencies, "Write provision stamp", e))
    }

    fn banner(&self, out: &mut dyn Write, root: &Path, ctx: &EnvContext) -> Result<(), ProvisionError> {
        let text = render_banner(root, ctx, &self.plan.requirements);
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| ProvisionError::io(Step::Banner, "Write banner", e))
    }
}

fn activate(env_path: &Path) -> Result<EnvContext, ProvisionError> {
    let ctx = EnvContext::from_env_dir(env_path)
        .ok_or_else(|| ProvisionError::EnvUnusable(env_path.to_path_buf()))?;
    info_log!("Activated {} ({})", ctx.env_dir.display(), ctx.python.display());
    Ok(ctx)
}

/// Completion message; the follow-up command is its last line.
pub fn render_banner(root: &Path, ctx: &EnvContext, requirements: &[Requirement]) -> String {
    let packages = requirements
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "\n✅ Setup complete!\n   Environment: {}\n   Packages: {}\n\nTo run the redactor:\n   {}\n",
        ctx.env_dir.display(),
        packages,
        ctx.activation_hint(root)
    )
}
