//! `redactor-provision status`: does the environment exist and hold the configured packages?

use anyhow::{Context, Result};
use provision_core::requirement::{parse_requirements, Requirement};
use provision_env::inventory::{check_requirements, has_installer, list_installed, RequirementStatus};
use provision_env::stamp::Stamp;
use provision_env::{CommandRunner, EnvContext, NativeRunner};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::StatusArgs;

#[derive(Debug, Serialize)]
pub struct EnvStatus {
    pub root: PathBuf,
    pub env_dir: PathBuf,
    pub exists: bool,
    pub python: Option<PathBuf>,
    pub installer: bool,
    /// Why the installed packages could not be listed (e.g. pip missing).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_error: Option<String>,
    pub stamp: Option<Stamp>,
    /// Stamp was written for exactly the configured requirement set.
    pub stamp_current: bool,
    pub requirements: Vec<RequirementStatus>,
    pub ready: bool,
}

/// `redactor-provision status`. Returns whether the environment is ready.
pub fn cmd_status(args: &StatusArgs) -> Result<bool> {
    let cfg = super::load_config(&args.target)?;
    let root = super::resolve_root(&cfg)?;
    let requirements = parse_requirements(&cfg.packages).context("Invalid package list")?;

    let status = collect_status(&NativeRunner, &root, &cfg.env_dir, &requirements)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(status.ready)
}

pub fn collect_status(
    runner: &dyn CommandRunner,
    root: &Path,
    env_dir: &str,
    requirements: &[Requirement],
) -> Result<EnvStatus> {
    let env_path = provision_env::root::env_path(root, env_dir)?;
    let exists = env_path.is_dir();
    let ctx = if exists {
        EnvContext::from_env_dir(&env_path)
    } else {
        None
    };

    let (installed, inventory_error) = match ctx {
        Some(ref ctx) => match list_installed(runner, ctx, root) {
            Ok(installed) => (installed, None),
            Err(e) => {
                tracing::warn!(env = %env_path.display(), error = %e, "pip list failed");
                (Vec::new(), Some(e.to_string()))
            }
        },
        None => (Vec::new(), None),
    };
    let installer = has_installer(&installed);
    let statuses = check_requirements(requirements, &installed);

    let stamp = Stamp::read(&env_path);
    let stamp_current = stamp.as_ref().map_or(false, |s| s.matches(requirements));
    let ready = ctx.is_some() && installer && statuses.iter().all(|s| s.satisfied);

    Ok(EnvStatus {
        root: root.to_path_buf(),
        env_dir: env_path,
        exists,
        python: ctx.map(|c| c.python),
        installer,
        inventory_error,
        stamp,
        stamp_current,
        requirements: statuses,
        ready,
    })
}

fn print_status(status: &EnvStatus) {
    println!("Environment: {}", status.env_dir.display());
    if !status.exists {
        println!("  (not created)");
    } else {
        match status.python {
            Some(ref python) => println!("  Python: {}", python.display()),
            None => println!("  Python: missing"),
        }
        println!(
            "  pip:    {}",
            if status.installer { "installed" } else { "missing" }
        );
        if let Some(ref err) = status.inventory_error {
            println!("  ({})", err);
        }
        if let Some(ref stamp) = status.stamp {
            println!(
                "  Provisioned: {}{}",
                stamp.installed_at,
                if status.stamp_current { "" } else { " (different package set)" }
            );
        }
    }
    for req in &status.requirements {
        let mark = if req.satisfied { "✓" } else { "✗" };
        let installed = req.installed.as_deref().unwrap_or("missing");
        println!("  {} {} ({})", mark, req.requirement, installed);
    }
    if status.ready {
        println!("Ready.");
    } else {
        println!("Not ready. Run `redactor-provision setup`.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_env::{StepCommand, StepOutput};
    use std::fs;

    struct PipListRunner(&'static str);

    /// `pip list` exits non-zero, as in a venv where ensurepip failed.
    struct NoPipRunner;

    impl CommandRunner for NoPipRunner {
        fn name(&self) -> &str {
            "no-pip"
        }

        fn run(&self, _cmd: &StepCommand) -> std::io::Result<StepOutput> {
            Ok(StepOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "/srv/redactor/venv/bin/python: No module named pip\n".into(),
            })
        }
    }

    impl CommandRunner for PipListRunner {
        fn name(&self) -> &str {
            "pip-list"
        }

        fn run(&self, cmd: &StepCommand) -> std::io::Result<StepOutput> {
            assert!(cmd.has_arg("list"));
            Ok(StepOutput {
                code: Some(0),
                stdout: self.0.to_string(),
                stderr: String::new(),
            })
        }
    }

    fn reqs() -> Vec<Requirement> {
        vec![
            Requirement::pinned("PyMuPDF", "1.24.14"),
            Requirement::unpinned("Pillow"),
        ]
    }

    fn fake_env(root: &Path) {
        let bin = root.join("venv").join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("python"), "").unwrap();
    }

    #[test]
    fn test_status_missing_env() {
        let tmp = tempfile::tempdir().unwrap();
        let status = collect_status(&PipListRunner("[]"), tmp.path(), "venv", &reqs()).unwrap();
        assert!(!status.exists);
        assert!(!status.ready);
        assert!(status.python.is_none());
        assert_eq!(status.requirements.len(), 2);
        assert!(status.requirements.iter().all(|r| !r.satisfied));
    }

    #[test]
    fn test_status_ready() {
        let tmp = tempfile::tempdir().unwrap();
        fake_env(tmp.path());
        Stamp::new(&reqs()).write(&tmp.path().join("venv")).unwrap();
        let runner = PipListRunner(
            r#"[{"name":"pip","version":"24.2"},{"name":"PyMuPDF","version":"1.24.14"},{"name":"pillow","version":"10.4.0"}]"#,
        );

        let status = collect_status(&runner, tmp.path(), "venv", &reqs()).unwrap();
        assert!(status.ready);
        assert!(status.installer);
        assert!(status.stamp_current);
    }

    #[test]
    fn test_status_wrong_pinned_version() {
        let tmp = tempfile::tempdir().unwrap();
        fake_env(tmp.path());
        let runner = PipListRunner(
            r#"[{"name":"pip","version":"24.2"},{"name":"PyMuPDF","version":"1.23.0"},{"name":"Pillow","version":"10.4.0"}]"#,
        );

        let status = collect_status(&runner, tmp.path(), "venv", &reqs()).unwrap();
        assert!(!status.ready);
        assert!(!status.requirements[0].satisfied);
        assert!(status.requirements[1].satisfied);
        assert!(status.stamp.is_none());
    }

    #[test]
    fn test_status_reports_env_without_pip() {
        let tmp = tempfile::tempdir().unwrap();
        fake_env(tmp.path());

        let status = collect_status(&NoPipRunner, tmp.path(), "venv", &reqs()).unwrap();
        assert!(status.exists);
        assert!(status.python.is_some());
        assert!(!status.installer);
        assert!(!status.ready);
        assert!(status.requirements.iter().all(|r| !r.satisfied));
        assert!(status
            .inventory_error
            .as_deref()
            .is_some_and(|e| e.contains("No module named pip")));
    }

    #[test]
    fn test_status_rejects_env_dir_outside_root() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(collect_status(&PipListRunner("[]"), tmp.path(), "..", &reqs()).is_err());
        assert!(collect_status(&PipListRunner("[]"), tmp.path(), "", &reqs()).is_err());
    }
}
