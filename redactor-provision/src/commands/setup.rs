//! `redactor-provision setup`: the provisioning sequence (also the no-argument default).

use anyhow::{Context, Result};
use provision_core::config::{expand_home, ObservabilityConfig};
use provision_core::requirement::parse_requirements;
use provision_env::{ExistingEnv, NativeRunner, ProvisionPlan, Provisioner};

use crate::cli::SetupArgs;
use crate::observability::StepReporter;

/// `redactor-provision setup`
pub fn cmd_setup(args: &SetupArgs) -> Result<()> {
    let plan = build_plan(args)?;
    tracing::debug!(
        env_dir = %plan.env_dir,
        packages = plan.requirements.len(),
        existing = ?plan.existing,
        "provisioning plan"
    );
    let reporter = StepReporter::from_env(args.quiet);
    let runner = NativeRunner;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Provisioner::new(plan, &runner)
        .with_listener(&reporter)
        .run(&mut out)?;
    Ok(())
}

/// CLI > env > default.
fn build_plan(args: &SetupArgs) -> Result<ProvisionPlan> {
    let mut cfg = super::load_config(&args.target)?;
    if let Some(ref python) = args.python {
        cfg.python = Some(expand_home(python));
    }
    if !args.packages.is_empty() {
        cfg.packages = args.packages.clone();
    }
    if let Some(ref url) = args.index_url {
        cfg.index_url = Some(url.trim_end_matches('/').to_string());
    }

    let requirements = parse_requirements(&cfg.packages).context("Invalid package list")?;
    let existing = if args.recreate {
        ExistingEnv::Recreate
    } else if args.fail_if_exists {
        ExistingEnv::Fail
    } else {
        ExistingEnv::Reuse
    };

    Ok(ProvisionPlan {
        root: cfg.root,
        start_dir: std::env::current_dir().context("Read current directory")?,
        env_dir: cfg.env_dir,
        python: cfg.python,
        requirements,
        index_url: cfg.index_url,
        existing,
        quiet: args.quiet || ObservabilityConfig::from_env().quiet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::TargetArgs;
    use provision_core::requirement::Requirement;

    #[test]
    fn test_build_plan_cli_overrides() {
        let args = SetupArgs {
            target: TargetArgs {
                root: Some("/srv/redactor".into()),
                env_dir: Some(".venv".into()),
            },
            python: Some("/usr/bin/python3.12".into()),
            packages: vec!["PyMuPDF==1.23.26".into(), "Pillow".into()],
            index_url: Some("https://mirror.example/simple/".into()),
            recreate: true,
            fail_if_exists: false,
            quiet: true,
        };
        let plan = build_plan(&args).unwrap();
        assert_eq!(plan.root.as_deref(), Some(std::path::Path::new("/srv/redactor")));
        assert_eq!(plan.env_dir, ".venv");
        assert_eq!(
            plan.requirements,
            vec![
                Requirement::pinned("PyMuPDF", "1.23.26"),
                Requirement::unpinned("Pillow")
            ]
        );
        assert_eq!(plan.index_url.as_deref(), Some("https://mirror.example/simple"));
        assert_eq!(plan.existing, ExistingEnv::Recreate);
        assert!(plan.quiet);
    }

    #[test]
    fn test_build_plan_rejects_range_specifier() {
        let args = SetupArgs {
            packages: vec!["Pillow>=10".into()],
            ..SetupArgs::default()
        };
        assert!(build_plan(&args).is_err());
    }

    #[test]
    fn test_fail_if_exists_policy() {
        let args = SetupArgs {
            packages: vec!["Pillow".into()],
            fail_if_exists: true,
            ..SetupArgs::default()
        };
        assert_eq!(build_plan(&args).unwrap().existing, ExistingEnv::Fail);
    }

    #[test]
    fn test_build_plan_rejects_env_dir_outside_root() {
        for env_dir in ["", ".", "..", "/tmp/venv", "nested/venv"] {
            let args = SetupArgs {
                target: TargetArgs {
                    root: None,
                    env_dir: Some(env_dir.into()),
                },
                packages: vec!["Pillow".into()],
                ..SetupArgs::default()
            };
            assert!(build_plan(&args).is_err(), "{env_dir:?} should be rejected");
        }
    }
}
