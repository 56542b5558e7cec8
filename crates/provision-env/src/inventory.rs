//! Installed-package inventory (`pip list --format=json`) and requirement checks.

use std::path::Path;

use provision_core::requirement::{normalize_name, Requirement};
use serde::{Deserialize, Serialize};

use crate::builder::list_command;
use crate::context::EnvContext;
use crate::error::ProvisionError;
use crate::runner::CommandRunner;

/// One entry of `pip list --format=json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

/// How one configured requirement stands against the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementStatus {
    pub requirement: String,
    /// Installed version, if the package is present at all.
    pub installed: Option<String>,
    pub satisfied: bool,
}

pub fn parse_pip_list(json: &str) -> Result<Vec<InstalledPackage>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Run `pip list` inside the environment.
pub fn list_installed(
    runner: &dyn CommandRunner,
    ctx: &EnvContext,
    root: &Path,
) -> Result<Vec<InstalledPackage>, ProvisionError> {
    let cmd = list_command(ctx, root);
    let out = runner
        .run(&cmd)
        .map_err(|e| ProvisionError::Inventory(format!("{}: {}", cmd.display(), e)))?;
    if !out.success() {
        return Err(ProvisionError::Inventory(format!(
            "{} exited with {:?}: {}",
            cmd.display(),
            out.code,
            out.stderr.trim()
        )));
    }
    parse_pip_list(&out.stdout).map_err(|e| ProvisionError::Inventory(e.to_string()))
}

/// Match each requirement against the installed set.
pub fn check_requirements(
    requirements: &[Requirement],
    installed: &[InstalledPackage],
) -> Vec<RequirementStatus> {
    requirements
        .iter()
        .map(|req| {
            let found = installed
                .iter()
                .find(|p| normalize_name(&p.name) == req.normalized_name());
            RequirementStatus {
                requirement: req.to_string(),
                installed: found.map(|p| p.version.clone()),
                satisfied: found.map_or(false, |p| req.is_satisfied_by(&p.name, &p.version)),
            }
        })
        .collect()
}

/// Whether the installer itself is present.
pub fn has_installer(installed: &[InstalledPackage]) -> bool {
    installed.iter().any(|p| p.name.eq_ignore_ascii_case("pip"))
}
