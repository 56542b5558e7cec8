//! Working-root resolution.
//!
//! The root is the project directory holding `redactor.py`. An explicit root
//! must exist; otherwise the search walks up from the start directory and falls
//! back to the start directory itself.

use std::path::{Component, Path, PathBuf};

use crate::error::ProvisionError;
use crate::pipeline::Step;

/// File that marks the project directory.
pub const PROJECT_MARKER: &str = "redactor.py";

/// Resolve the working root as an absolute path.
pub fn resolve_root(explicit: Option<&Path>, start: &Path) -> Result<PathBuf, ProvisionError> {
    if let Some(dir) = explicit {
        if !dir.is_dir() {
            return Err(ProvisionError::RootNotFound(dir.to_path_buf()));
        }
        return dir
            .canonicalize()
            .map_err(|e| ProvisionError::io(Step::ResolveRoot, "Canonicalize root", e));
    }

    let start = start
        .canonicalize()
        .map_err(|e| ProvisionError::io(Step::ResolveRoot, "Canonicalize start dir", e))?;
    Ok(find_project_root(&start).unwrap_or(start))
}

/// Path of the environment directory under `root`.
///
/// `env_dir` must be one plain directory name: no separators, no `.` or `..`,
/// not absolute and not empty.
pub fn env_path(root: &Path, env_dir: &str) -> Result<PathBuf, ProvisionError> {
    validate_env_dir(env_dir)?;
    Ok(root.join(env_dir))
}

pub fn validate_env_dir(env_dir: &str) -> Result<(), ProvisionError> {
    let invalid = || ProvisionError::InvalidEnvDir(env_dir.to_string());
    if env_dir.contains(['/', '\\']) {
        return Err(invalid());
    }
    let mut components = Path::new(env_dir).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}

/// Nearest ancestor (including `start`) that contains the project marker.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_MARKER).is_file())
        .map(Path::to_path_buf)
}
