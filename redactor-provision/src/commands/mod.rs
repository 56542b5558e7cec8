pub mod clean;
pub mod setup;
pub mod status;

use anyhow::{Context, Result};
use provision_core::config::{expand_home, ProvisionConfig};
use std::path::PathBuf;

use crate::cli::TargetArgs;

/// Config from env / `.env`, with the CLI target flags applied on top.
pub(crate) fn load_config(target: &TargetArgs) -> Result<ProvisionConfig> {
    let mut cfg = ProvisionConfig::from_env();
    if let Some(ref root) = target.root {
        cfg.root = Some(expand_home(root));
    }
    if let Some(ref env_dir) = target.env_dir {
        cfg.env_dir = env_dir.clone();
    }
    provision_env::root::validate_env_dir(&cfg.env_dir)?;
    Ok(cfg)
}

/// Resolve the project root for commands that inspect an existing environment.
pub(crate) fn resolve_root(cfg: &ProvisionConfig) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Read current directory")?;
    Ok(provision_env::root::resolve_root(cfg.root.as_deref(), &cwd)?)
}
