//! `redactor-provision clean`: remove the environment directory.
//!
//! Provisioning never cleans up after a failed step; this is the operator's tool
//! for discarding a partial or unwanted environment.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use provision_env::context::{is_virtual_env, VENV_CONFIG};
use walkdir::WalkDir;

use crate::cli::CleanArgs;

/// `redactor-provision clean`
pub fn cmd_clean(args: &CleanArgs) -> Result<()> {
    let cfg = super::load_config(&args.target)?;
    let root = super::resolve_root(&cfg)?;
    let env_path = provision_env::root::env_path(&root, &cfg.env_dir)?;

    if !env_path.exists() {
        eprintln!("No environment found at {}", env_path.display());
        return Ok(());
    }
    if !args.force && !is_virtual_env(&env_path) {
        bail!(
            "{} does not look like a virtual environment (no {}); pass --force to remove it anyway",
            env_path.display(),
            VENV_CONFIG
        );
    }

    let size = dir_size(&env_path);
    eprintln!("🗂  Environment {} ({})", env_path.display(), format_size(size));

    if args.dry_run {
        eprintln!("(Dry run, nothing removed. Drop --dry-run to delete.)");
        return Ok(());
    }

    if !args.force {
        eprint!("\nRemove this environment? [y/N] ");
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    remove_env(&env_path)?;
    eprintln!("✓ Removed {}, freed {}", env_path.display(), format_size(size));
    Ok(())
}

fn remove_env(env_path: &Path) -> Result<()> {
    fs::remove_dir_all(env_path)
        .with_context(|| format!("Failed to remove {}", env_path.display()))
}

/// Total size of regular files under `path`.
fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Format byte size to human-readable string.
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::TargetArgs;

    fn make_env(root: &Path) -> std::path::PathBuf {
        let env = root.join("venv");
        fs::create_dir_all(env.join("lib")).unwrap();
        fs::write(env.join(VENV_CONFIG), "home = /usr/bin\n").unwrap();
        fs::write(env.join("lib").join("blob"), vec![0u8; 2048]).unwrap();
        env
    }

    fn args(root: &Path, dry_run: bool, force: bool) -> CleanArgs {
        args_with_env_dir(root, "venv", dry_run, force)
    }

    fn args_with_env_dir(root: &Path, env_dir: &str, dry_run: bool, force: bool) -> CleanArgs {
        CleanArgs {
            target: TargetArgs {
                root: Some(root.to_string_lossy().to_string()),
                env_dir: Some(env_dir.into()),
            },
            dry_run,
            force,
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_dir_size_counts_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let env = make_env(tmp.path());
        assert_eq!(dir_size(&env), 2048 + "home = /usr/bin\n".len() as u64);
    }

    #[test]
    fn test_dry_run_keeps_env() {
        let tmp = tempfile::tempdir().unwrap();
        let env = make_env(tmp.path());
        cmd_clean(&args(tmp.path(), true, false)).unwrap();
        assert!(env.exists());
    }

    #[test]
    fn test_force_removes_env() {
        let tmp = tempfile::tempdir().unwrap();
        let env = make_env(tmp.path());
        cmd_clean(&args(tmp.path(), false, true)).unwrap();
        assert!(!env.exists());
    }

    #[test]
    fn test_refuses_non_venv_without_force() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("venv")).unwrap();
        assert!(cmd_clean(&args(tmp.path(), false, false)).is_err());
        assert!(tmp.path().join("venv").exists());
    }

    #[test]
    fn test_force_never_removes_the_project_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("project");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("redactor.py"), "").unwrap();

        for env_dir in ["", ".", ".."] {
            assert!(cmd_clean(&args_with_env_dir(&root, env_dir, false, true)).is_err());
        }
        assert!(root.join("redactor.py").exists());
    }

    #[test]
    fn test_missing_env_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        cmd_clean(&args(tmp.path(), false, true)).unwrap();
    }
}
