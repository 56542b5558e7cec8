//! The activated environment as a value.
//!
//! Activation never mutates this process: later steps receive an [`EnvContext`]
//! and pass `VIRTUAL_ENV` / `PATH` to their children explicitly.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Config file every venv writes at its top level.
pub const VENV_CONFIG: &str = "pyvenv.cfg";

/// Whether `dir` was created by `python -m venv`.
pub fn is_virtual_env(dir: &Path) -> bool {
    dir.join(VENV_CONFIG).is_file()
}

/// On-disk layout of a venv.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvLayout {
    /// `bin/python`
    Posix,
    /// `Scripts\python.exe`
    Windows,
}

/// Resolved paths inside an isolated environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvContext {
    pub env_dir: PathBuf,
    /// Directory holding the env's executables (`bin` or `Scripts`).
    pub bin_dir: PathBuf,
    pub python: PathBuf,
    pub layout: EnvLayout,
}

impl EnvContext {
    /// Build the context from an environment directory.
    /// Returns `None` when no interpreter exists inside it.
    pub fn from_env_dir(env_dir: &Path) -> Option<Self> {
        let posix = env_dir.join("bin").join("python");
        if posix.exists() {
            return Some(Self {
                env_dir: env_dir.to_path_buf(),
                bin_dir: env_dir.join("bin"),
                python: posix,
                layout: EnvLayout::Posix,
            });
        }
        let windows = env_dir.join("Scripts").join("python.exe");
        if windows.exists() {
            return Some(Self {
                env_dir: env_dir.to_path_buf(),
                bin_dir: env_dir.join("Scripts"),
                python: windows,
                layout: EnvLayout::Windows,
            });
        }
        None
    }

    /// Variables the activate script would set, and the ones it unsets.
    pub fn child_env(&self) -> (Vec<(OsString, OsString)>, Vec<OsString>) {
        let existing = std::env::var_os("PATH").unwrap_or_default();
        let path = std::env::join_paths(
            std::iter::once(self.bin_dir.clone()).chain(std::env::split_paths(&existing)),
        )
        .unwrap_or_else(|_| self.bin_dir.clone().into_os_string());
        (
            vec![
                ("VIRTUAL_ENV".into(), self.env_dir.clone().into_os_string()),
                ("PATH".into(), path),
            ],
            vec!["PYTHONHOME".into()],
        )
    }

    /// Follow-up command printed in the completion banner.
    pub fn activation_hint(&self, root: &Path) -> String {
        let rel = self.env_dir.strip_prefix(root).unwrap_or(&self.env_dir);
        match self.layout {
            EnvLayout::Posix => format!(
                "source {}/bin/activate && python redactor.py",
                rel.to_string_lossy()
            ),
            EnvLayout::Windows => format!(
                "{}\\Scripts\\activate && python redactor.py",
                rel.to_string_lossy()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_from_env_dir_posix() {
        let tmp = tempfile::tempdir().unwrap();
        let env = tmp.path().join("venv");
        fs::create_dir_all(env.join("bin")).unwrap();
        fs::write(env.join("bin").join("python"), "").unwrap();

        let ctx = EnvContext::from_env_dir(&env).unwrap();
        assert_eq!(ctx.layout, EnvLayout::Posix);
        assert_eq!(ctx.bin_dir, env.join("bin"));
        assert_eq!(
            ctx.activation_hint(tmp.path()),
            "source venv/bin/activate && python redactor.py"
        );
    }

    #[test]
    fn test_from_env_dir_windows() {
        let tmp = tempfile::tempdir().unwrap();
        let env = tmp.path().join("venv");
        fs::create_dir_all(env.join("Scripts")).unwrap();
        fs::write(env.join("Scripts").join("python.exe"), "").unwrap();

        let ctx = EnvContext::from_env_dir(&env).unwrap();
        assert_eq!(ctx.layout, EnvLayout::Windows);
        assert_eq!(
            ctx.activation_hint(tmp.path()),
            "venv\\Scripts\\activate && python redactor.py"
        );
    }

    #[test]
    fn test_from_env_dir_missing_interpreter() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(EnvContext::from_env_dir(&tmp.path().join("venv")).is_none());
    }

    #[test]
    fn test_child_env_prefixes_path() {
        let tmp = tempfile::tempdir().unwrap();
        let env = tmp.path().join("venv");
        fs::create_dir_all(env.join("bin")).unwrap();
        fs::write(env.join("bin").join("python"), "").unwrap();
        let ctx = EnvContext::from_env_dir(&env).unwrap();

        let (vars, removed) = ctx.child_env();
        let virtual_env = vars.iter().find(|(k, _)| k == "VIRTUAL_ENV").unwrap();
        assert_eq!(PathBuf::from(&virtual_env.1), env);
        let path = vars.iter().find(|(k, _)| k == "PATH").unwrap();
        let first = std::env::split_paths(&path.1).next().unwrap();
        assert_eq!(first, env.join("bin"));
        assert_eq!(removed, vec![OsString::from("PYTHONHOME")]);
    }
}
