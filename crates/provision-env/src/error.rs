//! Fatal step failures. Every variant aborts the provisioning run.

use std::io;
use std::path::PathBuf;

use provision_core::requirement::RequirementError;
use thiserror::Error;

use crate::pipeline::Step;

/// Errors returned by the provisioner.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Project root {} does not exist or is not a directory", .0.display())]
    RootNotFound(PathBuf),

    #[error("Python interpreter not found: {0}")]
    InterpreterNotFound(String),

    #[error("Environment {} already exists (remove it or pass --recreate)", .0.display())]
    EnvExists(PathBuf),

    #[error("Invalid environment directory '{0}': expected a single directory name under the project root")]
    InvalidEnvDir(String),

    #[error("{} is not a virtual environment (no pyvenv.cfg); refusing to remove it", .0.display())]
    NotVirtualEnv(PathBuf),

    #[error("Environment {} has no Python interpreter (bin/python or Scripts/python.exe)", .0.display())]
    EnvUnusable(PathBuf),

    #[error("{step}: failed to start {program}: {source}")]
    Spawn {
        step: Step,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{step} failed ({}){}", describe_exit(.code), output_suffix(.output))]
    StepFailed {
        step: Step,
        code: Option<i32>,
        /// Captured stdout and stderr; empty when the output was streamed.
        output: String,
    },

    #[error("{step}: {context}: {source}")]
    Io {
        step: Step,
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot list installed packages: {0}")]
    Inventory(String),

    #[error(transparent)]
    Requirements(#[from] RequirementError),
}

impl ProvisionError {
    /// The step the run aborted at, when the error belongs to one.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::RootNotFound(_) => Some(Step::ResolveRoot),
            Self::InterpreterNotFound(_) | Self::EnvExists(_) | Self::NotVirtualEnv(_) => {
                Some(Step::CreateEnv)
            }
            Self::EnvUnusable(_) => Some(Step::Activate),
            Self::Spawn { step, .. } | Self::StepFailed { step, .. } | Self::Io { step, .. } => {
                Some(*step)
            }
            Self::InvalidEnvDir(_) | Self::Inventory(_) | Self::Requirements(_) => None,
        }
    }

    /// Process exit code: the failing child's own code, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }

    pub(crate) fn io(step: Step, context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            step,
            context: context.into(),
            source,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

fn output_suffix(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_propagates_child_code() {
        let err = ProvisionError::StepFailed {
            step: Step::UpgradeInstaller,
            code: Some(2),
            output: String::new(),
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.step(), Some(Step::UpgradeInstaller));

        let signalled = ProvisionError::StepFailed {
            step: Step::InstallDependencies,
            code: None,
            output: String::new(),
        };
        assert_eq!(signalled.exit_code(), 1);
        assert_eq!(
            ProvisionError::InterpreterNotFound("python3".into()).exit_code(),
            1
        );
    }

    #[test]
    fn test_step_failed_message_includes_output() {
        let err = ProvisionError::StepFailed {
            step: Step::InstallDependencies,
            code: Some(1),
            output: "ERROR: No matching distribution found for PyMuPDF==0.0.0\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "install dependencies failed (exit code 1): ERROR: No matching distribution found for PyMuPDF==0.0.0"
        );
    }
}
