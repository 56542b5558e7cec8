mod cli;
mod commands;
mod observability;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use provision_env::ProvisionError;

fn main() -> ExitCode {
    observability::init_tracing();
    let cli = Cli::parse();

    match run(cli.command.unwrap_or_default()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn run(command: Commands) -> Result<u8> {
    match command {
        Commands::Setup(args) => {
            commands::setup::cmd_setup(&args)?;
            Ok(0)
        }
        Commands::Status(args) => {
            let ready = commands::status::cmd_status(&args)?;
            Ok(if ready { 0 } else { 1 })
        }
        Commands::Clean(args) => {
            commands::clean::cmd_clean(&args)?;
            Ok(0)
        }
    }
}

/// Propagate the failing child's exit code; anything else exits with 1.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ProvisionError>()
        .map(ProvisionError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_env::Step;

    #[test]
    fn test_exit_code_for_step_failure() {
        let err = anyhow::Error::new(ProvisionError::StepFailed {
            step: Step::InstallDependencies,
            code: Some(2),
            output: String::new(),
        });
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn test_exit_code_for_other_errors() {
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), 1);
        let err = anyhow::Error::new(ProvisionError::StepFailed {
            step: Step::UpgradeInstaller,
            code: Some(-1),
            output: String::new(),
        });
        assert_eq!(exit_code_for(&err), 1);
    }
}
