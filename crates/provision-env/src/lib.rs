//! Provision the isolated Python environment the redactor runs in.
//!
//! The sequence is fixed: resolve the project root, create the venv, activate it
//! (as an [`context::EnvContext`] value), upgrade pip, install the requirements,
//! print the banner. The first failing step aborts the run.

pub mod builder;
pub mod context;
pub mod error;
pub mod inventory;
pub mod log;
pub mod pipeline;
pub mod root;
pub mod runner;
pub mod stamp;

pub use context::{EnvContext, EnvLayout};
pub use error::ProvisionError;
pub use pipeline::{
    ExistingEnv, NoopListener, ProvisionPlan, ProvisionReport, Provisioner, Step, StepListener,
};
pub use runner::{CommandRunner, NativeRunner, StepCommand, StepOutput};
