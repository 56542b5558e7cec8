use clap::{Args, Parser, Subcommand};

/// Redactor Provision - set up the isolated Python environment for the PDF redactor
#[derive(Parser, Debug)]
#[command(name = "redactor-provision")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Defaults to `setup` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the environment, upgrade pip and install the redactor's dependencies
    Setup(SetupArgs),

    /// Show whether the environment exists and satisfies the configured packages
    Status(StatusArgs),

    /// Remove the environment directory
    Clean(CleanArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Setup(SetupArgs::default())
    }
}

/// Where the environment lives.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Project root (default: nearest directory holding redactor.py, else the current dir)
    #[arg(long, value_name = "DIR", env = "PROVISION_ROOT")]
    pub root: Option<String>,

    /// Environment directory name relative to the root (default: venv)
    #[arg(long, value_name = "NAME", env = "PROVISION_ENV_DIR")]
    pub env_dir: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SetupArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Python interpreter used to create the environment (default: python3, then python)
    #[arg(long, value_name = "PATH")]
    pub python: Option<String>,

    /// Package to install, `name` or `name==version` (repeatable; replaces the defaults)
    #[arg(long = "package", value_name = "REQ")]
    pub packages: Vec<String>,

    /// Package index URL passed to pip (default: PYPI_MIRROR_URL, else pip's own)
    #[arg(long, value_name = "URL")]
    pub index_url: Option<String>,

    /// Delete an existing environment before creating it
    #[arg(long, default_value = "false", conflicts_with = "fail_if_exists")]
    pub recreate: bool,

    /// Abort if the environment directory already exists
    #[arg(long, default_value = "false")]
    pub fail_if_exists: bool,

    /// Capture venv/pip output; it is printed with the error when a step fails
    #[arg(long, short, default_value = "false")]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the status as JSON
    #[arg(long, default_value = "false")]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CleanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Show what would be removed without deleting anything
    #[arg(long, default_value = "false")]
    pub dry_run: bool,

    /// Skip the confirmation prompt and the virtual-environment check
    #[arg(long, short, default_value = "false")]
    pub force: bool,
}
