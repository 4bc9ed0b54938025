use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "Role/permission authorization and operation audit for guarded back-office operations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate an operation's policy for a caller
    Check(CheckArgs),
    /// Load and validate a config file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct CheckArgs {
    #[arg(long, env = "WARDEN_CONFIG", default_value = "warden.yaml")]
    pub config: PathBuf,

    /// Operation name as listed under `operations:`
    #[arg(long)]
    pub operation: String,

    /// Caller ID; authorities are read from the config directory
    #[arg(long)]
    pub user: Option<String>,

    /// Extra granted role (repeatable); implies an authenticated caller
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// Extra granted permission (repeatable); implies an authenticated caller
    #[arg(long = "permission")]
    pub permissions: Vec<String>,

    /// Include the membership probes in the output
    #[arg(long)]
    pub explain: bool,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    #[arg(long, env = "WARDEN_CONFIG", default_value = "warden.yaml")]
    pub config: PathBuf,

    /// Exit non-zero when warnings are reported
    #[arg(long)]
    pub deny_warnings: bool,
}
