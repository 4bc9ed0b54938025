use super::args::{Cli, Command};
use crate::exit_codes;
use std::path::Path;
use warden_core::{ConfigError, WardenConfig};

pub mod check;
pub mod validate;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Check(args) => check::run(args).await,
        Command::Validate(args) => validate::run(args),
    }
}

/// Loads `path` with env overrides applied; reports the error and returns
/// the config exit code on failure.
pub(crate) fn load_config(path: &Path) -> Result<WardenConfig, i32> {
    match WardenConfig::from_file(path) {
        Ok(mut cfg) => {
            cfg.apply_env();
            Ok(cfg)
        }
        Err(e) => Err(report_config_error(&e)),
    }
}

pub(crate) fn report_config_error(e: &ConfigError) -> i32 {
    tracing::error!(error = %e, "config rejected");
    eprintln!("config error: {e}");
    exit_codes::CONFIG_ERROR
}
