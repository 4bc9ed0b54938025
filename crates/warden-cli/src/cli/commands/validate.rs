use super::{load_config, report_config_error};
use crate::cli::args::ValidateArgs;
use crate::exit_codes;
use serde_json::json;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let cfg = match load_config(&args.config) {
        Ok(cfg) => cfg,
        Err(code) => return Ok(code),
    };
    let warnings = match cfg.validate() {
        Ok(w) => w,
        Err(e) => return Ok(report_config_error(&e)),
    };
    if let Err(e) = cfg.check_sink() {
        return Ok(report_config_error(&e));
    }

    for w in &warnings {
        tracing::warn!(warning = %w, "config warning");
    }
    let out = json!({
        "config": args.config.display().to_string(),
        "operations": cfg.operations.keys().collect::<Vec<_>>(),
        "warnings": &warnings,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);

    if args.deny_warnings && !warnings.is_empty() {
        return Ok(exit_codes::CONFIG_ERROR);
    }
    Ok(exit_codes::SUCCESS)
}
