use super::{load_config, report_config_error};
use crate::cli::args::CheckArgs;
use crate::exit_codes;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use warden_core::{
    Authorities, AuthorityStore, AuthorityStoreError, Authorizer, CallContext,
    ContextIdentityResolver, ConfigError, InMemoryDirectory, Principal,
};
use warden_policy::{Decision, DecisionReason, Dimension, EvaluationTrace};

/// Principal evaluated when only explicit grants are given.
const CLI_PRINCIPAL: &str = "cli";

/// Directory authorities widened by the `--role` / `--permission` grants.
struct GrantedStore {
    directory: InMemoryDirectory,
    explicit: Authorities,
}

#[async_trait]
impl AuthorityStore for GrantedStore {
    async fn authorities_of(&self, principal_id: &str) -> Result<Authorities, AuthorityStoreError> {
        let mut granted = self.directory.effective(principal_id)?;
        granted.roles.extend(self.explicit.roles.iter().cloned());
        granted
            .permissions
            .extend(self.explicit.permissions.iter().cloned());
        Ok(granted)
    }
}

pub async fn run(args: CheckArgs) -> anyhow::Result<i32> {
    let cfg = match load_config(&args.config) {
        Ok(cfg) => cfg,
        Err(code) => return Ok(code),
    };
    let Some(op) = cfg.operation(&args.operation) else {
        return Ok(report_config_error(&ConfigError::Invalid(format!(
            "operation '{}' is not configured",
            args.operation
        ))));
    };
    let directory = match cfg.build_directory() {
        Ok(d) => d,
        Err(e) => return Ok(report_config_error(&e)),
    };

    let explicit = Authorities::from_codes(
        args.roles.iter().cloned(),
        args.permissions.iter().cloned(),
    );
    let caller = args
        .user
        .as_deref()
        .map(Principal::new)
        .filter(|p| !p.is_anonymous())
        .or_else(|| (!explicit.is_empty()).then(|| Principal::new(CLI_PRINCIPAL)));

    let (principal, granted, decision, trace) = match &op.policy {
        Some(policy) => {
            let mut ctx = CallContext::new();
            if let Some(p) = caller {
                ctx = ctx.with_principal(p);
            }
            let store = GrantedStore {
                directory,
                explicit,
            };
            let verdict = Authorizer::new(Arc::new(ContextIdentityResolver), Arc::new(store))
                .decide(&args.operation, policy, &ctx)
                .await
                .with_context(|| format!("failed to evaluate '{}'", args.operation))?;
            (
                verdict.principal,
                verdict.authorities,
                verdict.decision,
                verdict.trace,
            )
        }
        None => (
            caller,
            Authorities::default(),
            Decision::allow(),
            EvaluationTrace::default(),
        ),
    };

    let mut out = json!({
        "operation": args.operation,
        "principal": principal.map(|p| p.id),
        "guarded": op.policy.is_some(),
        "allowed": decision.allowed,
        "reason_code": decision.reason.reason_code(),
        "missing": decision.reason.missing_code(),
        "message": decision.reason.to_string(),
        "status": status_of(&decision),
        "authorities": granted,
    });
    if args.explain {
        out["probes"] = probes_json(&trace);
    }
    println!("{}", serde_json::to_string_pretty(&out)?);

    Ok(exit_code(&decision))
}

fn status_of(decision: &Decision) -> u16 {
    match decision.reason {
        DecisionReason::Ok => 200,
        DecisionReason::Unauthenticated => 401,
        DecisionReason::MissingRole(_) | DecisionReason::MissingPermission(_) => 403,
    }
}

fn exit_code(decision: &Decision) -> i32 {
    match decision.reason {
        DecisionReason::Ok => exit_codes::SUCCESS,
        DecisionReason::Unauthenticated => exit_codes::UNAUTHENTICATED,
        DecisionReason::MissingRole(_) | DecisionReason::MissingPermission(_) => {
            exit_codes::FORBIDDEN
        }
    }
}

fn probes_json(trace: &EvaluationTrace) -> Value {
    trace
        .probes
        .iter()
        .map(|p| {
            json!({
                "dimension": match p.dimension {
                    Dimension::Roles => "role",
                    Dimension::Permissions => "permission",
                },
                "code": p.code,
                "granted": p.granted,
            })
        })
        .collect()
}
