use crate::config::WardenConfig;
use crate::context::CallContext;
use crate::error::CallError;
use crate::guard::Warden;
use crate::handler::Handler;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Guarded operations addressable by name.
#[derive(Default)]
pub struct OperationRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any handler previously registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::warn!(operation = %name, "operation handler replaced");
        }
    }

    /// Wraps `handler` with the policy and audit settings found for `name`
    /// in `config`. Operations absent from the config are registered
    /// unguarded.
    pub fn bind_configured(
        &mut self,
        warden: &Warden,
        config: &WardenConfig,
        name: &str,
        handler: Arc<dyn Handler>,
    ) {
        let mut guard = warden.guard(name, handler);
        match config.operation(name) {
            Some(spec) => {
                if let Some(policy) = &spec.policy {
                    guard = guard.policy(policy.clone());
                }
                if let Some(audit) = &spec.audit {
                    guard = guard.audit(audit.clone());
                }
                guard = guard.audit_denials(spec.audit_denials);
            }
            None => {
                tracing::warn!(operation = name, "operation not configured; registering unguarded");
            }
        }
        self.register(name, guard.build());
    }

    pub async fn call(&self, name: &str, ctx: &CallContext, args: Value) -> Result<Value, CallError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| CallError::UnknownOperation(name.to_string()))?;
        handler.call(ctx, args).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Sorted operation names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
