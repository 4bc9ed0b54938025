//! Authorization interceptor.
//!
//! Flow for a guarded call:
//! 1. Resolve the principal from the call context (none / anonymous ⇒ unauthenticated)
//! 2. Fetch the principal's current authorities (store failure aborts the call)
//! 3. Evaluate the descriptor
//! 4. Deny ⇒ [`CallError::Unauthorized`]; the inner handler never runs
//! 5. Allow ⇒ invoke the inner handler with the principal attached to the context

use crate::authority::{AuthorityStore, AuthorityStoreError};
use crate::context::{CallContext, Principal};
use crate::error::CallError;
use crate::handler::Handler;
use crate::identity::{authenticated, IdentityResolver};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use warden_policy::{
    evaluate_traced, reason_codes, AuthorizationError, Authorities, Decision, DecisionReason,
    EvaluationTrace, PolicyDescriptor,
};

/// Outcome of [`Authorizer::decide`].
#[derive(Debug, Clone)]
pub struct Verdict {
    /// `None` when the caller is not authenticated
    pub principal: Option<Principal>,
    /// Authorities the decision was evaluated against
    pub authorities: Authorities,
    pub decision: Decision,
    pub trace: EvaluationTrace,
}

/// Resolves identity and authorities and renders a decision.
#[derive(Clone)]
pub struct Authorizer {
    identity: Arc<dyn IdentityResolver>,
    authorities: Arc<dyn AuthorityStore>,
    store_timeout: Option<Duration>,
}

impl Authorizer {
    pub fn new(identity: Arc<dyn IdentityResolver>, authorities: Arc<dyn AuthorityStore>) -> Self {
        Self {
            identity,
            authorities,
            store_timeout: None,
        }
    }

    /// Bound the authority lookup; expiry surfaces as
    /// [`AuthorityStoreError::Timeout`], never as a denial.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Checks `policy` for the caller of `ctx` and returns the authenticated
    /// principal on success.
    pub async fn authorize(
        &self,
        operation: &str,
        policy: &PolicyDescriptor,
        ctx: &CallContext,
    ) -> Result<Principal, CallError> {
        let verdict = self.decide(operation, policy, ctx).await?;
        if !verdict.decision.allowed {
            return Err(CallError::Unauthorized(AuthorizationError {
                reason: verdict.decision.reason,
            }));
        }
        verdict
            .principal
            .ok_or_else(|| CallError::from(AuthorizationError::unauthenticated()))
    }

    /// Renders the full decision for the caller of `ctx`.
    ///
    /// Denials are part of the [`Verdict`]; only an unavailable authority
    /// store is an error.
    pub async fn decide(
        &self,
        operation: &str,
        policy: &PolicyDescriptor,
        ctx: &CallContext,
    ) -> Result<Verdict, CallError> {
        let principal = match authenticated(self.identity.resolve(ctx)) {
            Ok(p) => p,
            Err(e) => {
                // Fail closed: an unresolvable identity is treated as absent.
                tracing::warn!(operation, error = %e, "identity resolution failed");
                None
            }
        };

        let Some(principal) = principal else {
            tracing::info!(
                operation,
                reason = reason_codes::UNAUTHENTICATED,
                "authorization denied"
            );
            return Ok(Verdict {
                principal: None,
                authorities: Authorities::default(),
                decision: Decision::deny(DecisionReason::Unauthenticated),
                trace: EvaluationTrace::default(),
            });
        };

        let authorities = self.fetch_authorities(operation, &principal).await?;
        let (decision, trace) =
            evaluate_traced(&authorities.roles, &authorities.permissions, policy, true);

        if decision.allowed {
            tracing::debug!(operation, principal = %principal.id, "authorization granted");
        } else {
            tracing::info!(
                operation,
                principal = %principal.id,
                reason = decision.reason.reason_code(),
                detail = %decision.reason,
                "authorization denied"
            );
        }

        Ok(Verdict {
            principal: Some(principal),
            authorities,
            decision,
            trace,
        })
    }

    async fn fetch_authorities(
        &self,
        operation: &str,
        principal: &Principal,
    ) -> Result<Authorities, CallError> {
        let start = Instant::now();
        let lookup = self.authorities.authorities_of(&principal.id);
        let result = match self.store_timeout {
            Some(limit) => match tokio::time::timeout(limit, lookup).await {
                Ok(r) => r,
                Err(_) => Err(AuthorityStoreError::Timeout {
                    elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                }),
            },
            None => lookup.await,
        };

        result.map_err(|e| {
            tracing::error!(
                operation,
                principal = %principal.id,
                error = %e,
                "authority lookup failed"
            );
            CallError::from(e)
        })
    }
}

/// Layer enforcing a [`PolicyDescriptor`] before delegating to `inner`.
pub struct AuthorizationLayer {
    operation: String,
    policy: PolicyDescriptor,
    authorizer: Authorizer,
    inner: Arc<dyn Handler>,
}

impl AuthorizationLayer {
    pub fn new(
        operation: impl Into<String>,
        policy: PolicyDescriptor,
        authorizer: Authorizer,
        inner: Arc<dyn Handler>,
    ) -> Self {
        Self {
            operation: operation.into(),
            policy,
            authorizer,
            inner,
        }
    }
}

#[async_trait]
impl Handler for AuthorizationLayer {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, CallError> {
        let principal = self
            .authorizer
            .authorize(&self.operation, &self.policy, ctx)
            .await?;
        let ctx = ctx.clone().with_principal(principal);
        self.inner.call(&ctx, args).await
    }
}
