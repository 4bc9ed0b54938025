//! Explicit composition of guarded operations.
//!
//! ```ignore
//! let delete_role = warden
//!     .guard("deleteRole", handler)
//!     .policy(PolicyDescriptor::builder().all_permissions(["role:delete"]).build()?)
//!     .audit(AuditConfig::titled("Roles", BusinessType::Delete))
//!     .build();
//! ```
//!
//! The default chain is `Authorization -> Audit -> handler`, so denied calls
//! produce no audit record. With [`GuardBuilder::audit_denials`] the audit
//! layer moves outermost and denials are recorded as failures.

use crate::audit::{AuditConfig, AuditLayer, AuditLimits, AuditSink};
use crate::authority::AuthorityStore;
use crate::authz::{AuthorizationLayer, Authorizer};
use crate::handler::Handler;
use crate::identity::IdentityResolver;
use std::sync::Arc;
use std::time::Duration;
use warden_policy::PolicyDescriptor;

/// Shared collaborators for every guard built from it.
#[derive(Clone)]
pub struct Warden {
    authorizer: Authorizer,
    identity: Arc<dyn IdentityResolver>,
    sink: Arc<dyn AuditSink>,
    limits: AuditLimits,
}

impl Warden {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        authorities: Arc<dyn AuthorityStore>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            authorizer: Authorizer::new(identity.clone(), authorities),
            identity,
            sink,
            limits: AuditLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: AuditLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.authorizer = self.authorizer.with_store_timeout(timeout);
        self
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    pub fn sink(&self) -> &Arc<dyn AuditSink> {
        &self.sink
    }

    pub fn guard(&self, operation: impl Into<String>, handler: Arc<dyn Handler>) -> GuardBuilder<'_> {
        GuardBuilder {
            warden: self,
            operation: operation.into(),
            handler,
            policy: None,
            audit: None,
            audit_denials: false,
        }
    }
}

pub struct GuardBuilder<'w> {
    warden: &'w Warden,
    operation: String,
    handler: Arc<dyn Handler>,
    policy: Option<PolicyDescriptor>,
    audit: Option<AuditConfig>,
    audit_denials: bool,
}

impl GuardBuilder<'_> {
    pub fn policy(mut self, policy: PolicyDescriptor) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn audit(mut self, config: AuditConfig) -> Self {
        self.audit = Some(config);
        self
    }

    /// Record authorization denials in the audit log.
    pub fn audit_denials(mut self, on: bool) -> Self {
        self.audit_denials = on;
        self
    }

    pub fn build(self) -> Arc<dyn Handler> {
        let GuardBuilder {
            warden,
            operation,
            handler,
            policy,
            audit,
            audit_denials,
        } = self;

        let with_audit = |inner: Arc<dyn Handler>, config: AuditConfig| -> Arc<dyn Handler> {
            Arc::new(
                AuditLayer::new(
                    operation.clone(),
                    config,
                    warden.identity.clone(),
                    warden.sink.clone(),
                    inner,
                )
                .with_limits(warden.limits),
            )
        };
        let with_authz = |inner: Arc<dyn Handler>, policy: PolicyDescriptor| -> Arc<dyn Handler> {
            Arc::new(AuthorizationLayer::new(
                operation.clone(),
                policy,
                warden.authorizer.clone(),
                inner,
            ))
        };

        match (policy, audit) {
            (None, None) => handler,
            (Some(p), None) => with_authz(handler, p),
            (None, Some(a)) => with_audit(handler, a),
            (Some(p), Some(a)) if audit_denials => with_audit(with_authz(handler, p), a),
            (Some(p), Some(a)) => with_authz(with_audit(handler, a), p),
        }
    }
}
