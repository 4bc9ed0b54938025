//! Authorization and audit interceptors for guarded operations.
//!
//! Guarded operations are composed explicitly at registration time; nothing
//! is discovered by reflection and no ambient security context exists. The
//! caller's [`CallContext`] travels down the chain and the authorization layer
//! attaches the resolved [`Principal`] to it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      OperationRegistry                          │
//! │  ┌────────────────────┐  ┌─────────────────┐  ┌──────────────┐  │
//! │  │ AuthorizationLayer │─▶│   AuditLayer    │─▶│   Handler    │  │
//! │  └─────────┬──────────┘  └────────┬────────┘  └──────────────┘  │
//! │            │                      │                             │
//! │   ┌────────▼─────────┐    ┌───────▼───────┐                     │
//! │   │ IdentityResolver │    │   AuditSink   │                     │
//! │   │  AuthorityStore  │    │ (file / null) │                     │
//! │   └──────────────────┘    └───────────────┘                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod authority;
pub mod authz;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod handler;
pub mod identity;
pub mod registry;

pub use audit::{
    AuditConfig, AuditLayer, AuditLimits, AuditRecord, AuditSink, AuditSinkError, AuditStatus,
    BusinessType, FileAuditSink, MemoryAuditSink, NullAuditSink,
};
pub use authority::{AuthorityStore, AuthorityStoreError, InMemoryDirectory};
pub use authz::{AuthorizationLayer, Authorizer, Verdict};
pub use config::{ConfigError, WardenConfig};
pub use context::{CallContext, Principal, ANONYMOUS_ID};
pub use error::CallError;
pub use guard::{GuardBuilder, Warden};
pub use handler::{handler_fn, FnHandler, Handler};
pub use identity::{ContextIdentityResolver, IdentityError, IdentityResolver};
pub use registry::OperationRegistry;

pub use warden_policy::{
    AuthorizationError, Authorities, Decision, DecisionReason, PolicyDescriptor,
};
