//! Operation audit logging.
//!
//! Every call that reaches an [`AuditLayer`] produces exactly one
//! [`AuditRecord`], persisted after the wrapped operation has finished and
//! before the layer returns. Sink failures are logged and discarded; the
//! operation's own result or error is returned unchanged. A call abandoned
//! mid-flight still yields its record, written in the background with
//! [`CANCELLED_MESSAGE`].

pub mod client_ip;
mod config;
mod layer;
pub mod payload;
mod record;
mod sink;

pub use config::{AuditConfig, AuditLimits, BusinessType, DEFAULT_EXCLUDED_PARAMS};
pub use layer::{AuditLayer, CANCELLED_MESSAGE};
pub use record::{AuditRecord, AuditStatus};
pub use sink::{AuditSink, AuditSinkError, FileAuditSink, MemoryAuditSink, NullAuditSink};
