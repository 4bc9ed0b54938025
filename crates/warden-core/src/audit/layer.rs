use super::client_ip::client_ip;
use super::config::{AuditConfig, AuditLimits};
use super::payload::{mask_params, render};
use super::record::AuditRecord;
use super::sink::AuditSink;
use crate::context::{CallContext, Principal};
use crate::error::CallError;
use crate::handler::Handler;
use crate::identity::{authenticated, IdentityResolver};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Error message of records whose call was dropped before it finished.
pub const CANCELLED_MESSAGE: &str = "operation cancelled";

/// Layer writing exactly one [`AuditRecord`] per call to `inner`.
pub struct AuditLayer {
    operation: String,
    config: AuditConfig,
    limits: AuditLimits,
    identity: Arc<dyn IdentityResolver>,
    sink: Arc<dyn AuditSink>,
    inner: Arc<dyn Handler>,
}

impl AuditLayer {
    pub fn new(
        operation: impl Into<String>,
        config: AuditConfig,
        identity: Arc<dyn IdentityResolver>,
        sink: Arc<dyn AuditSink>,
        inner: Arc<dyn Handler>,
    ) -> Self {
        Self {
            operation: operation.into(),
            config,
            limits: AuditLimits::default(),
            identity,
            sink,
            inner,
        }
    }

    pub fn with_limits(mut self, limits: AuditLimits) -> Self {
        self.limits = limits;
        self
    }

    fn open_record(&self, ctx: &CallContext, args: &Value) -> AuditRecord {
        let mut record = AuditRecord::new(&self.operation);
        record.title = self.config.title.clone();
        record.business_type = self.config.business_type;

        if let Some(p) = self.principal_of(ctx) {
            record.principal_id = Some(p.id);
            record.principal_name = p.name;
        }
        record.method = ctx.method().map(str::to_string);
        record.ip = client_ip(ctx);

        if self.config.record_params {
            let masked = mask_params(args, &self.config.exclude_params);
            record.params = render(&self.operation, "params", &masked, self.limits.max_params_len);
        }
        record
    }

    fn principal_of(&self, ctx: &CallContext) -> Option<Principal> {
        if let Some(p) = ctx.principal().filter(|p| !p.is_anonymous()) {
            return Some(p.clone());
        }
        let resolved = match panic::catch_unwind(AssertUnwindSafe(|| self.identity.resolve(ctx))) {
            Ok(resolved) => resolved,
            Err(payload) => {
                tracing::warn!(
                    operation = %self.operation,
                    panic = %panic_message(payload.as_ref()),
                    "identity resolver panicked; recording without principal"
                );
                return None;
            }
        };
        match authenticated(resolved) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    operation = %self.operation,
                    error = %e,
                    "identity unavailable for audit record"
                );
                None
            }
        }
    }
}

#[async_trait]
impl Handler for AuditLayer {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, CallError> {
        let mut pending = PendingRecord::new(self.open_record(ctx, &args), self.sink.clone());

        let outcome = AssertUnwindSafe(self.inner.call(ctx, args))
            .catch_unwind()
            .await;

        pending.complete(|record| match &outcome {
            Ok(Ok(value)) => {
                let result = if self.config.record_result {
                    render(&self.operation, "result", value, self.limits.max_result_len)
                } else {
                    None
                };
                record.succeed(result)
            }
            Ok(Err(e)) => record.fail(e.to_string()),
            Err(payload) => record.fail(format!(
                "operation panicked: {}",
                panic_message(payload.as_ref())
            )),
        });

        if let Some(record) = pending.record() {
            persist(self.sink.as_ref(), record).await;
        }
        pending.disarm();

        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

/// Holds the record of an in-flight call.
///
/// Dropped while still armed (the caller abandoned the call future), it
/// persists the record on the current runtime: as a cancellation failure when
/// the operation had not finished, or as-is when only the write was cut short.
struct PendingRecord {
    record: Option<AuditRecord>,
    finished: bool,
    start: Instant,
    sink: Arc<dyn AuditSink>,
}

impl PendingRecord {
    fn new(record: AuditRecord, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            record: Some(record),
            finished: false,
            start: Instant::now(),
            sink,
        }
    }

    fn complete(&mut self, outcome: impl FnOnce(AuditRecord) -> AuditRecord) {
        if let Some(record) = self.record.take() {
            self.record = Some(outcome(record).finish(elapsed_ms(self.start)));
            self.finished = true;
        }
    }

    fn record(&self) -> Option<&AuditRecord> {
        self.record.as_ref()
    }

    fn disarm(&mut self) {
        self.record = None;
    }
}

impl Drop for PendingRecord {
    fn drop(&mut self) {
        let Some(record) = self.record.take() else {
            return;
        };
        let record = if self.finished {
            record
        } else {
            record
                .fail(CANCELLED_MESSAGE)
                .finish(elapsed_ms(self.start))
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    operation = %record.operation,
                    audit_id = %record.id,
                    "call dropped before completion; persisting audit record in background"
                );
                let sink = self.sink.clone();
                handle.spawn(async move {
                    persist(sink.as_ref(), &record).await;
                });
            }
            Err(_) => {
                tracing::error!(
                    operation = %record.operation,
                    audit_id = %record.id,
                    "call dropped outside a runtime; audit record lost"
                );
            }
        }
    }
}

async fn persist(sink: &dyn AuditSink, record: &AuditRecord) {
    match AssertUnwindSafe(sink.persist(record)).catch_unwind().await {
        Ok(Ok(())) => {
            tracing::debug!(
                operation = %record.operation,
                audit_id = %record.id,
                status = ?record.status,
                "audit record persisted"
            );
        }
        Ok(Err(e)) => {
            tracing::error!(
                operation = %record.operation,
                audit_id = %record.id,
                error = %e,
                "audit sink failed; record dropped"
            );
        }
        Err(payload) => {
            tracing::error!(
                operation = %record.operation,
                audit_id = %record.id,
                panic = %panic_message(payload.as_ref()),
                "audit sink panicked; record dropped"
            );
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
