use crate::context::CallContext;
use crate::error::CallError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// A callable operation: business handlers and the layers wrapping them.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, CallError>;
}

/// Adapter turning an async closure into a [`Handler`].
///
/// Closure errors become [`CallError::Operation`] without modification.
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(CallContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(CallContext, Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, CallError> {
        (self.f)(ctx.clone(), args).await.map_err(CallError::Operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_result_passes_through() {
        let h = handler_fn(|_ctx, args| async move { Ok::<_, anyhow::Error>(args) });
        let out = h
            .call(&CallContext::new(), serde_json::json!({"id": 7}))
            .await
            .unwrap();
        assert_eq!(out["id"], 7);
    }

    #[tokio::test]
    async fn closure_error_becomes_operation_error() {
        let h = handler_fn(|_ctx, _args| async move { Err::<Value, _>(anyhow::anyhow!("boom")) });
        let err = h.call(&CallContext::new(), Value::Null).await.unwrap_err();
        assert!(matches!(err, CallError::Operation(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
