use crate::context::{CallContext, Principal};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("session lookup failed: {message}")]
    Session { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Resolves the authenticated principal of a call.
///
/// `Ok(None)` and a principal carrying the anonymous sentinel both mean
/// "not authenticated".
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, ctx: &CallContext) -> Result<Option<Principal>, IdentityError>;
}

/// Uses the principal the front end already attached to the context.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextIdentityResolver;

impl IdentityResolver for ContextIdentityResolver {
    fn resolve(&self, ctx: &CallContext) -> Result<Option<Principal>, IdentityError> {
        Ok(ctx.principal().filter(|p| !p.is_anonymous()).cloned())
    }
}

/// Normalizes a resolver result: anonymous principals become `None`.
pub(crate) fn authenticated(
    resolved: Result<Option<Principal>, IdentityError>,
) -> Result<Option<Principal>, IdentityError> {
    resolved.map(|p| p.filter(|p| !p.is_anonymous()))
}
