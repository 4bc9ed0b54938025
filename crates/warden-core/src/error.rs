use crate::authority::AuthorityStoreError;
use thiserror::Error;
use warden_policy::AuthorizationError;

/// Error returned by a guarded operation.
///
/// Authorization failures are expected policy outcomes (401/403) and are
/// distinguishable from infrastructure errors and from the operation's own
/// failure, which is carried through unchanged.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("{0}")]
    Unauthorized(#[from] AuthorizationError),

    #[error("{0}")]
    AuthorityStoreUnavailable(#[source] AuthorityStoreError),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error(transparent)]
    Operation(#[from] anyhow::Error),
}

impl CallError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(e) => e.status_code(),
            Self::UnknownOperation(_) => 404,
            Self::AuthorityStoreUnavailable(_) | Self::Operation(_) => 500,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthorized(e) if e.is_unauthenticated())
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Unauthorized(e) if e.is_forbidden())
    }

    pub fn authorization_error(&self) -> Option<&AuthorizationError> {
        match self {
            Self::Unauthorized(e) => Some(e),
            _ => None,
        }
    }

    /// The wrapped operation's own error, if that is what this is.
    pub fn operation_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AuthorityStoreError> for CallError {
    fn from(e: AuthorityStoreError) -> Self {
        Self::AuthorityStoreUnavailable(e)
    }
}
