//! Lookup of the roles and permissions granted to a principal.

mod directory;

pub use directory::{
    DirectoryError, DirectorySpec, InMemoryDirectory, Permission, PermissionKind, Role, UserSpec,
};

use async_trait::async_trait;
use thiserror::Error;
use warden_policy::Authorities;

/// Infrastructure failures of an [`AuthorityStore`].
///
/// These always abort the call; they are never read as "no authorities".
#[derive(Debug, Error)]
pub enum AuthorityStoreError {
    #[error("authority store unavailable: {message}")]
    Unavailable { message: String },

    #[error("authority lookup timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Source of a principal's effective role and permission codes.
///
/// Implementations must return the current grants on every call. A principal
/// with no grants yields empty [`Authorities`], not an error.
#[async_trait]
pub trait AuthorityStore: Send + Sync {
    async fn authorities_of(&self, principal_id: &str) -> Result<Authorities, AuthorityStoreError>;
}
