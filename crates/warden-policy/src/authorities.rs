use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Effective role and permission codes granted to one principal.
///
/// Produced fresh for every call; never cached across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorities {
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl Authorities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_codes<R, P>(roles: R, permissions: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_role(mut self, code: impl Into<String>) -> Self {
        self.roles.insert(code.into());
        self
    }

    pub fn with_permission(mut self, code: impl Into<String>) -> Self {
        self.permissions.insert(code.into());
        self
    }

    pub fn has_role(&self, code: &str) -> bool {
        self.roles.contains(code)
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }
}
