//! Authorization decisions and the typed denial error.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable, machine-parseable reason codes.
pub mod reason_codes {
    pub const OK: &str = "OK";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const MISSING_ROLE: &str = "MISSING_ROLE";
    pub const MISSING_PERMISSION: &str = "MISSING_PERMISSION";
}

/// Why a decision came out the way it did.
///
/// `MissingRole(None)` / `MissingPermission(None)` are produced under ANY
/// semantics, where no single code is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    Ok,
    Unauthenticated,
    MissingRole(Option<String>),
    MissingPermission(Option<String>),
}

impl DecisionReason {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Ok => reason_codes::OK,
            Self::Unauthenticated => reason_codes::UNAUTHENTICATED,
            Self::MissingRole(_) => reason_codes::MISSING_ROLE,
            Self::MissingPermission(_) => reason_codes::MISSING_PERMISSION,
        }
    }

    /// The specific missing code, when one is determinable.
    pub fn missing_code(&self) -> Option<&str> {
        match self {
            Self::MissingRole(code) | Self::MissingPermission(code) => code.as_deref(),
            Self::Ok | Self::Unauthenticated => None,
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "authorized"),
            Self::Unauthenticated => write!(f, "authentication required"),
            Self::MissingRole(Some(code)) => write!(f, "missing required role '{}'", code),
            Self::MissingRole(None) => write!(f, "no required role matched"),
            Self::MissingPermission(Some(code)) => {
                write!(f, "missing required permission '{}'", code)
            }
            Self::MissingPermission(None) => write!(f, "no required permission matched"),
        }
    }
}

/// Outcome of one policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::Ok,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Converts a denial into an [`AuthorizationError`].
    pub fn into_result(self) -> Result<(), AuthorizationError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AuthorizationError {
                reason: self.reason,
            })
        }
    }
}

/// Raised to the caller of a guarded operation when the policy denies it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct AuthorizationError {
    pub reason: DecisionReason,
}

impl AuthorizationError {
    pub fn unauthenticated() -> Self {
        Self {
            reason: DecisionReason::Unauthenticated,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self.reason, DecisionReason::Unauthenticated)
    }

    pub fn is_forbidden(&self) -> bool {
        !self.is_unauthenticated()
    }

    /// 401 for a missing principal, 403 for insufficient authority.
    pub fn status_code(&self) -> u16 {
        if self.is_unauthenticated() {
            401
        } else {
            403
        }
    }

    pub fn missing_code(&self) -> Option<&str> {
        self.reason.missing_code()
    }
}
