//! Static per-operation authorization requirements.
//!
//! ```yaml
//! roles: [admin, auditor]
//! require_all_roles: false      # ANY
//! permissions: ["role:delete"]
//! require_all_permissions: true # ALL (default)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("blank {dimension} code in policy descriptor")]
    BlankCode { dimension: &'static str },

    #[error("invalid policy descriptor: {0}")]
    Parse(String),
}

/// Required roles and permissions for one guarded operation.
///
/// Codes keep their declaration order (it decides which code an ALL check
/// reports first); duplicates are collapsed to the first occurrence. An
/// empty dimension imposes no constraint regardless of its combinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct PolicyDescriptor {
    #[serde(rename = "roles")]
    required_roles: Vec<String>,
    #[serde(rename = "permissions")]
    required_permissions: Vec<String>,
    require_all_roles: bool,
    require_all_permissions: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default = "default_true")]
    require_all_roles: bool,
    #[serde(default = "default_true")]
    require_all_permissions: bool,
}

fn default_true() -> bool {
    true
}

impl TryFrom<RawDescriptor> for PolicyDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        PolicyDescriptorBuilder {
            roles: raw.roles,
            permissions: raw.permissions,
            require_all_roles: raw.require_all_roles,
            require_all_permissions: raw.require_all_permissions,
        }
        .build()
    }
}

impl Default for PolicyDescriptor {
    /// Both dimensions empty: allows any authenticated caller.
    fn default() -> Self {
        Self {
            required_roles: Vec::new(),
            required_permissions: Vec::new(),
            require_all_roles: true,
            require_all_permissions: true,
        }
    }
}

impl PolicyDescriptor {
    pub fn builder() -> PolicyDescriptorBuilder {
        PolicyDescriptorBuilder::default()
    }

    /// Policy requiring only authentication.
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Parse a descriptor from a YAML mapping.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DescriptorError> {
        serde_yaml::from_str(yaml).map_err(|e| DescriptorError::Parse(e.to_string()))
    }

    pub fn required_roles(&self) -> &[String] {
        &self.required_roles
    }

    pub fn required_permissions(&self) -> &[String] {
        &self.required_permissions
    }

    pub fn require_all_roles(&self) -> bool {
        self.require_all_roles
    }

    pub fn require_all_permissions(&self) -> bool {
        self.require_all_permissions
    }

    /// True when neither dimension constrains the caller.
    pub fn is_unrestricted(&self) -> bool {
        self.required_roles.is_empty() && self.required_permissions.is_empty()
    }
}

/// Builder for [`PolicyDescriptor`]. Both combinators default to ALL.
#[derive(Debug, Clone)]
pub struct PolicyDescriptorBuilder {
    roles: Vec<String>,
    permissions: Vec<String>,
    require_all_roles: bool,
    require_all_permissions: bool,
}

impl Default for PolicyDescriptorBuilder {
    fn default() -> Self {
        Self {
            roles: Vec::new(),
            permissions: Vec::new(),
            require_all_roles: true,
            require_all_permissions: true,
        }
    }
}

impl PolicyDescriptorBuilder {
    /// Require every listed role.
    pub fn all_roles<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.roles.extend(codes.into_iter().map(Into::into));
        self.require_all_roles = true;
        self
    }

    /// Require at least one of the listed roles.
    pub fn any_role<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.roles.extend(codes.into_iter().map(Into::into));
        self.require_all_roles = false;
        self
    }

    /// Require every listed permission.
    pub fn all_permissions<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.permissions.extend(codes.into_iter().map(Into::into));
        self.require_all_permissions = true;
        self
    }

    /// Require at least one of the listed permissions.
    pub fn any_permission<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.permissions.extend(codes.into_iter().map(Into::into));
        self.require_all_permissions = false;
        self
    }

    pub fn build(self) -> Result<PolicyDescriptor, DescriptorError> {
        Ok(PolicyDescriptor {
            required_roles: normalize_codes(self.roles, "role")?,
            required_permissions: normalize_codes(self.permissions, "permission")?,
            require_all_roles: self.require_all_roles,
            require_all_permissions: self.require_all_permissions,
        })
    }
}

// A blank code would silently make its dimension vacuous, so it is rejected.
fn normalize_codes(
    codes: Vec<String>,
    dimension: &'static str,
) -> Result<Vec<String>, DescriptorError> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let code = code.trim();
        if code.is_empty() {
            return Err(DescriptorError::BlankCode { dimension });
        }
        if !out.iter().any(|c| c == code) {
            out.push(code.to_string());
        }
    }
    Ok(out)
}
