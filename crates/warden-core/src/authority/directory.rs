//! In-memory user → role → permission directory.
//!
//! Effective roles are the granted roles that exist and are enabled.
//! Effective permissions are the union of the permissions of the effective
//! roles, filtered to permissions that exist and are enabled.

use super::{AuthorityStore, AuthorityStoreError};
use crate::context::Principal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockWriteGuard};
use thiserror::Error;
use warden_policy::Authorities;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("blank {kind} code in directory")]
    BlankCode { kind: &'static str },

    #[error("role '{role}' referenced by {referenced_by} is not defined")]
    UnknownRole { role: String, referenced_by: String },

    #[error("permission '{permission}' granted to role '{role}' is not defined")]
    UnknownPermission { permission: String, role: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Role {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// UI grouping tag; never consulted by authorization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Menu,
    #[default]
    Button,
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: PermissionKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Permission {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
            kind: PermissionKind::default(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Serializable directory content (the `directory:` section of the config).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectorySpec {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub role_permissions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub users: BTreeMap<String, UserSpec>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    roles: BTreeMap<String, Role>,
    permissions: BTreeMap<String, Permission>,
    role_permissions: BTreeMap<String, BTreeSet<String>>,
    users: BTreeMap<String, UserEntry>,
}

#[derive(Debug, Default)]
struct UserEntry {
    name: Option<String>,
    roles: BTreeSet<String>,
}

impl DirectoryState {
    fn effective(&self, principal_id: &str) -> Authorities {
        let Some(user) = self.users.get(principal_id) else {
            return Authorities::default();
        };

        let roles: BTreeSet<String> = user
            .roles
            .iter()
            .filter(|code| self.roles.get(*code).is_some_and(|r| r.enabled))
            .cloned()
            .collect();

        let permissions = roles
            .iter()
            .filter_map(|role| self.role_permissions.get(role))
            .flatten()
            .filter(|code| self.permissions.get(*code).is_some_and(|p| p.enabled))
            .cloned()
            .collect();

        Authorities { roles, permissions }
    }
}

/// Thread-safe directory that can be mutated while calls are in flight.
///
/// Every lookup reads the current grants.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory, rejecting grants that reference undefined codes.
    pub fn from_spec(spec: &DirectorySpec) -> Result<Self, DirectoryError> {
        let mut state = DirectoryState::default();

        for role in &spec.roles {
            if role.code.trim().is_empty() {
                return Err(DirectoryError::BlankCode { kind: "role" });
            }
            state.roles.insert(role.code.clone(), role.clone());
        }
        for perm in &spec.permissions {
            if perm.code.trim().is_empty() {
                return Err(DirectoryError::BlankCode { kind: "permission" });
            }
            state.permissions.insert(perm.code.clone(), perm.clone());
        }
        for (role, perms) in &spec.role_permissions {
            if !state.roles.contains_key(role) {
                return Err(DirectoryError::UnknownRole {
                    role: role.clone(),
                    referenced_by: "role_permissions".to_string(),
                });
            }
            for perm in perms {
                if !state.permissions.contains_key(perm) {
                    return Err(DirectoryError::UnknownPermission {
                        permission: perm.clone(),
                        role: role.clone(),
                    });
                }
            }
            state
                .role_permissions
                .insert(role.clone(), perms.iter().cloned().collect());
        }
        for (id, user) in &spec.users {
            for role in &user.roles {
                if !state.roles.contains_key(role) {
                    return Err(DirectoryError::UnknownRole {
                        role: role.clone(),
                        referenced_by: format!("user '{}'", id),
                    });
                }
            }
            state.users.insert(
                id.clone(),
                UserEntry {
                    name: user.name.clone(),
                    roles: user.roles.iter().cloned().collect(),
                },
            );
        }

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    // Mutations keep working after a panicked writer; the maps stay consistent
    // because every write is a single insert or remove.
    fn write(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn upsert_role(&self, role: Role) {
        self.write().roles.insert(role.code.clone(), role);
    }

    pub fn upsert_permission(&self, permission: Permission) {
        self.write()
            .permissions
            .insert(permission.code.clone(), permission);
    }

    pub fn add_user(&self, id: impl Into<String>, name: Option<String>) {
        let mut state = self.write();
        let entry = state.users.entry(id.into()).or_default();
        entry.name = name;
    }

    pub fn grant_role(&self, user_id: &str, role: &str) {
        self.write()
            .users
            .entry(user_id.to_string())
            .or_default()
            .roles
            .insert(role.to_string());
    }

    pub fn revoke_role(&self, user_id: &str, role: &str) -> bool {
        self.write()
            .users
            .get_mut(user_id)
            .is_some_and(|u| u.roles.remove(role))
    }

    pub fn grant_permission(&self, role: &str, permission: &str) {
        self.write()
            .role_permissions
            .entry(role.to_string())
            .or_default()
            .insert(permission.to_string());
    }

    pub fn revoke_permission(&self, role: &str, permission: &str) -> bool {
        self.write()
            .role_permissions
            .get_mut(role)
            .is_some_and(|p| p.remove(permission))
    }

    /// Returns false when the role is not defined.
    pub fn set_role_enabled(&self, code: &str, enabled: bool) -> bool {
        match self.write().roles.get_mut(code) {
            Some(role) => {
                role.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Returns false when the permission is not defined.
    pub fn set_permission_enabled(&self, code: &str, enabled: bool) -> bool {
        match self.write().permissions.get_mut(code) {
            Some(perm) => {
                perm.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// The principal known under `id`, with its display name.
    pub fn principal(&self, id: &str) -> Option<Principal> {
        let state = self.state.read().ok()?;
        state.users.get(id).map(|u| Principal {
            id: id.to_string(),
            name: u.name.clone(),
        })
    }

    pub fn effective(&self, principal_id: &str) -> Result<Authorities, AuthorityStoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| AuthorityStoreError::Unavailable {
                message: "directory lock poisoned".to_string(),
            })?;
        Ok(state.effective(principal_id))
    }
}

#[async_trait]
impl AuthorityStore for InMemoryDirectory {
    async fn authorities_of(&self, principal_id: &str) -> Result<Authorities, AuthorityStoreError> {
        self.effective(principal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryDirectory {
        let spec: DirectorySpec = serde_yaml::from_str(
            r#"
roles:
  - { code: admin, name: Administrator }
  - { code: viewer }
  - { code: retired, enabled: false }
permissions:
  - { code: "role:view", kind: menu }
  - { code: "role:delete" }
  - { code: "role:export", enabled: false }
role_permissions:
  admin: ["role:view", "role:delete", "role:export"]
  viewer: ["role:view"]
  retired: ["role:delete"]
users:
  p1: { name: Pat, roles: [viewer, retired] }
  root: { roles: [admin] }
"#,
        )
        .unwrap();
        InMemoryDirectory::from_spec(&spec).unwrap()
    }

    #[test]
    fn effective_sets_filter_disabled_entries() {
        let dir = sample();
        let p1 = dir.effective("p1").unwrap();
        assert_eq!(p1.roles, BTreeSet::from(["viewer".to_string()]));
        assert_eq!(p1.permissions, BTreeSet::from(["role:view".to_string()]));

        let root = dir.effective("root").unwrap();
        assert!(root.has_permission("role:delete"));
        assert!(!root.has_permission("role:export"));
    }

    #[test]
    fn unknown_principal_has_no_authorities() {
        assert!(sample().effective("nobody").unwrap().is_empty());
    }

    #[test]
    fn grants_changes_are_visible_immediately() {
        let dir = sample();
        assert!(!dir.effective("p1").unwrap().has_permission("role:delete"));

        dir.grant_permission("viewer", "role:delete");
        assert!(dir.effective("p1").unwrap().has_permission("role:delete"));

        assert!(dir.set_permission_enabled("role:delete", false));
        assert!(!dir.effective("p1").unwrap().has_permission("role:delete"));

        assert!(dir.revoke_role("p1", "viewer"));
        assert!(dir.effective("p1").unwrap().roles.is_empty());
    }

    #[test]
    fn directory_built_incrementally_resolves_grants() {
        let dir = InMemoryDirectory::new();
        dir.upsert_role(Role::new("editor"));
        dir.upsert_permission(Permission::new("doc:write"));
        dir.add_user("u1", Some("Una".to_string()));
        dir.grant_role("u1", "editor");
        dir.grant_permission("editor", "doc:write");

        assert_eq!(
            dir.principal("u1"),
            Some(Principal {
                id: "u1".to_string(),
                name: Some("Una".to_string())
            })
        );
        let u1 = dir.effective("u1").unwrap();
        assert!(u1.has_role("editor"));
        assert!(u1.has_permission("doc:write"));

        assert!(dir.revoke_permission("editor", "doc:write"));
        assert!(!dir.revoke_permission("editor", "doc:write"));
        assert!(!dir.effective("u1").unwrap().has_permission("doc:write"));
        assert!(dir.effective("u1").unwrap().has_role("editor"));
    }

    #[test]
    fn upsert_replaces_existing_definition() {
        let dir = sample();
        assert!(dir.effective("root").unwrap().has_permission("role:delete"));

        dir.upsert_permission(Permission::new("role:delete").disabled());
        assert!(!dir.effective("root").unwrap().has_permission("role:delete"));

        dir.upsert_role(Role::new("admin").disabled());
        assert!(dir.effective("root").unwrap().is_empty());
        assert!(!dir.set_permission_enabled("ghost", true));
    }

    #[test]
    fn add_user_keeps_existing_roles() {
        let dir = sample();
        dir.add_user("p1", Some("Patricia".to_string()));
        assert_eq!(
            dir.principal("p1").and_then(|p| p.name).as_deref(),
            Some("Patricia")
        );
        assert!(dir.effective("p1").unwrap().has_role("viewer"));
    }

    #[test]
    fn re_enabling_a_role_restores_its_permissions() {
        let dir = sample();
        assert!(dir.set_role_enabled("retired", true));
        let p1 = dir.effective("p1").unwrap();
        assert!(p1.has_role("retired"));
        assert!(p1.has_permission("role:delete"));
        assert!(!dir.set_role_enabled("ghost", true));
    }

    #[test]
    fn spec_rejects_unknown_role_reference() {
        let spec = DirectorySpec {
            users: BTreeMap::from([(
                "p1".to_string(),
                UserSpec {
                    name: None,
                    roles: vec!["ghost".to_string()],
                },
            )]),
            ..Default::default()
        };
        let err = InMemoryDirectory::from_spec(&spec).unwrap_err();
        assert_eq!(
            err,
            DirectoryError::UnknownRole {
                role: "ghost".to_string(),
                referenced_by: "user 'p1'".to_string()
            }
        );
    }

    #[test]
    fn spec_rejects_unknown_permission_grant() {
        let spec = DirectorySpec {
            roles: vec![Role::new("admin")],
            role_permissions: BTreeMap::from([(
                "admin".to_string(),
                vec!["menu:ghost".to_string()],
            )]),
            ..Default::default()
        };
        assert!(matches!(
            InMemoryDirectory::from_spec(&spec),
            Err(DirectoryError::UnknownPermission { .. })
        ));
    }

    #[test]
    fn principal_lookup_carries_display_name() {
        let dir = sample();
        let p = dir.principal("p1").unwrap();
        assert_eq!(p.name.as_deref(), Some("Pat"));
        assert!(dir.principal("nobody").is_none());
    }

    #[tokio::test]
    async fn store_trait_reads_current_grants() {
        let dir = sample();
        let a = dir.authorities_of("root").await.unwrap();
        assert!(a.has_role("admin"));
    }
}
