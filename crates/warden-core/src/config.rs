//! `warden.yaml` loading and validation.

use crate::audit::{
    AuditConfig, AuditLimits, AuditSink, FileAuditSink, NullAuditSink,
};
use crate::authority::{DirectoryError, DirectorySpec, InMemoryDirectory};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use warden_policy::PolicyDescriptor;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const ENV_CONFIG: &str = "WARDEN_CONFIG";
pub const ENV_AUDIT_LOG: &str = "WARDEN_AUDIT_LOG";
pub const DEFAULT_AUDIT_PATH: &str = "audit.ndjson";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid directory: {0}")]
    Directory(#[from] DirectoryError),
}

/// `null` must be quoted in YAML to name the null sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    File,
    #[default]
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditSettings {
    pub sink: SinkKind,
    pub path: Option<PathBuf>,
    pub max_params_len: usize,
    pub max_result_len: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        let limits = AuditLimits::default();
        Self {
            sink: SinkKind::Null,
            path: None,
            max_params_len: limits.max_params_len,
            max_result_len: limits.max_result_len,
        }
    }
}

impl AuditSettings {
    pub fn limits(&self) -> AuditLimits {
        AuditLimits {
            max_params_len: self.max_params_len,
            max_result_len: self.max_result_len,
        }
    }
}

/// How one named operation is guarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationSpec {
    pub policy: Option<PolicyDescriptor>,
    pub audit: Option<AuditConfig>,
    pub audit_denials: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub audit: AuditSettings,
    #[serde(default)]
    pub operations: BTreeMap<String, OperationSpec>,
    #[serde(default)]
    pub directory: Option<DirectorySpec>,
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            audit: AuditSettings::default(),
            operations: BTreeMap::new(),
            directory: None,
        }
    }
}

impl WardenConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(yaml)?;
        if cfg.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {} (supported: {})",
                cfg.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        Ok(cfg)
    }

    /// Applies `WARDEN_AUDIT_LOG` when set.
    pub fn apply_env(&mut self) {
        let audit_log = std::env::var_os(ENV_AUDIT_LOG)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.apply_overrides(audit_log);
    }

    /// An audit log path switches the sink to `file`.
    pub fn apply_overrides(&mut self, audit_log: Option<PathBuf>) {
        if let Some(path) = audit_log {
            tracing::debug!(path = %path.display(), "audit log path overridden");
            self.audit.sink = SinkKind::File;
            self.audit.path = Some(path);
        }
    }

    /// Returns warnings; hard errors are returned as `Err`.
    pub fn validate(&self) -> Result<Vec<String>, ConfigError> {
        if self.operations.keys().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid("blank operation name".to_string()));
        }

        let Some(spec) = &self.directory else {
            return Ok(Vec::new());
        };
        InMemoryDirectory::from_spec(spec)?;

        let roles: BTreeSet<&str> = spec.roles.iter().map(|r| r.code.as_str()).collect();
        let permissions: BTreeSet<&str> =
            spec.permissions.iter().map(|p| p.code.as_str()).collect();

        let mut warnings = Vec::new();
        for (name, op) in &self.operations {
            let Some(policy) = &op.policy else { continue };
            for code in policy.required_roles() {
                if !roles.contains(code.as_str()) {
                    warnings.push(format!(
                        "operation '{}' requires role '{}' which is not defined in the directory",
                        name, code
                    ));
                }
            }
            for code in policy.required_permissions() {
                if !permissions.contains(code.as_str()) {
                    warnings.push(format!(
                        "operation '{}' requires permission '{}' which is not defined in the directory",
                        name, code
                    ));
                }
            }
        }
        Ok(warnings)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }

    /// Path of the file sink, falling back to [`DEFAULT_AUDIT_PATH`].
    pub fn audit_path(&self) -> PathBuf {
        self.audit
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_PATH))
    }

    /// Checks that the configured sink could be opened, without creating
    /// anything on disk.
    pub fn check_sink(&self) -> Result<(), ConfigError> {
        if self.audit.sink != SinkKind::File {
            return Ok(());
        }
        let path = self.audit_path();
        if path.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "audit log path {} is a directory",
                path.display()
            )));
        }
        let existing = path
            .ancestors()
            .skip(1)
            .find(|a| a.as_os_str().is_empty() || a.exists());
        match existing {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
                Err(ConfigError::Invalid(format!(
                    "audit log directory {} is not a directory",
                    dir.display()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Opens the configured sink; the file sink creates its parent
    /// directories and the log file.
    pub fn build_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        let sink: Arc<dyn AuditSink> = match self.audit.sink {
            SinkKind::Null => Arc::new(NullAuditSink),
            SinkKind::File => {
                let path = self.audit_path();
                let sink = FileAuditSink::new(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                Arc::new(sink)
            }
        };
        Ok(sink)
    }

    /// Empty directory when none is configured.
    pub fn build_directory(&self) -> Result<InMemoryDirectory, ConfigError> {
        match &self.directory {
            Some(spec) => Ok(InMemoryDirectory::from_spec(spec)?),
            None => Ok(InMemoryDirectory::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::BusinessType;
    use serial_test::serial;

    const SAMPLE: &str = r#"
audit:
  sink: "null"
  max_params_len: 50
operations:
  deleteRole:
    policy:
      permissions: ["role:delete"]
    audit:
      title: Role management
      business_type: delete
      record_result: false
  auditedDelete:
    policy:
      roles: [admin, owner]
      require_all_roles: false
    audit: {}
    audit_denials: true
directory:
  roles:
    - { code: admin, name: Administrator }
    - { code: viewer }
  permissions:
    - { code: "role:delete", name: Delete role, kind: button }
  role_permissions:
    admin: ["role:delete"]
  users:
    p1: { name: Pat, roles: [viewer] }
"#;

    #[test]
    fn parses_sample() {
        let cfg = WardenConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(cfg.audit.sink, SinkKind::Null);
        assert_eq!(cfg.audit.limits().max_params_len, 50);
        assert_eq!(cfg.audit.limits().max_result_len, 1000);

        let op = cfg.operation("deleteRole").unwrap();
        let policy = op.policy.as_ref().unwrap();
        assert_eq!(policy.required_permissions(), ["role:delete"]);
        assert!(policy.require_all_permissions());
        let audit = op.audit.as_ref().unwrap();
        assert_eq!(audit.business_type, BusinessType::Delete);
        assert!(!audit.record_result);
        assert!(!op.audit_denials);

        let any = cfg.operation("auditedDelete").unwrap();
        assert!(!any.policy.as_ref().unwrap().require_all_roles());
        assert!(any.audit_denials);
    }

    #[test]
    fn unknown_policy_codes_are_warnings() {
        let cfg = WardenConfig::from_yaml_str(SAMPLE).unwrap();
        let warnings = cfg.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'owner'"));
    }

    #[test]
    fn unknown_role_reference_in_directory_is_error() {
        let yaml = r#"
directory:
  roles: [{ code: admin }]
  users:
    p1: { roles: [ghost] }
"#;
        let cfg = WardenConfig::from_yaml_str(yaml).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Directory(DirectoryError::UnknownRole { .. })
        ));
    }

    #[test]
    fn blank_policy_code_fails_parse() {
        let yaml = r#"
operations:
  x:
    policy: { roles: ["  "] }
"#;
        assert!(matches!(
            WardenConfig::from_yaml_str(yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn unsupported_version_rejected() {
        let err = WardenConfig::from_yaml_str("version: 9\n").unwrap_err();
        assert!(err.to_string().contains("unsupported config version 9"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = WardenConfig::from_file(Path::new("/nonexistent/warden.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/warden.yaml"));
    }

    #[test]
    #[serial]
    fn audit_log_env_switches_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.ndjson");
        std::env::set_var(ENV_AUDIT_LOG, &path);
        let mut cfg = WardenConfig::default();
        cfg.apply_env();
        std::env::remove_var(ENV_AUDIT_LOG);

        assert_eq!(cfg.audit.sink, SinkKind::File);
        assert_eq!(cfg.audit.path.as_deref(), Some(path.as_path()));
        cfg.build_sink().unwrap();
        assert!(path.exists());
    }

    #[test]
    #[serial]
    fn empty_env_value_is_ignored() {
        std::env::set_var(ENV_AUDIT_LOG, "");
        let mut cfg = WardenConfig::default();
        cfg.apply_env();
        std::env::remove_var(ENV_AUDIT_LOG);
        assert_eq!(cfg.audit.sink, SinkKind::Null);
    }

    #[test]
    fn check_sink_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.ndjson");
        let mut cfg = WardenConfig::default();
        cfg.apply_overrides(Some(path.clone()));

        cfg.check_sink().unwrap();
        assert!(!path.exists());
        assert!(!dir.path().join("logs").exists());
    }

    #[test]
    fn check_sink_rejects_unusable_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = WardenConfig::default();
        cfg.apply_overrides(Some(dir.path().to_path_buf()));
        assert!(matches!(cfg.check_sink(), Err(ConfigError::Invalid(_))));

        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        cfg.apply_overrides(Some(file.join("audit.ndjson")));
        let err = cfg.check_sink().unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn memory_sink_kind_is_not_configurable() {
        let err = WardenConfig::from_yaml_str("audit:\n  sink: memory\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn directory_built_from_config() {
        let cfg = WardenConfig::from_yaml_str(SAMPLE).unwrap();
        let dir = cfg.build_directory().unwrap();
        let p1 = dir.effective("p1").unwrap();
        assert!(p1.has_role("viewer"));
        assert!(p1.permissions.is_empty());
    }
}
