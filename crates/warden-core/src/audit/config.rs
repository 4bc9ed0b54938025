use serde::{Deserialize, Serialize};

/// Argument keys masked in audited parameters unless configured otherwise.
pub const DEFAULT_EXCLUDED_PARAMS: &[&str] =
    &["password", "oldPassword", "newPassword", "confirmPassword"];

/// Cosmetic classification of an audited operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    #[default]
    Other,
    Insert,
    Update,
    Delete,
    Grant,
    Export,
    Import,
    Clean,
}

/// Per-operation audit settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Module or screen title shown in the operation log.
    pub title: Option<String>,
    pub business_type: BusinessType,
    /// Record the call arguments.
    pub record_params: bool,
    /// Record the successful return value.
    pub record_result: bool,
    /// Argument keys (any depth, case-insensitive) whose values are masked.
    pub exclude_params: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            title: None,
            business_type: BusinessType::Other,
            record_params: true,
            record_result: true,
            exclude_params: DEFAULT_EXCLUDED_PARAMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl AuditConfig {
    pub fn titled(title: impl Into<String>, business_type: BusinessType) -> Self {
        Self {
            title: Some(title.into()),
            business_type,
            ..Self::default()
        }
    }

    pub fn record_params(mut self, on: bool) -> Self {
        self.record_params = on;
        self
    }

    pub fn record_result(mut self, on: bool) -> Self {
        self.record_result = on;
        self
    }
}

/// Maximum stored length, in characters, of serialized payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditLimits {
    pub max_params_len: usize,
    pub max_result_len: usize,
}

impl Default for AuditLimits {
    fn default() -> Self {
        Self {
            max_params_len: 2000,
            max_result_len: 1000,
        }
    }
}
