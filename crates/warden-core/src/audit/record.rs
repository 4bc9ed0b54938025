use super::config::BusinessType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failure,
}

/// One operation-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID
    pub id: String,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub business_type: BusinessType,
    /// Populated only for authenticated callers
    pub principal_id: Option<String>,
    pub principal_name: Option<String>,
    pub method: Option<String>,
    pub ip: Option<String>,
    /// Serialized, masked, truncated arguments
    pub params: Option<String>,
    /// Serialized, truncated return value
    pub result: Option<String>,
    pub status: AuditStatus,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cost_ms: Option<u64>,
}

impl AuditRecord {
    /// Starts a record; status stays `Failure` until [`AuditRecord::succeed`].
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            id: format!("aud_{}", uuid::Uuid::new_v4()),
            operation: operation.into(),
            title: None,
            business_type: BusinessType::Other,
            principal_id: None,
            principal_name: None,
            method: None,
            ip: None,
            params: None,
            result: None,
            status: AuditStatus::Failure,
            error_message: None,
            started_at: Utc::now(),
            finished_at: None,
            cost_ms: None,
        }
    }

    pub fn succeed(mut self, result: Option<String>) -> Self {
        self.status = AuditStatus::Success;
        self.result = result;
        self.error_message = None;
        self
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.status = AuditStatus::Failure;
        self.error_message = Some(message.into());
        self
    }

    pub fn finish(mut self, cost_ms: u64) -> Self {
        self.finished_at = Some(Utc::now());
        self.cost_ms = Some(cost_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == AuditStatus::Success
    }
}
