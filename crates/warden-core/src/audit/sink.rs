use super::record::AuditRecord;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditSinkError {
    #[error("audit sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("audit sink unavailable: {message}")]
    Unavailable { message: String },
}

/// Destination for finished audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn persist(&self, record: &AuditRecord) -> Result<(), AuditSinkError>;
}

/// Appends one JSON record per line.
pub struct FileAuditSink {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn persist(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
        let json = serde_json::to_string(record)?;
        let mut f = self.file.lock().map_err(|_| AuditSinkError::Unavailable {
            message: format!("{} lock poisoned", self.path.display()),
        })?;
        writeln!(f, "{}", json)?;
        f.flush()?;
        Ok(())
    }
}

/// Discards every record.
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn persist(&self, _record: &AuditRecord) -> Result<(), AuditSinkError> {
        Ok(())
    }
}

/// Keeps records in memory for inspection by the embedding code.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(r) => r.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(r) => r.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn persist(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
        let mut records = self.records.lock().map_err(|_| AuditSinkError::Unavailable {
            message: "memory sink lock poisoned".to_string(),
        })?;
        records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditStatus;

    #[tokio::test]
    async fn file_sink_appends_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.ndjson");
        let sink = FileAuditSink::new(&path).unwrap();

        sink.persist(&AuditRecord::new("addRole").succeed(None))
            .await
            .unwrap();
        sink.persist(&AuditRecord::new("deleteRole").fail("in use"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.operation, "deleteRole");
        assert_eq!(second.status, AuditStatus::Failure);
    }

    #[tokio::test]
    async fn memory_sink_keeps_order() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty());
        sink.persist(&AuditRecord::new("a")).await.unwrap();
        sink.persist(&AuditRecord::new("b")).await.unwrap();
        let ops: Vec<_> = sink.records().into_iter().map(|r| r.operation).collect();
        assert_eq!(ops, ["a", "b"]);
    }
}
