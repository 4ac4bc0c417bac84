//! Bundled audit loggers

use super::{AuditError, AuditLogger, AuditRecord};
use crate::multisig::Context;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Emits audit records through the `log` facade under the `audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditLogger;

impl AuditLogger for LogAuditLogger {
    fn log_action(&self, _ctx: &Context, record: &AuditRecord) -> Result<(), AuditError> {
        log::info!(
            target: "audit",
            "{} user={} tx={} {}",
            record.action,
            record.user_id,
            record.tx_id.as_deref().unwrap_or("-"),
            record.details
        );
        Ok(())
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything logged so far
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditLogger for MemoryAuditLog {
    fn log_action(&self, _ctx: &Context, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Appends one JSON object per line to a file
pub struct FileAuditLog {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            append_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, oldest first
    pub fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}

impl AuditLogger for FileAuditLog {
    fn log_action(&self, _ctx: &Context, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.append_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditAction;

    #[test]
    fn test_memory_log_appends() {
        let log = MemoryAuditLog::new();
        let ctx = Context::background();
        log.log_action(
            &ctx,
            &AuditRecord::new(AuditAction::Submit, "alice", Some("t1"), "10 A->B".into()),
        )
        .unwrap();

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::Submit);
        assert_eq!(records[0].tx_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_file_log_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(temp_dir.path().join("audit").join("audit.log")).unwrap();
        let ctx = Context::background();

        log.log_action(
            &ctx,
            &AuditRecord::new(AuditAction::Submit, "alice", Some("t1"), String::new()),
        )
        .unwrap();
        log.log_action(
            &ctx,
            &AuditRecord::new(AuditAction::Executed, "system", None, "ok".into()),
        )
        .unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].action, AuditAction::Executed);
        assert_eq!(records[1].tx_id, None);
    }
}
