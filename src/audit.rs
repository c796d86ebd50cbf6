//! JSONL audit log shared with the backend and UI agents.
//!
//! One JSON object per line. The schema is the contract every PALA agent
//! writes against; the launcher both appends its own lifecycle events and
//! watches the file for backend boot activity (see `readiness`).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SOURCE_AGENT: &str = "pala-launcher";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    /// UTC, ISO-8601.
    pub timestamp: String,
    pub event_type: String,
    pub source_agent: String,
    pub event_data: serde_json::Value,
}

impl AuditEvent {
    pub fn new(event_type: &str, event_data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            event_type: event_type.to_string(),
            source_agent: SOURCE_AGENT.to_string(),
            event_data,
        }
    }
}

/// Append-only handle on the audit log file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate (or create) the log for a clean slate.
    pub fn reset(&self) -> std::io::Result<()> {
        std::fs::write(&self.path, b"")
    }

    /// Current size in bytes; 0 if the file does not exist yet.
    pub fn len(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one event as a JSON line. Logs and swallows write errors —
    /// a broken audit log must never take the launch down.
    pub fn append(&self, event_type: &str, event_data: serde_json::Value) {
        if let Err(e) = self.try_append(event_type, event_data) {
            tracing::warn!("audit log write failed: {e}");
        }
    }

    fn try_append(&self, event_type: &str, event_data: serde_json::Value) -> std::io::Result<()> {
        let event = AuditEvent::new(event_type, event_data);
        let line = serde_json::to_string(&event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}
