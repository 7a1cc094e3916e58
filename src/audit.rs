//! Audit sink for governance decisions.
//!
//! Writes one JSON object per line to an append-only byte stream,
//! conventionally the interceptor's standard error. Emission is
//! best-effort: a failed write never blocks or fails a forwarding
//! decision. Tool arguments are never recorded; they may contain secrets.

use std::io::Write;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::classifier::OperationClass;

/// Decision outcome recorded in an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// The call was forwarded to the target.
    Allowed,
    /// The call was blocked and a denial synthesized.
    Denied,
}

/// One governance decision, serialized as a single JSON line.
#[derive(Debug, Serialize)]
struct DecisionEntry<'a> {
    timestamp: String,
    tool: &'a str,
    service: &'a str,
    operation: OperationClass,
    status: DecisionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<&'a str>,
}

/// Audit sink writing structured JSON lines to an append-only stream.
pub struct AuditSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl AuditSink {
    /// Create a sink writing to the process's standard error.
    pub fn stderr() -> Self {
        Self::from_writer(Box::new(std::io::stderr()))
    }

    /// Create a sink from an arbitrary writer (for testing).
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Record one governance decision.
    ///
    /// The record captures the decision, not the outcome: allowed calls are
    /// logged when they are forwarded, before the target responds. The
    /// timestamp is RFC 3339 UTC with millisecond precision.
    pub fn record_decision(
        &self,
        tool: &str,
        service: &str,
        operation: OperationClass,
        status: DecisionStatus,
        reason: Option<&str>,
        project: Option<&str>,
    ) -> anyhow::Result<()> {
        let entry = DecisionEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            tool,
            service,
            operation,
            status,
            reason,
            project,
        };
        let line = serde_json::to_string(&entry)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("audit lock poisoned: {e}"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
