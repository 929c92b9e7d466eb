//! Audit trail of raw protocol traffic

use async_trait::async_trait;
use tracing::warn;

use crate::domain::DomainResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// One message as it crossed the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub station_code: String,
    pub direction: Direction,
    /// `Call`, `CallResult`, `CallError`, or `Malformed`
    pub message_type: String,
    pub action: Option<String>,
    pub message_id: Option<String>,
    pub payload: String,
}

#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> DomainResult<()>;

    /// Audit failures never interrupt protocol handling.
    async fn record_best_effort(&self, entry: AuditEntry) {
        let station_code = entry.station_code.clone();
        if let Err(e) = self.record(entry).await {
            warn!(station_code = station_code.as_str(), error = %e, "Failed to write audit entry");
        }
    }
}
