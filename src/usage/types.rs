use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const INSIGHT_SERVICE_NAME: &str = "insight";

/// One metered model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default)]
    pub caller_id: Option<String>,
    pub service_name: String,
    /// Model id the attempt was sent to.
    pub endpoint: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    pub request_payload: Value,
    pub response_payload: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to write usage ledger {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode usage record: {0}")]
    Encode(#[from] serde_json::Error),
}
