//! Wire models for paged results and export execution tasks.

use std::fmt;

use serde_json::Value;

use crate::error::{ApiError, Result};

/// One page of a search or export-filter result set.
///
/// The first page's `total_pages` is authoritative for the whole result
/// set; later pages are fetched with the `query_id` continuation token.
#[derive(Debug, Clone)]
pub struct PagedResult {
    pub entities: Vec<Value>,
    pub total_pages: u64,
    pub query_id: Option<String>,
}

impl PagedResult {
    /// Parse a paged envelope out of a response payload.
    pub fn from_payload(payload: Value, url: &str) -> Result<Self> {
        let entities = payload
            .get("entities")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| ApiError::MalformedResponse {
                url: url.to_string(),
                reason: "missing 'entities' array".to_string(),
            })?;

        let total_pages = payload
            .get("total pages")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::MalformedResponse {
                url: url.to_string(),
                reason: "missing 'total pages' count".to_string(),
            })?;

        let query_id = payload.get("queryId").and_then(id_string);

        Ok(Self {
            entities,
            total_pages,
            query_id,
        })
    }

    pub fn has_more(&self) -> bool {
        self.total_pages > 1
    }

    /// Continuation token, required once `has_more` is true.
    pub fn query_id(&self, url: &str) -> Result<&str> {
        self.query_id
            .as_deref()
            .ok_or_else(|| ApiError::MalformedResponse {
                url: url.to_string(),
                reason: "paged response missing queryId".to_string(),
            })
    }
}

/// Lifecycle states of an export-filter execution task, as reported under
/// `Execution Task Status`. Unknown strings are preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Created,
    Pending,
    Running,
    Finished,
    Error,
    Other(String),
}

impl From<&str> for TaskStatus {
    fn from(status: &str) -> Self {
        match status {
            "Created" => Self::Created,
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Finished" => Self::Finished,
            "Error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Finished => write!(f, "Finished"),
            Self::Error => write!(f, "Error"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Status snapshot of an export-filter execution task.
#[derive(Debug, Clone)]
pub struct ExecutionTask {
    pub status: TaskStatus,
    pub total_records: u64,
}

impl ExecutionTask {
    pub fn from_payload(payload: &Value, url: &str) -> Result<Self> {
        let status = payload
            .get("Execution Task Status")
            .and_then(Value::as_str)
            .map(TaskStatus::from)
            .ok_or_else(|| ApiError::MalformedResponse {
                url: url.to_string(),
                reason: "missing 'Execution Task Status'".to_string(),
            })?;

        let total_records = payload
            .get("Total Records")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(Self {
            status,
            total_records,
        })
    }
}

/// Render an id-bearing value (string or number on the wire) as a string.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
