//! Error taxonomy for the Radius web services client.
//!
//! Every failure mode surfaces as its own variant so callers can match on
//! exactly what went wrong instead of string-inspecting a generic error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The supplied module identifier matched neither a system name nor a
    /// display name in the instance's module list.
    #[error("module <{0}> does not exist in instance")]
    ModuleNotFound(String),

    /// A field name could not be resolved while building a request in
    /// strict mode.
    #[error("field name <{field}> not found in module <{module}>")]
    UnknownField { field: String, module: String },

    /// A value failed validation against the field's declared constraints
    /// (possible-values set membership, or date format).
    #[error("field value(s) <{value}> not valid for field <{field}>")]
    InvalidFieldValue { field: String, value: String },

    /// The service answered with a non-success status and an error body.
    #[error("HTTP response code: {status_code}; API response status: {status}; error message: {message}")]
    Service {
        status_code: u16,
        status: String,
        message: String,
    },

    /// The response had a success status but the body was missing or not
    /// shaped like the documented wire contract.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// A lookup that expects exactly one match found none.
    #[error("{0}")]
    NotFound(String),

    /// An export execution task did not reach the Finished state within the
    /// polling bound.
    #[error("execution task <{task_id}> timed out after {waited_secs} seconds; status returned as {status}")]
    Timeout {
        task_id: String,
        waited_secs: u64,
        status: String,
    },

    /// The caller handed an operation a request object it cannot use, e.g.
    /// a create without any create fields.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Session parameters could not be assembled (bad base URL, missing
    /// environment variables).
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
