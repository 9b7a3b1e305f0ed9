//! Error types for weft.
//!
//! Errors carry a stable machine-parseable code so callers (UI, webhook
//! responders, parent workflows) can branch on failure kinds without
//! string matching.

use thiserror::Error;

/// Result type alias for weft operations.
pub type Result<T> = std::result::Result<T, Error>;

/// weft error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed graph: cycles, dangling references, duplicate labels.
    /// Rejected before a run starts.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single node executor failed. Recorded on the node's result and
    /// escalated to a run failure unless caught.
    #[error("Node error: {0}")]
    Node(String),

    /// Run-level failure (timeout, cancellation, unknown workflow, ...).
    #[error("Execution error: {0}")]
    Execution(String),

    /// Backing store (workflow store, counter store, queue) unavailable.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Node(_) => "NODE_ERROR",
            Error::Execution(_) => "EXECUTION_ERROR",
            Error::Storage(_) => "STORAGE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(Error::Node("x".into()).code(), "NODE_ERROR");
        assert_eq!(Error::Execution("x".into()).code(), "EXECUTION_ERROR");
    }
}
