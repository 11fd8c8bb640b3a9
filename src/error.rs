use thiserror::Error;

/// Failures surfaced by the gateway client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ODataError {
    #[error("Invalid gateway configuration: {0}")]
    Configuration(String),
    #[error("Gateway query failed: {0}")]
    Query(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Rejected before dispatch: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(String),
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}
