//! Error types for buildkite-ledger

use revhunt_core::RevhuntError;
use thiserror::Error;

/// Errors that can occur talking to the Buildkite REST API
#[derive(Error, Debug)]
pub enum BuildkiteError {
    /// No API token configured
    #[error("Buildkite API token is not configured (set BUILDKITE_API_TOKEN)")]
    MissingToken,

    /// Non-success HTTP status from the API
    #[error("Buildkite API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level HTTP error
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BuildkiteError {
    fn from(err: reqwest::Error) -> Self {
        BuildkiteError::Http(err.to_string())
    }
}

impl From<BuildkiteError> for RevhuntError {
    fn from(err: BuildkiteError) -> Self {
        RevhuntError::Ledger(err.to_string())
    }
}
