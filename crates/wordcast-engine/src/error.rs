//! Error types for the prediction engine.

use thiserror::Error;

/// Faults raised by prediction sources.
///
/// Upstream and parse faults never reach the user: the predictor facade
/// degrades them to the fallback source and logs the detail.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Non-2xx response or transport failure from the remote endpoint.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Response body that could not be decoded into candidates.
    #[error("parse error: {0}")]
    Parse(String),

    /// Source constructed from unusable configuration.
    #[error("invalid source config: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Upstream(err.to_string())
        }
    }
}
