use thiserror::Error;

/// Errors raised by a single inference provider.
///
/// These never leave [`crate::Classifier`]; they only decide whether the next
/// provider is tried.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} returned no text content")]
    EmptyResponse { provider: String },

    #[error("{provider} response could not be interpreted: {reason}")]
    Malformed { provider: String, reason: String },

    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),
}
