use thiserror::Error;

/// Errors returned by the `TikHub` API client.
#[derive(Debug, Error)]
pub enum TikHubError {
    /// Network or TLS failure, or a non-2xx HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The envelope carried a `code` other than 200.
    #[error("TikHub API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The response body was not valid JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The client could not be built from the supplied settings.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}
