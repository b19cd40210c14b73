use thiserror::Error;

/// Errors building a remote client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid remote URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported remote scheme: {0}")]
    UnsupportedScheme(String),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}
