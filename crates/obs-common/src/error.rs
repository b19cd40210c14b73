//! Error types for the observation services.

use thiserror::Error;

/// Result type alias using ObsError.
pub type ObsResult<T> = Result<T, ObsError>;

/// Primary error type for request validation and service setup.
#[derive(Debug, Error)]
pub enum ObsError {
    // === Request Errors ===
    #[error("Invalid state parameter")]
    InvalidRegion(String),

    // === Setup Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ObsError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ObsError::InvalidRegion(_) => 400,
            ObsError::Config(_) | ObsError::Internal(_) => 500,
        }
    }

    /// Machine-readable error body, e.g. `{"error": "Invalid state parameter"}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

impl From<std::io::Error> for ObsError {
    fn from(err: std::io::Error) -> Self {
        ObsError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ObsError {
    fn from(err: serde_json::Error) -> Self {
        ObsError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_region_is_bad_request() {
        let err = ObsError::InvalidRegion("XYZ".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.to_json()["error"], "Invalid state parameter");
    }

    #[test]
    fn test_internal_errors_are_500() {
        assert_eq!(ObsError::Config("bad".into()).http_status_code(), 500);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(ObsError::from(io).http_status_code(), 500);
    }
}
