//! Server error types.

use crate::config::ConfigError;
use pdaval_protocol::{ErrorCode, ProtocolError};
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server shutting down")]
    ShuttingDown,
}

impl ServerError {
    /// Converts to protocol error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ServerError::Protocol(e) => e.error_code(),
            ServerError::Json(_) | ServerError::InvalidRequest(_) => ErrorCode::BadRequest,
            ServerError::Io(_) | ServerError::Config(_) | ServerError::ShuttingDown => {
                ErrorCode::InternalError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ServerError::InvalidRequest("missing input".to_string());
        assert_eq!(err.error_code(), ErrorCode::BadRequest);
        assert!(!err.error_code().is_retryable());

        let err = ServerError::from(serde_json::from_str::<u8>("x").unwrap_err());
        assert_eq!(err.error_code(), ErrorCode::BadRequest);

        let err = ServerError::Io(std::io::Error::other("boom"));
        assert_eq!(err.error_code(), ErrorCode::InternalError);
        assert!(err.error_code().is_retryable());

        let err = ServerError::from(ConfigError::Validation("bad".to_string()));
        assert_eq!(err.error_code(), ErrorCode::InternalError);
    }
}
