//! Protocol error types and error codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Protocol-level errors that can occur while reading or parsing a request line.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("line too long: {size} bytes (max {max})")]
    LineTooLong { size: usize, max: usize },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 in request line")]
    InvalidUtf8,

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl ProtocolError {
    /// Maps the error to the code sent back to the client.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ProtocolError::LineTooLong { .. } => ErrorCode::LineTooLong,
            ProtocolError::UnknownOperation(_) => ErrorCode::UnknownOperation,
            ProtocolError::Json(_) | ProtocolError::InvalidUtf8 | ProtocolError::MissingField(_) => {
                ErrorCode::BadRequest
            }
            ProtocolError::Io(_) => ErrorCode::InternalError,
        }
    }
}

/// Stable error codes returned in error responses.
///
/// These codes are part of the protocol contract and must remain stable
/// across versions. A rejected validation is not an error: it is an `ok`
/// response whose result has `accepted: false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    UnknownOperation,
    LineTooLong,
    InternalError,
}

impl ErrorCode {
    /// Returns whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::InternalError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::UnknownOperation => "UNKNOWN_OPERATION",
            ErrorCode::LineTooLong => "LINE_TOO_LONG",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_retryable() {
        assert!(ErrorCode::InternalError.is_retryable());

        assert!(!ErrorCode::BadRequest.is_retryable());
        assert!(!ErrorCode::UnknownOperation.is_retryable());
        assert!(!ErrorCode::LineTooLong.is_retryable());
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::BadRequest), "BAD_REQUEST");
        assert_eq!(
            format!("{}", ErrorCode::UnknownOperation),
            "UNKNOWN_OPERATION"
        );
        assert_eq!(format!("{}", ErrorCode::LineTooLong), "LINE_TOO_LONG");
        assert_eq!(format!("{}", ErrorCode::InternalError), "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::UnknownOperation).unwrap();
        assert_eq!(json, "\"UNKNOWN_OPERATION\"");

        let parsed: ErrorCode = serde_json::from_str("\"LINE_TOO_LONG\"").unwrap();
        assert_eq!(parsed, ErrorCode::LineTooLong);
    }

    #[test]
    fn test_protocol_error_codes() {
        let err = ProtocolError::LineTooLong { size: 100, max: 50 };
        assert!(err.to_string().contains("100"));
        assert_eq!(err.error_code(), ErrorCode::LineTooLong);

        let err = ProtocolError::UnknownOperation("FROB".to_string());
        assert!(err.to_string().contains("FROB"));
        assert_eq!(err.error_code(), ErrorCode::UnknownOperation);

        assert_eq!(ProtocolError::InvalidUtf8.error_code(), ErrorCode::BadRequest);

        let err = ProtocolError::MissingField("input");
        assert!(err.to_string().contains("input"));
        assert_eq!(err.error_code(), ErrorCode::BadRequest);
    }
}
