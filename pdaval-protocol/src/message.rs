//! JSON message types for requests and responses.

use crate::error::{ErrorCode, ProtocolError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    // Session management
    Ping,
    Bye,

    // Server info
    Info,

    // Validation
    ValidateNic,
    ValidatePostal,
    ListDistricts,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Ping,
        Operation::Bye,
        Operation::Info,
        Operation::ValidateNic,
        Operation::ValidatePostal,
        Operation::ListDistricts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Ping => "PING",
            Operation::Bye => "BYE",
            Operation::Info => "INFO",
            Operation::ValidateNic => "VALIDATE_NIC",
            Operation::ValidatePostal => "VALIDATE_POSTAL",
            Operation::ListDistricts => "LIST_DISTRICTS",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownOperation(s.to_string()))
    }
}

/// Request message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Message type, always "request".
    #[serde(rename = "type", default = "request_type")]
    pub msg_type: String,

    /// Unique request ID for correlation.
    pub id: String,

    /// Operation to perform.
    pub op: Operation,

    /// Operation-specific parameters.
    #[serde(default)]
    pub params: Value,
}

fn request_type() -> String {
    "request".to_string()
}

impl Request {
    pub fn new(id: impl Into<String>, op: Operation) -> Self {
        Self {
            msg_type: request_type(),
            id: id.into(),
            op,
            params: Value::Object(Default::default()),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Parses one request line.
    ///
    /// An `op` that is a string but names no operation is reported as
    /// [`ProtocolError::UnknownOperation`] rather than a JSON error.
    pub fn from_line(line: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;
        let value: Value = serde_json::from_str(text)?;
        match value.get("op").and_then(Value::as_str) {
            Some(op) => {
                op.parse::<Operation>()?;
            }
            None => return Err(ProtocolError::MissingField("op")),
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Best-effort extraction of the request id from a line that failed to parse.
pub fn peek_id(line: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(line).ok()?;
    match value.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Error details in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    /// Stable error code.
    pub code: ErrorCode,

    /// Human-readable error message.
    pub message: String,

    /// Whether this error is retryable.
    pub retryable: bool,

    /// Additional error details.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
}

impl ResponseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            retryable: code.is_retryable(),
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl From<&ProtocolError> for ResponseError {
    fn from(err: &ProtocolError) -> Self {
        ResponseError::new(err.error_code(), err.to_string())
    }
}

/// Response metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Server timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_time: Option<DateTime<Utc>>,

    /// Time spent handling the request, in microseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_us: Option<u64>,

    /// Additional metadata fields (for forward compatibility).
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ResponseMeta {
    pub fn now() -> Self {
        Self {
            server_time: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.server_time.is_none() && self.elapsed_us.is_none() && self.extra.is_empty()
    }
}

/// Response message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Message type, always "response".
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Request ID this response correlates to.
    pub id: String,

    /// Response status.
    pub status: ResponseStatus,

    /// Result payload (for successful responses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error details (for error responses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,

    /// Response metadata.
    #[serde(default, skip_serializing_if = "ResponseMeta::is_empty")]
    pub meta: ResponseMeta,
}

impl Response {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            msg_type: "response".to_string(),
            id: id.into(),
            status: ResponseStatus::Ok,
            result: Some(result),
            error: None,
            meta: ResponseMeta::default(),
        }
    }

    pub fn error(id: impl Into<String>, error: ResponseError) -> Self {
        Self {
            msg_type: "response".to_string(),
            id: id.into(),
            status: ResponseStatus::Error,
            result: None,
            error: Some(error),
            meta: ResponseMeta::default(),
        }
    }

    pub fn with_meta(mut self, meta: ResponseMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }
}

// ============================================================================
// Operation-specific parameter types
// ============================================================================

/// Parameters for VALIDATE_NIC and VALIDATE_POSTAL requests.
///
/// The input may be sent as `input`, or as `nic` / `code` to match the HTTP
/// gateway bodies. Numbers and booleans are accepted and validated as their
/// JSON text, so `{"code": 10100}` is the code `"10100"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateParams {
    #[serde(alias = "nic", alias = "code", deserialize_with = "scalar_string")]
    pub input: String,
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            match other {
                Value::Null => "null",
                Value::Array(_) => "an array",
                _ => "an object",
            }
        ))),
    }
}

/// Result for INFO response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResult {
    pub server_name: String,
    pub server_version: String,
    pub protocol_version: u16,
    pub operations: Vec<Operation>,
    pub automata: Vec<String>,
    pub districts: usize,
}
