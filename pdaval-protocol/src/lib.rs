//! # pdaval-protocol
//!
//! Line-delimited JSON command protocol for the pdaval validation server.
//!
//! This crate provides:
//! - JSON line encoding and decoding with a line length limit
//! - Request/Response envelope types
//! - Error codes and protocol constants

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{Encoder, LineDecoder};
pub use error::{ErrorCode, ProtocolError};
pub use message::{
    peek_id, InfoResult, Operation, Request, Response, ResponseError, ResponseMeta,
    ResponseStatus, ValidateParams,
};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default port for the line protocol server.
pub const DEFAULT_PORT: u16 = 7411;

/// Default port for the HTTP gateway.
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Maximum request line length (16 KiB).
pub const MAX_LINE_BYTES: usize = 16 * 1024;
