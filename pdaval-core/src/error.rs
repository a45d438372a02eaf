//! Core error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from building the district range table.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid district table: {reason}")]
    InvalidDistrictTable { reason: String },

    #[error("duplicate district: {name}")]
    DuplicateDistrict { name: String },

    #[error("invalid range for district '{district}': {min} > {max}")]
    InvalidRange { district: String, min: u32, max: u32 },
}

impl CoreError {
    /// Returns an error code suitable for protocol responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidDistrictTable { .. } => "INVALID_DISTRICT_TABLE",
            CoreError::DuplicateDistrict { .. } => "INVALID_DISTRICT_TABLE",
            CoreError::InvalidRange { .. } => "INVALID_DISTRICT_TABLE",
        }
    }
}

/// A run the engine had to stop because the transition table is defective.
///
/// None of these can be caused by user input against a correct table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineFault {
    #[error("transition limit of {limit} exceeded in state {state}")]
    StepLimitExceeded { state: &'static str, limit: usize },

    #[error("no rule matched in state {state} at {lookahead}")]
    NoRule {
        state: &'static str,
        lookahead: String,
    },

    #[error("pop of the bottom marker attempted in state {state}")]
    PopBottom { state: &'static str },
}

/// Classification of a rejected validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectKind {
    /// Empty input, implausible length, or a disallowed character.
    MalformedInput,
    /// Right character classes in the wrong count or position.
    StructuralMismatch,
    /// Well-formed postal code that no district range contains.
    RangeMiss,
    /// Transition-table defect. Never caused by user input.
    EngineFault,
}

impl RejectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectKind::MalformedInput => "MALFORMED_INPUT",
            RejectKind::StructuralMismatch => "STRUCTURAL_MISMATCH",
            RejectKind::RangeMiss => "RANGE_MISS",
            RejectKind::EngineFault => "ENGINE_FAULT",
        }
    }

    /// Returns whether the rejection was caused by the caller's input.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, RejectKind::EngineFault)
    }
}
