//! # pdaval-core
//!
//! Pushdown-automaton validators for Sri Lankan NIC numbers and postal codes.
//!
//! This crate provides:
//! - A generic PDA engine that records an execution trace of every transition
//! - The NIC automaton (old and new formats)
//! - The postal code automaton with district range lookup
//! - The district range table
//! - A validation facade assembling structured results

pub mod definition;
pub mod district;
pub mod engine;
pub mod error;
pub mod nic;
pub mod postal;
pub mod trace;
pub mod validator;

pub use definition::{Automaton, ControlState, Lookahead, Phase, Rule, StackEffect};
pub use district::{DistrictEntry, DistrictTable};
pub use engine::{Halt, PdaEngine, Run, Stack};
pub use error::{CoreError, EngineFault, RejectKind};
pub use nic::{Gender, NicAutomaton, NicDetails, NicFormat};
pub use postal::PostalAutomaton;
pub use trace::{ExecutionStep, Trace};
pub use validator::{
    list_districts, validate_nic, validate_postal_code, NicValidation, Outcome, PostalValidation,
    Validator,
};
