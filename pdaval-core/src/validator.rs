//! Validation facade.
//!
//! Normalizes raw input, bounds its length, runs the matching automaton and
//! assembles the result from the terminal state and trace.

use crate::definition::{Automaton, ControlState, BOTTOM_MARKER};
use crate::district::DistrictTable;
use crate::engine::PdaEngine;
use crate::error::RejectKind;
use crate::nic::{NicAutomaton, NicDetails, NicFormat, NicState, MAX_NIC_LEN};
use crate::postal::{PostalAutomaton, PostalState, MAX_POSTAL_LEN};
use crate::trace::{ExecutionStep, Trace};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of validating a NIC number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicValidation {
    pub accepted: bool,
    pub message: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub format: Option<NicFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<NicDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectKind>,
    pub final_state: String,
    pub execution_log: Trace,
}

/// Result of validating a postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalValidation {
    pub accepted: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    /// Matched range as `"min-max"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectKind>,
    pub final_state: String,
    pub execution_log: Trace,
}

/// Fields shared by every validation result.
pub trait Outcome {
    fn accepted(&self) -> bool;
    fn message(&self) -> &str;
    fn reason(&self) -> Option<RejectKind>;
    fn execution_log(&self) -> &Trace;
}

impl Outcome for NicValidation {
    fn accepted(&self) -> bool {
        self.accepted
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn reason(&self) -> Option<RejectKind> {
        self.reason
    }

    fn execution_log(&self) -> &Trace {
        &self.execution_log
    }
}

impl Outcome for PostalValidation {
    fn accepted(&self) -> bool {
        self.accepted
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn reason(&self) -> Option<RejectKind> {
        self.reason
    }

    fn execution_log(&self) -> &Trace {
        &self.execution_log
    }
}

impl NicValidation {
    fn rejected(reason: RejectKind, message: String, final_state: &str, trace: Trace) -> Self {
        Self {
            accepted: false,
            message,
            format: None,
            details: None,
            reason: Some(reason),
            final_state: final_state.to_string(),
            execution_log: trace,
        }
    }
}

impl PostalValidation {
    fn rejected(reason: RejectKind, message: String, final_state: &str, trace: Trace) -> Self {
        Self {
            accepted: false,
            message,
            district: None,
            province: None,
            range: None,
            reason: Some(reason),
            final_state: final_state.to_string(),
            execution_log: trace,
        }
    }
}

/// Runs both automata. Cheap to clone and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Validator {
    districts: Arc<DistrictTable>,
    engine: PdaEngine,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DistrictTable::builtin())
    }
}

impl Validator {
    pub fn new(districts: Arc<DistrictTable>) -> Self {
        Self {
            districts,
            engine: PdaEngine::new(),
        }
    }

    pub fn with_engine(mut self, engine: PdaEngine) -> Self {
        self.engine = engine;
        self
    }

    /// The district table postal codes are resolved against.
    pub fn list_districts(&self) -> &Arc<DistrictTable> {
        &self.districts
    }

    pub fn validate_nic(&self, raw: &str) -> NicValidation {
        let input = raw.trim().to_ascii_uppercase();
        let automaton = NicAutomaton;

        if let Some((message, trace)) =
            guard_length(&automaton, &input, MAX_NIC_LEN, "NIC number")
        {
            return NicValidation::rejected(
                RejectKind::MalformedInput,
                message,
                automaton.fault_state().label(),
                trace,
            );
        }

        let run = self.engine.run(&automaton, &input);
        let final_state = run.state.label();
        let result = match (run.state, NicFormat::from_len(input.chars().count())) {
            (NicState::Accept, Some(format)) => NicValidation {
                accepted: true,
                message: format!("Valid {} NIC", format),
                format: Some(format),
                details: NicDetails::decode(&input, format),
                reason: None,
                final_state: final_state.to_string(),
                execution_log: run.trace,
            },
            (NicState::Reject(reason), _) => {
                let message = match run.fault() {
                    Some(fault) => format!("internal error: {}", fault),
                    None => reason.message(),
                };
                NicValidation::rejected(reason.kind(), message, final_state, run.trace)
            }
            (state, _) => NicValidation::rejected(
                RejectKind::EngineFault,
                format!("internal error: NIC run ended in {}", state.label()),
                automaton.fault_state().label(),
                run.trace,
            ),
        };

        tracing::debug!(
            accepted = result.accepted,
            final_state = %result.final_state,
            steps = result.execution_log.len(),
            "validated NIC"
        );
        result
    }

    pub fn validate_postal_code(&self, raw: &str) -> PostalValidation {
        let input = raw.trim();
        let automaton = PostalAutomaton::new(&self.districts);

        if let Some((message, trace)) =
            guard_length(&automaton, input, MAX_POSTAL_LEN, "Postal code")
        {
            return PostalValidation::rejected(
                RejectKind::MalformedInput,
                message,
                automaton.fault_state().label(),
                trace,
            );
        }

        let run = self.engine.run(&automaton, input);
        let final_state = run.state.label();
        let matched = match run.state {
            PostalState::Accept { district } => input
                .parse::<u32>()
                .ok()
                .and_then(|code| {
                    let entry = self.districts.entries().get(district)?;
                    Some((entry, entry.range_containing(code)?))
                }),
            _ => None,
        };

        let result = match (run.state, matched) {
            (PostalState::Accept { .. }, Some((entry, (min, max)))) => PostalValidation {
                accepted: true,
                message: "Valid postal code".to_string(),
                district: Some(entry.name.clone()),
                province: Some(entry.province.clone()),
                range: Some(format!("{}-{}", min, max)),
                reason: None,
                final_state: final_state.to_string(),
                execution_log: run.trace,
            },
            (PostalState::Reject(reason), _) => {
                let message = match run.fault() {
                    Some(fault) => format!("internal error: {}", fault),
                    None => reason.message(),
                };
                PostalValidation::rejected(reason.kind(), message, final_state, run.trace)
            }
            (state, _) => PostalValidation::rejected(
                RejectKind::EngineFault,
                format!("internal error: postal run ended in {}", state.label()),
                automaton.fault_state().label(),
                run.trace,
            ),
        };

        tracing::debug!(
            accepted = result.accepted,
            final_state = %result.final_state,
            district = result.district.as_deref().unwrap_or("-"),
            "validated postal code"
        );
        result
    }
}

/// Rejects empty or overlong input before it reaches the engine, returning the
/// message and a two-entry trace from the start state to the reject state.
fn guard_length<A: Automaton>(
    automaton: &A,
    input: &str,
    max_len: usize,
    what: &str,
) -> Option<(String, Trace)> {
    let len = input.chars().count();
    let message = if len == 0 {
        format!("{} is empty", what)
    } else if len > max_len {
        format!(
            "{} too long: {} characters (maximum {})",
            what, len, max_len
        )
    } else {
        return None;
    };

    let mut trace = Trace::with_capacity(2);
    trace.record(ExecutionStep::new(
        automaton.start().label(),
        format!("Starting validation for: {}", input),
        vec![BOTTOM_MARKER.to_string()],
    ));
    trace.record(ExecutionStep::new(
        automaton.fault_state().label(),
        message.clone(),
        vec![BOTTOM_MARKER.to_string()],
    ));
    Some((message, trace))
}

/// Validates a NIC number against the built-in tables.
pub fn validate_nic(raw: &str) -> NicValidation {
    Validator::default().validate_nic(raw)
}

/// Validates a postal code against the built-in district table.
pub fn validate_postal_code(raw: &str) -> PostalValidation {
    Validator::default().validate_postal_code(raw)
}

/// The built-in district table.
pub fn list_districts() -> Arc<DistrictTable> {
    DistrictTable::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_trace_shape(trace: &Trace, accepted: bool) {
        assert_eq!(trace.first().unwrap().state, "q0");
        let last = &trace.last().unwrap().state;
        assert_eq!(last, if accepted { "q_accept" } else { "q_reject" });
        for step in trace {
            assert!(step.depth() >= 1);
            assert_eq!(step.stack[0], BOTTOM_MARKER);
            assert_eq!(
                step.stack.iter().filter(|s| *s == BOTTOM_MARKER).count(),
                1
            );
        }
    }

    #[test]
    fn test_old_format_scenario() {
        let result = validate_nic("951234567V");
        assert!(result.accepted);
        assert_eq!(result.format, Some(NicFormat::Old));
        assert_eq!(result.message, "Valid Old Format NIC");
        assert_eq!(result.final_state, "q_accept");
        assert_eq!(result.details.unwrap().birth_year, 1995);
        assert_trace_shape(&result.execution_log, true);
    }

    #[test]
    fn test_new_format_scenario() {
        let result = validate_nic("199512345678");
        assert!(result.accepted);
        assert_eq!(result.format, Some(NicFormat::New));
        assert!(result.message.contains("New Format"));
    }

    #[test]
    fn test_missing_suffix_scenario() {
        let result = validate_nic("123456789");
        assert!(!result.accepted);
        assert_eq!(result.reason, Some(RejectKind::StructuralMismatch));
        assert!(result.message.contains("missing V/X suffix"));
        assert_eq!(result.format, None);
        assert_trace_shape(&result.execution_log, false);
    }

    #[test]
    fn test_too_long_nic_is_guarded() {
        let result = validate_nic("1234567890123");
        assert!(!result.accepted);
        assert_eq!(result.reason, Some(RejectKind::MalformedInput));
        assert!(result.message.contains("too long"));
        assert_eq!(result.execution_log.len(), 2);
        assert_trace_shape(&result.execution_log, false);
    }

    #[test]
    fn test_empty_input_is_guarded() {
        let nic = validate_nic("   ");
        assert_eq!(nic.message, "NIC number is empty");
        assert_eq!(nic.reason, Some(RejectKind::MalformedInput));

        let postal = validate_postal_code("");
        assert_eq!(postal.message, "Postal code is empty");
        assert_eq!(postal.final_state, "q_reject");
    }

    #[test]
    fn test_input_is_normalized() {
        let result = validate_nic("  951234567v ");
        assert!(result.accepted);
        assert!(result
            .execution_log
            .first()
            .unwrap()
            .action
            .ends_with("951234567V"));
    }

    #[test]
    fn test_postal_scenarios() {
        let result = validate_postal_code("10100");
        assert!(result.accepted);
        assert_eq!(result.district.as_deref(), Some("Colombo 10"));
        assert_eq!(result.province.as_deref(), Some("Western"));
        assert_eq!(result.range.as_deref(), Some("10000-10999"));
        assert_trace_shape(&result.execution_log, true);

        let miss = validate_postal_code("99999");
        assert!(!miss.accepted);
        assert_eq!(miss.reason, Some(RejectKind::RangeMiss));
        assert_eq!(miss.district, None);
        assert_trace_shape(&miss.execution_log, false);
    }

    #[test]
    fn test_postal_shape_rejections() {
        let short = validate_postal_code("123");
        assert_eq!(short.reason, Some(RejectKind::StructuralMismatch));

        let long = validate_postal_code("123456");
        assert_eq!(long.reason, Some(RejectKind::MalformedInput));
        assert_eq!(long.execution_log.len(), 2);

        let letters = validate_postal_code("1O1OO");
        assert_eq!(letters.reason, Some(RejectKind::MalformedInput));
        assert_ne!(letters.message, short.message);
    }

    #[test]
    fn test_custom_table() {
        let table = DistrictTable::new(vec![crate::district::DistrictEntry::new(
            "Testville",
            "99",
            "Northern",
            vec![(99000, 99999)],
        )])
        .unwrap();
        let validator = Validator::new(Arc::new(table));

        let result = validator.validate_postal_code("99999");
        assert!(result.accepted);
        assert_eq!(result.district.as_deref(), Some("Testville"));
        assert!(!validator.validate_postal_code("10100").accepted);
        assert_eq!(validator.list_districts().len(), 1);
    }

    #[test]
    fn test_engine_fault_reaches_result() {
        let validator = Validator::default().with_engine(PdaEngine::new().with_step_slack(0));

        let result = validator.validate_postal_code("10100");
        assert!(!result.accepted);
        assert_eq!(result.reason, Some(RejectKind::EngineFault));
        assert!(result.message.starts_with("internal error:"));
        assert!(result.message.contains("transition limit of 12"));
        assert_eq!(result.final_state, "q_reject");
        assert_eq!(result.district, None);
        assert_eq!(result.execution_log.first().unwrap().state, "q0");
        let last = result.execution_log.last().unwrap();
        assert_eq!(last.state, "q_reject");
        assert!(last.action.starts_with("internal error:"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["reason"], "ENGINE_FAULT");
    }

    #[test]
    fn test_result_serialization() {
        let json = serde_json::to_value(validate_nic("951234567V")).unwrap();
        assert_eq!(json["type"], "Old Format");
        assert_eq!(json["accepted"], true);
        assert!(json.get("reason").is_none());
        assert_eq!(json["execution_log"][0]["state"], "q0");
        assert_eq!(json["execution_log"][0]["stack"][0], "Z0");

        let json = serde_json::to_value(validate_postal_code("99999")).unwrap();
        assert_eq!(json["reason"], "RANGE_MISS");
        assert!(json.get("district").is_none());
    }

    proptest! {
        #[test]
        fn prop_old_format_accepted(nic in "[0-9]{9}[VXvx]") {
            let result = validate_nic(&nic);
            prop_assert!(result.accepted);
            prop_assert_eq!(result.format, Some(NicFormat::Old));
        }

        #[test]
        fn prop_new_format_accepted(nic in "[0-9]{12}") {
            let result = validate_nic(&nic);
            prop_assert!(result.accepted);
            prop_assert_eq!(result.format, Some(NicFormat::New));
        }

        #[test]
        fn prop_other_strings_rejected(nic in "[0-9VX]{0,14}") {
            let digits = nic.chars().filter(|c| c.is_ascii_digit()).count();
            let old = nic.len() == 10 && digits == 9 && !nic.ends_with(|c: char| c.is_ascii_digit());
            let new = nic.len() == 12 && digits == 12;
            prop_assume!(!old && !new);
            prop_assert!(!validate_nic(&nic).accepted);
        }

        #[test]
        fn prop_nic_idempotent_and_well_traced(nic in "[0-9VXA ]{0,14}") {
            let first = validate_nic(&nic);
            let second = validate_nic(&nic);
            prop_assert_eq!(&first, &second);
            assert_trace_shape(&first.execution_log, first.accepted);
        }

        #[test]
        fn prop_postal_matches_lookup(code in 0u32..100_000) {
            let input = format!("{:05}", code);
            let result = validate_postal_code(&input);
            let again = validate_postal_code(&input);
            prop_assert_eq!(&result, &again);
            let table = DistrictTable::builtin();
            match table.lookup(code) {
                Some(m) => {
                    prop_assert!(result.accepted);
                    prop_assert_eq!(result.district.as_deref(), Some(m.entry.name.as_str()));
                }
                None => {
                    prop_assert!(!result.accepted);
                    prop_assert_eq!(result.reason, Some(RejectKind::RangeMiss));
                }
            }
            assert_trace_shape(&result.execution_log, result.accepted);
        }
    }
}
