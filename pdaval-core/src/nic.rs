//! NIC automaton.
//!
//! Formal definition:
//! - Σ: {0-9, V, X}
//! - Γ: {D, Z0}, one `D` per digit read
//! - Q: {q0, q1, q2, q_accept, q_reject}
//!
//! ```text
//! δ(q0, ε, Z0)       = (q1, Z0)
//! δ(q1, d, γ)        = (q1, Dγ)         d ∈ 0-9, fewer than 12 D
//! δ(q1, V|X, γ)      = (q2, γ)          exactly 9 D on the stack
//! δ(q1, ε, γ)        = (q_accept, γ)    at end of input, exactly 12 D
//! δ(q2, ε, D)        = (q2, ε)
//! δ(q2, ε, Z0)       = (q_accept, Z0)   at end of input
//! ```
//!
//! Every other configuration moves to `q_reject` with a reason.

use crate::definition::{Automaton, ControlState, Lookahead, Phase, Rule};
use crate::engine::{Stack, Top};
use crate::error::RejectKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digits in an old-format NIC before the suffix letter.
pub const OLD_FORMAT_DIGITS: usize = 9;

/// Digits in a new-format NIC.
pub const NEW_FORMAT_DIGITS: usize = 12;

/// Longest input the NIC automaton is ever given.
pub const MAX_NIC_LEN: usize = 12;

/// Why the NIC automaton rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NicReject {
    InvalidCharacter(char),
    /// Suffix letter read after the wrong number of digits.
    MisplacedSuffix { digits: usize },
    /// Input continues after the suffix letter.
    TrailingInput(char),
    /// Nine digits and no suffix letter.
    MissingSuffix,
    /// Input ended with neither 9 nor 12 digits.
    WrongLength { digits: usize },
    /// A thirteenth digit.
    TooManyDigits,
    /// The engine stopped the run on a transition-table defect.
    EngineFault,
}

impl NicReject {
    pub fn kind(&self) -> RejectKind {
        match self {
            NicReject::InvalidCharacter(_) => RejectKind::MalformedInput,
            NicReject::EngineFault => RejectKind::EngineFault,
            _ => RejectKind::StructuralMismatch,
        }
    }

    pub fn message(&self) -> String {
        match self {
            NicReject::InvalidCharacter(c) => format!(
                "Contains invalid character '{}' (only digits and a final V/X are allowed)",
                c
            ),
            NicReject::MisplacedSuffix { digits } => format!(
                "V/X must follow exactly 9 digits at the end (found it after {} digits)",
                digits
            ),
            NicReject::TrailingInput(_) => {
                "Unexpected extra characters after the V/X suffix".to_string()
            }
            NicReject::MissingSuffix => "Old Format NIC missing V/X suffix".to_string(),
            NicReject::WrongLength { digits } => format!(
                "Invalid length: {} digits (must be 9 digits + V/X for Old Format or 12 digits for New Format)",
                digits
            ),
            NicReject::TooManyDigits => {
                "Too many digits (New Format NIC has exactly 12)".to_string()
            }
            NicReject::EngineFault => "internal error: NIC automaton halted".to_string(),
        }
    }
}

/// Control states of the NIC automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NicState {
    Start,
    Reading,
    SuffixCheck,
    Accept,
    Reject(NicReject),
}

impl ControlState for NicState {
    fn label(&self) -> &'static str {
        match self {
            NicState::Start => "q0",
            NicState::Reading => "q1",
            NicState::SuffixCheck => "q2",
            NicState::Accept => "q_accept",
            NicState::Reject(_) => "q_reject",
        }
    }

    fn phase(&self) -> Phase {
        match self {
            NicState::Accept => Phase::Accepted,
            NicState::Reject(_) => Phase::Rejected,
            _ => Phase::Running,
        }
    }
}

/// Stack alphabet: a generic digit marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NicSymbol {
    Digit,
}

impl fmt::Display for NicSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NicSymbol::Digit => f.write_str("D"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NicAutomaton;

impl NicAutomaton {
    fn reject(reason: NicReject, action: String) -> Rule<NicState, NicSymbol> {
        Rule::keep(NicState::Reject(reason), action)
    }
}

impl Automaton for NicAutomaton {
    type State = NicState;
    type Symbol = NicSymbol;

    fn name(&self) -> &'static str {
        "nic"
    }

    fn start(&self) -> NicState {
        NicState::Start
    }

    fn fault_state(&self) -> NicState {
        NicState::Reject(NicReject::EngineFault)
    }

    fn read(
        &self,
        state: NicState,
        symbol: char,
        stack: &Stack<NicSymbol>,
    ) -> Option<Rule<NicState, NicSymbol>> {
        let digits = stack.data_len();
        match state {
            NicState::Reading if symbol.is_ascii_digit() => {
                if digits >= NEW_FORMAT_DIGITS {
                    Some(Self::reject(
                        NicReject::TooManyDigits,
                        format!("Read digit \"{}\" with {} digits already on stack", symbol, digits),
                    ))
                } else {
                    Some(Rule::push(
                        NicState::Reading,
                        NicSymbol::Digit,
                        format!("Read digit \"{}\", Pushed D", symbol),
                    ))
                }
            }
            NicState::Reading if matches!(symbol.to_ascii_uppercase(), 'V' | 'X') => {
                if digits == OLD_FORMAT_DIGITS {
                    Some(Rule::keep(
                        NicState::SuffixCheck,
                        format!(
                            "Read suffix \"{}\", Checking stack depth for Old Format",
                            symbol
                        ),
                    ))
                } else {
                    Some(Self::reject(
                        NicReject::MisplacedSuffix { digits },
                        format!("Suffix \"{}\" found after {} digits", symbol, digits),
                    ))
                }
            }
            NicState::Reading => Some(Self::reject(
                NicReject::InvalidCharacter(symbol),
                format!("Invalid character: \"{}\"", symbol),
            )),
            NicState::SuffixCheck => Some(Self::reject(
                NicReject::TrailingInput(symbol),
                format!("Unexpected \"{}\" after suffix", symbol),
            )),
            NicState::Start | NicState::Accept | NicState::Reject(_) => None,
        }
    }

    fn epsilon(
        &self,
        state: NicState,
        lookahead: Lookahead,
        stack: &Stack<NicSymbol>,
    ) -> Option<Rule<NicState, NicSymbol>> {
        let digits = stack.data_len();
        match (state, lookahead, stack.top()) {
            (NicState::Start, _, _) => Some(Rule::keep(
                NicState::Reading,
                "Begin reading NIC symbols",
            )),
            (NicState::Reading, Lookahead::End, _) => Some(match digits {
                NEW_FORMAT_DIGITS => Rule::keep(
                    NicState::Accept,
                    "Stack depth 12 (New Format). Accepted.",
                ),
                OLD_FORMAT_DIGITS => Self::reject(
                    NicReject::MissingSuffix,
                    "9 digits but missing V/X suffix".to_string(),
                ),
                _ => Self::reject(
                    NicReject::WrongLength { digits },
                    format!("Invalid length: {} digits", digits),
                ),
            }),
            (NicState::SuffixCheck, _, Top::Symbol(NicSymbol::Digit)) => Some(Rule::pop(
                NicState::SuffixCheck,
                "Popping stack (Old Format Validation)",
            )),
            (NicState::SuffixCheck, Lookahead::End, Top::Bottom) => {
                Some(Rule::keep(NicState::Accept, "Stack empty. Accepted."))
            }
            (NicState::SuffixCheck, Lookahead::Symbol(c), Top::Bottom) => Some(Self::reject(
                NicReject::TrailingInput(c),
                format!("Unexpected \"{}\" after suffix", c),
            )),
            _ => None,
        }
    }
}

/// NIC layout, decided after acceptance from the input length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NicFormat {
    #[serde(rename = "Old Format")]
    Old,
    #[serde(rename = "New Format")]
    New,
}

impl NicFormat {
    /// Format for an accepted input of `len` characters.
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            10 => Some(NicFormat::Old),
            12 => Some(NicFormat::New),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NicFormat::Old => "Old Format",
            NicFormat::New => "New Format",
        }
    }
}

impl fmt::Display for NicFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Informational fields encoded in an accepted NIC. Never used to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicDetails {
    pub birth_year: u16,
    /// Day-of-year digits with the female offset removed. Not range-checked.
    pub day_of_year: u16,
    pub gender: Gender,
}

/// Female day-of-year values carry this offset.
const FEMALE_DAY_OFFSET: u16 = 500;

impl NicDetails {
    /// Decodes an accepted NIC. Returns `None` if `nic` is not of `format`.
    pub fn decode(nic: &str, format: NicFormat) -> Option<Self> {
        let digits = nic.as_bytes();
        let (birth_year, day_start) = match format {
            NicFormat::Old => (1900 + parse_digits(digits.get(0..2)?)?, 2),
            NicFormat::New => (parse_digits(digits.get(0..4)?)?, 4),
        };
        let raw_day = parse_digits(digits.get(day_start..day_start + 3)?)?;
        let (day_of_year, gender) = if raw_day > FEMALE_DAY_OFFSET {
            (raw_day - FEMALE_DAY_OFFSET, Gender::Female)
        } else {
            (raw_day, Gender::Male)
        };

        Some(Self {
            birth_year,
            day_of_year,
            gender,
        })
    }
}

fn parse_digits(bytes: &[u8]) -> Option<u16> {
    bytes.iter().try_fold(0u16, |acc, b| {
        b.is_ascii_digit().then(|| acc * 10 + u16::from(b - b'0'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Halt, PdaEngine};

    fn run(input: &str) -> crate::engine::Run<NicState, NicSymbol> {
        PdaEngine::new().run(&NicAutomaton, input)
    }

    #[test]
    fn test_old_format_accepts_and_drains() {
        let run = run("951234567V");
        assert_eq!(run.halt, Halt::Accepted);
        assert_eq!(run.consumed, 10);
        // start, begin, 9 pushes, suffix, 9 pops, accept
        assert_eq!(run.trace.len(), 22);
        assert_eq!(run.trace.last().unwrap().stack, vec!["Z0"]);

        let suffix = &run.trace.steps()[11];
        assert_eq!(suffix.state, "q2");
        assert_eq!(suffix.depth(), 10);
    }

    #[test]
    fn test_new_format_accepts_at_depth_13() {
        let run = run("199512345678");
        assert_eq!(run.halt, Halt::Accepted);
        let last = run.trace.last().unwrap();
        assert_eq!(last.state, "q_accept");
        assert_eq!(last.depth(), 13);
    }

    #[test]
    fn test_lowercase_suffix_read_by_automaton() {
        assert!(run("951234567x").accepted());
    }

    #[test]
    fn test_missing_suffix() {
        let run = run("123456789");
        assert_eq!(run.state, NicState::Reject(NicReject::MissingSuffix));
    }

    #[test]
    fn test_wrong_lengths() {
        assert_eq!(
            run("12345678").state,
            NicState::Reject(NicReject::WrongLength { digits: 8 })
        );
        assert_eq!(
            run("12345678901").state,
            NicState::Reject(NicReject::WrongLength { digits: 11 })
        );
        assert_eq!(
            run("").state,
            NicState::Reject(NicReject::WrongLength { digits: 0 })
        );
    }

    #[test]
    fn test_thirteenth_digit() {
        assert_eq!(
            run("1234567890123").state,
            NicState::Reject(NicReject::TooManyDigits)
        );
    }

    #[test]
    fn test_misplaced_and_trailing_suffix() {
        assert_eq!(
            run("12345V").state,
            NicState::Reject(NicReject::MisplacedSuffix { digits: 5 })
        );
        assert_eq!(
            run("123456789VX").state,
            NicState::Reject(NicReject::TrailingInput('X'))
        );
        assert_eq!(
            run("1234567890V").state,
            NicState::Reject(NicReject::MisplacedSuffix { digits: 10 })
        );
    }

    #[test]
    fn test_invalid_character() {
        let run = run("9512A4567V");
        assert_eq!(run.state, NicState::Reject(NicReject::InvalidCharacter('A')));
        assert_eq!(run.consumed, 5);
        assert_eq!(run.trace.last().unwrap().depth(), 5);
    }

    #[test]
    fn test_reject_messages_are_distinct() {
        let reasons = [
            NicReject::InvalidCharacter('A'),
            NicReject::MisplacedSuffix { digits: 5 },
            NicReject::TrailingInput('X'),
            NicReject::MissingSuffix,
            NicReject::WrongLength { digits: 8 },
            NicReject::TooManyDigits,
        ];
        let messages: std::collections::HashSet<_> =
            reasons.iter().map(|r| r.message()).collect();
        assert_eq!(messages.len(), reasons.len());
        assert_eq!(
            NicReject::InvalidCharacter('A').kind(),
            RejectKind::MalformedInput
        );
        assert_eq!(NicReject::MissingSuffix.kind(), RejectKind::StructuralMismatch);
    }

    #[test]
    fn test_format_serialization() {
        assert_eq!(
            serde_json::to_string(&NicFormat::Old).unwrap(),
            "\"Old Format\""
        );
        assert_eq!(NicFormat::from_len(12), Some(NicFormat::New));
        assert_eq!(NicFormat::from_len(11), None);
    }

    #[test]
    fn test_decode_details() {
        let old = NicDetails::decode("951234567V", NicFormat::Old).unwrap();
        assert_eq!(old.birth_year, 1995);
        assert_eq!(old.day_of_year, 123);
        assert_eq!(old.gender, Gender::Male);

        let new = NicDetails::decode("199562345678", NicFormat::New).unwrap();
        assert_eq!(new.birth_year, 1995);
        assert_eq!(new.day_of_year, 123);
        assert_eq!(new.gender, Gender::Female);

        assert!(NicDetails::decode("95", NicFormat::Old).is_none());
    }
}
