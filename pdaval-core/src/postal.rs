//! Postal code automaton.
//!
//! Formal definition:
//! - Σ: {0-9}
//! - Γ: {0-9, Z0}, the literal digit is pushed
//! - Q: {q0, q1, q2, q3, q4, q_accept, q_reject}
//!
//! ```text
//! δ(q0, ε, Z0)  = (q1, Z0)
//! δ(q1, d, γ)   = (q1, dγ)         fewer than 5 digits on the stack
//! δ(q1, ε, γ)   = (q2, γ)          no consuming rule applies
//! δ(q2, ε, γ)   = (q3, γ)          end of input, exactly 5 digits
//! δ(q3, ε, γ)   = (q4, γ)          stack digits fall in a district range
//! δ(q4, ε, d)   = (q4, ε)
//! δ(q4, ε, Z0)  = (q_accept, Z0)
//! ```
//!
//! The district lookup in `q3` is only reached once the 5-digit shape has been
//! verified. It reads the digits back off the stack, bottom first.

use crate::definition::{Automaton, ControlState, Lookahead, Phase, Rule};
use crate::district::DistrictTable;
use crate::engine::{Stack, Top};
use crate::error::RejectKind;
use std::fmt;

/// Digits in a postal code.
pub const POSTAL_DIGITS: usize = 5;

/// Longest input the postal automaton is ever given.
pub const MAX_POSTAL_LEN: usize = 5;

/// Why the postal automaton rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostalReject {
    NonDigit(char),
    TooFewDigits { digits: usize },
    TooManyDigits,
    /// Five digits that no district range contains.
    RangeMiss { code: u32 },
    /// The engine stopped the run on a transition-table defect.
    EngineFault,
}

impl PostalReject {
    pub fn kind(&self) -> RejectKind {
        match self {
            PostalReject::NonDigit(_) => RejectKind::MalformedInput,
            PostalReject::TooFewDigits { .. } | PostalReject::TooManyDigits => {
                RejectKind::StructuralMismatch
            }
            PostalReject::RangeMiss { .. } => RejectKind::RangeMiss,
            PostalReject::EngineFault => RejectKind::EngineFault,
        }
    }

    pub fn message(&self) -> String {
        match self {
            PostalReject::NonDigit(c) => {
                format!("Postal code must contain only digits (found '{}')", c)
            }
            PostalReject::TooFewDigits { digits } => {
                format!("Postal code must be exactly 5 digits (found {})", digits)
            }
            PostalReject::TooManyDigits => {
                "Postal code must be exactly 5 digits (found more than 5)".to_string()
            }
            PostalReject::RangeMiss { code } => format!(
                "Invalid postal code or district range: {:05} is not in any district range",
                code
            ),
            PostalReject::EngineFault => "internal error: postal automaton halted".to_string(),
        }
    }
}

/// Control states of the postal automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostalState {
    Start,
    Reading,
    CountCheck,
    Lookup,
    /// Draining the stack after a district matched. Holds the table index.
    Unwind { district: usize },
    Accept { district: usize },
    Reject(PostalReject),
}

impl ControlState for PostalState {
    fn label(&self) -> &'static str {
        match self {
            PostalState::Start => "q0",
            PostalState::Reading => "q1",
            PostalState::CountCheck => "q2",
            PostalState::Lookup => "q3",
            PostalState::Unwind { .. } => "q4",
            PostalState::Accept { .. } => "q_accept",
            PostalState::Reject(_) => "q_reject",
        }
    }

    fn phase(&self) -> Phase {
        match self {
            PostalState::Accept { .. } => Phase::Accepted,
            PostalState::Reject(_) => Phase::Rejected,
            _ => Phase::Running,
        }
    }
}

/// Stack alphabet: the literal digit read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostalSymbol(pub u8);

impl fmt::Display for PostalSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Postal automaton bound to a district table.
#[derive(Debug, Clone, Copy)]
pub struct PostalAutomaton<'t> {
    table: &'t DistrictTable,
}

impl<'t> PostalAutomaton<'t> {
    pub fn new(table: &'t DistrictTable) -> Self {
        Self { table }
    }

    fn reject(reason: PostalReject, action: String) -> Rule<PostalState, PostalSymbol> {
        Rule::keep(PostalState::Reject(reason), action)
    }

    fn lookup(&self, stack: &Stack<PostalSymbol>) -> Rule<PostalState, PostalSymbol> {
        let code = stack
            .data()
            .iter()
            .fold(0u32, |acc, PostalSymbol(d)| acc * 10 + u32::from(*d));

        match self.table.lookup(code) {
            Some(m) => Rule::keep(
                PostalState::Unwind { district: m.index },
                format!(
                    "Code {:05} in range {}-{} of {}",
                    code, m.range.0, m.range.1, m.entry.name
                ),
            ),
            None => Self::reject(
                PostalReject::RangeMiss { code },
                format!("Postal code {:05} not in valid district range", code),
            ),
        }
    }

    fn district_name(&self, index: usize) -> &str {
        self.table
            .entries()
            .get(index)
            .map(|e| e.name.as_str())
            .unwrap_or("?")
    }
}

impl Automaton for PostalAutomaton<'_> {
    type State = PostalState;
    type Symbol = PostalSymbol;

    fn name(&self) -> &'static str {
        "postal"
    }

    fn start(&self) -> PostalState {
        PostalState::Start
    }

    fn fault_state(&self) -> PostalState {
        PostalState::Reject(PostalReject::EngineFault)
    }

    fn read(
        &self,
        state: PostalState,
        symbol: char,
        stack: &Stack<PostalSymbol>,
    ) -> Option<Rule<PostalState, PostalSymbol>> {
        match (state, symbol.to_digit(10)) {
            (PostalState::Reading, Some(d)) if stack.data_len() < POSTAL_DIGITS => Some(Rule::push(
                PostalState::Reading,
                PostalSymbol(d as u8),
                format!("Pushed digit \"{}\" onto stack", symbol),
            )),
            _ => None,
        }
    }

    fn epsilon(
        &self,
        state: PostalState,
        lookahead: Lookahead,
        stack: &Stack<PostalSymbol>,
    ) -> Option<Rule<PostalState, PostalSymbol>> {
        let digits = stack.data_len();
        match (state, lookahead) {
            (PostalState::Start, _) => Some(Rule::keep(
                PostalState::Reading,
                "Begin reading postal code digits",
            )),
            (PostalState::Reading, Lookahead::End) => Some(Rule::keep(
                PostalState::CountCheck,
                format!("Input exhausted after {} digits, verifying count", digits),
            )),
            (PostalState::Reading, Lookahead::Symbol(c)) => Some(Rule::keep(
                PostalState::CountCheck,
                format!("Stopped reading at \"{}\", verifying count", c),
            )),
            (PostalState::CountCheck, Lookahead::Symbol(c)) if c.is_ascii_digit() => {
                Some(Self::reject(
                    PostalReject::TooManyDigits,
                    format!("Extra digit \"{}\" after {} digits", c, digits),
                ))
            }
            (PostalState::CountCheck, Lookahead::Symbol(c)) => Some(Self::reject(
                PostalReject::NonDigit(c),
                format!("Contains non-digit character \"{}\"", c),
            )),
            (PostalState::CountCheck, Lookahead::End) => Some(if digits == POSTAL_DIGITS {
                Rule::keep(PostalState::Lookup, "Length validation passed (5 digits)")
            } else {
                Self::reject(
                    PostalReject::TooFewDigits { digits },
                    format!("Invalid length: {} (expected 5)", digits),
                )
            }),
            (PostalState::Lookup, _) => Some(self.lookup(stack)),
            (PostalState::Unwind { district }, _) => Some(match stack.top() {
                Top::Symbol(d) => Rule::pop(
                    PostalState::Unwind { district },
                    format!("Popped \"{}\" from stack", d),
                ),
                Top::Bottom => Rule::keep(
                    PostalState::Accept { district },
                    format!("Valid postal code for {}", self.district_name(district)),
                ),
            }),
            (PostalState::Accept { .. } | PostalState::Reject(_), _) => None,
        }
    }
}
