//! Automaton definition types.
//!
//! An automaton is a finite control plus one stack. Each concrete automaton
//! describes its control states as an enum and supplies two rule functions:
//!
//! - [`Automaton::read`]: the input-consuming rule for `(state, symbol, stack)`
//! - [`Automaton::epsilon`]: the ε-rule for `(state, lookahead, stack)`
//!
//! The engine always tries `read` first and falls back to `epsilon` only when no
//! consuming rule applies.

use crate::engine::Stack;
use std::borrow::Cow;
use std::fmt;

/// Label of the bottom-of-stack marker in trace snapshots.
pub const BOTTOM_MARKER: &str = "Z0";

/// Whether a control state is still running or has terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Accepted,
    Rejected,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::Running)
    }
}

/// A control state of an automaton.
pub trait ControlState: Copy + Eq + fmt::Debug {
    /// Trace label, e.g. `q1` or `q_accept`.
    fn label(&self) -> &'static str;

    fn phase(&self) -> Phase;
}

/// Effect of a transition on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEffect<S> {
    Push(S),
    Pop,
    Keep,
}

/// What the ε-rule sees of the unread input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookahead {
    Symbol(char),
    End,
}

impl fmt::Display for Lookahead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookahead::Symbol(c) => write!(f, "'{}'", c),
            Lookahead::End => f.write_str("end of input"),
        }
    }
}

/// A fired transition: next state, stack effect and a description for the trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<Q, S> {
    pub next: Q,
    pub effect: StackEffect<S>,
    pub action: Cow<'static, str>,
}

impl<Q, S> Rule<Q, S> {
    pub fn new(next: Q, effect: StackEffect<S>, action: impl Into<Cow<'static, str>>) -> Self {
        Self {
            next,
            effect,
            action: action.into(),
        }
    }

    pub fn push(next: Q, symbol: S, action: impl Into<Cow<'static, str>>) -> Self {
        Self::new(next, StackEffect::Push(symbol), action)
    }

    pub fn pop(next: Q, action: impl Into<Cow<'static, str>>) -> Self {
        Self::new(next, StackEffect::Pop, action)
    }

    pub fn keep(next: Q, action: impl Into<Cow<'static, str>>) -> Self {
        Self::new(next, StackEffect::Keep, action)
    }
}

/// A pushdown automaton the engine can drive.
pub trait Automaton {
    type State: ControlState;
    type Symbol: Copy + Eq + fmt::Debug + fmt::Display;

    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    fn start(&self) -> Self::State;

    /// State entered when the engine has to stop a run on a table defect.
    fn fault_state(&self) -> Self::State;

    /// Consuming rule for `symbol` in `state`, if one exists.
    fn read(
        &self,
        state: Self::State,
        symbol: char,
        stack: &Stack<Self::Symbol>,
    ) -> Option<Rule<Self::State, Self::Symbol>>;

    /// ε-rule for `state`, if one exists.
    fn epsilon(
        &self,
        state: Self::State,
        lookahead: Lookahead,
        stack: &Stack<Self::Symbol>,
    ) -> Option<Rule<Self::State, Self::Symbol>>;
}
