//! PDA engine - drives an automaton over an input and records the trace.

use crate::definition::{Automaton, ControlState, Lookahead, Phase, StackEffect, BOTTOM_MARKER};
use crate::error::EngineFault;
use crate::trace::{ExecutionStep, Trace};
use std::fmt;

/// Extra transitions allowed on top of `2 * (input length + 1)`.
pub const DEFAULT_STEP_SLACK: usize = 8;

/// What the top of the stack holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Top<S> {
    Bottom,
    Symbol(S),
}

/// The automaton stack. The bottom marker is implicit: it is always present,
/// always at the bottom, and cannot be popped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack<S> {
    data: Vec<S>,
}

impl<S: Copy> Stack<S> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Depth including the bottom marker.
    pub fn depth(&self) -> usize {
        self.data.len() + 1
    }

    /// Number of data symbols above the bottom marker.
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    pub fn top(&self) -> Top<S> {
        match self.data.last() {
            Some(s) => Top::Symbol(*s),
            None => Top::Bottom,
        }
    }

    /// Data symbols, bottom first.
    pub fn data(&self) -> &[S] {
        &self.data
    }

    fn push(&mut self, symbol: S) {
        self.data.push(symbol);
    }

    fn pop(&mut self) -> Option<S> {
        self.data.pop()
    }
}

impl<S: Copy + fmt::Display> Stack<S> {
    /// Stack labels, bottom first, starting with the bottom marker.
    pub fn snapshot(&self) -> Vec<String> {
        std::iter::once(BOTTOM_MARKER.to_string())
            .chain(self.data.iter().map(|s| s.to_string()))
            .collect()
    }
}

impl<S: Copy> Default for Stack<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    Accepted,
    Rejected,
    /// Forced rejection because of a transition-table defect.
    Fault(EngineFault),
}

/// Terminal configuration and trace of one run.
#[derive(Debug, Clone)]
pub struct Run<Q, S> {
    pub state: Q,
    pub halt: Halt,
    pub stack: Stack<S>,
    pub trace: Trace,
    /// Input symbols consumed.
    pub consumed: usize,
    /// Transitions fired, not counting the initial trace entry.
    pub transitions: usize,
}

impl<Q, S> Run<Q, S> {
    pub fn accepted(&self) -> bool {
        self.halt == Halt::Accepted
    }

    pub fn fault(&self) -> Option<&EngineFault> {
        match &self.halt {
            Halt::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Generic simulate-and-trace driver. Holds no state between runs.
#[derive(Debug, Clone, Copy)]
pub struct PdaEngine {
    step_slack: usize,
}

impl Default for PdaEngine {
    fn default() -> Self {
        Self {
            step_slack: DEFAULT_STEP_SLACK,
        }
    }
}

impl PdaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of transitions allowed beyond `2 * (input length + 1)`.
    pub fn with_step_slack(mut self, slack: usize) -> Self {
        self.step_slack = slack;
        self
    }

    /// Maximum transitions for an input of `input_len` symbols.
    pub fn step_limit(&self, input_len: usize) -> usize {
        2 * (input_len + 1) + self.step_slack
    }

    /// Runs `automaton` over `input` until it reaches a terminal state.
    pub fn run<A: Automaton>(&self, automaton: &A, input: &str) -> Run<A::State, A::Symbol> {
        let symbols: Vec<char> = input.chars().collect();
        let limit = self.step_limit(symbols.len());

        let mut state = automaton.start();
        let mut stack = Stack::new();
        let mut trace = Trace::with_capacity(symbols.len() * 2 + 4);
        let mut cursor = 0;
        let mut transitions = 0;

        trace.record(ExecutionStep::new(
            state.label(),
            format!("Starting validation for: {}", input),
            stack.snapshot(),
        ));

        let halt = loop {
            match state.phase() {
                Phase::Accepted => break Halt::Accepted,
                Phase::Rejected => break Halt::Rejected,
                Phase::Running => {}
            }

            if transitions >= limit {
                let fault = EngineFault::StepLimitExceeded {
                    state: state.label(),
                    limit,
                };
                break force_fault(automaton, &mut state, &stack, &mut trace, fault);
            }

            let lookahead = match symbols.get(cursor) {
                Some(c) => Lookahead::Symbol(*c),
                None => Lookahead::End,
            };

            let consuming = match lookahead {
                Lookahead::Symbol(c) => automaton.read(state, c, &stack),
                Lookahead::End => None,
            };
            let consumes = consuming.is_some();
            let rule = match consuming.or_else(|| automaton.epsilon(state, lookahead, &stack)) {
                Some(rule) => rule,
                None => {
                    let fault = EngineFault::NoRule {
                        state: state.label(),
                        lookahead: lookahead.to_string(),
                    };
                    break force_fault(automaton, &mut state, &stack, &mut trace, fault);
                }
            };

            match rule.effect {
                StackEffect::Push(symbol) => stack.push(symbol),
                StackEffect::Pop => {
                    if stack.pop().is_none() {
                        let fault = EngineFault::PopBottom {
                            state: state.label(),
                        };
                        break force_fault(automaton, &mut state, &stack, &mut trace, fault);
                    }
                }
                StackEffect::Keep => {}
            }

            if consumes {
                cursor += 1;
            }
            transitions += 1;
            state = rule.next;
            trace.record(ExecutionStep::new(
                state.label(),
                rule.action,
                stack.snapshot(),
            ));
        };

        tracing::debug!(
            automaton = automaton.name(),
            state = state.label(),
            transitions,
            consumed = cursor,
            "run finished: {:?}",
            halt
        );

        Run {
            state,
            halt,
            stack,
            trace,
            consumed: cursor,
            transitions,
        }
    }
}

/// Moves the run to the automaton's fault state and records why.
fn force_fault<A: Automaton>(
    automaton: &A,
    state: &mut A::State,
    stack: &Stack<A::Symbol>,
    trace: &mut Trace,
    fault: EngineFault,
) -> Halt {
    tracing::error!(
        automaton = automaton.name(),
        state = state.label(),
        "transition table defect: {}",
        fault
    );
    *state = automaton.fault_state();
    trace.record(ExecutionStep::new(
        state.label(),
        format!("internal error: {}", fault),
        stack.snapshot(),
    ));
    Halt::Fault(fault)
}
