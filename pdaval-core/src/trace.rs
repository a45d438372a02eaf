//! Execution trace of a single run.

use serde::{Deserialize, Serialize};

/// One recorded step: the state after a transition, what was done, and the
/// stack contents (bottom first) after the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub state: String,
    pub action: String,
    pub stack: Vec<String>,
}

impl ExecutionStep {
    pub fn new(state: impl Into<String>, action: impl Into<String>, stack: Vec<String>) -> Self {
        Self {
            state: state.into(),
            action: action.into(),
            stack,
        }
    }

    /// Stack depth including the bottom marker.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Append-only ordered log of execution steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    steps: Vec<ExecutionStep>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            steps: Vec::with_capacity(capacity),
        }
    }

    /// Appends a step. Recorded steps are never modified.
    pub fn record(&mut self, step: ExecutionStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[ExecutionStep] {
        &self.steps
    }

    pub fn first(&self) -> Option<&ExecutionStep> {
        self.steps.first()
    }

    pub fn last(&self) -> Option<&ExecutionStep> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExecutionStep> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a ExecutionStep;
    type IntoIter = std::slice::Iter<'a, ExecutionStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
