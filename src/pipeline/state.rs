// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 shipflow contributors

//! Driver state
//!
//! The stage sequence is fixed; [`StageState::next`] is the single source of
//! truth for the transition table. [`PipelineState`] is the only mutable state
//! in the system and is owned exclusively by the driver.

use std::collections::HashMap;

/// Stages of the pipeline state machine, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageState {
    Planning,
    Building,
    Testing,
    Monitoring,
    SecurityScan,
    Deploying,
    Done,
    Aborted,
}

impl StageState {
    /// The next state in the fixed sequence
    pub fn next(self) -> StageState {
        match self {
            Self::Planning => Self::Building,
            Self::Building => Self::Testing,
            Self::Testing => Self::Monitoring,
            Self::Monitoring => Self::SecurityScan,
            Self::SecurityScan => Self::Deploying,
            Self::Deploying => Self::Done,
            Self::Done => Self::Done,
            Self::Aborted => Self::Aborted,
        }
    }

    /// Stage name used in logs, errors, and command labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::Planning => "plan",
            Self::Building => "build",
            Self::Testing => "test",
            Self::Monitoring => "monitor",
            Self::SecurityScan => "scan",
            Self::Deploying => "deploy",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    /// Whether this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable driver state, discarded at process exit
#[derive(Debug)]
pub struct PipelineState {
    /// Current stage
    pub current: StageState,

    /// Attempt count per stage
    attempts: HashMap<StageState, u32>,

    /// Whether the test stage passed within its retry budget
    pub tests_passed: bool,

    /// Whether the security scan passed (or was skipped)
    pub scan_passed: bool,

    /// Failed attempts across all stages
    pub failure_count: u32,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            current: StageState::Planning,
            attempts: HashMap::new(),
            tests_passed: false,
            scan_passed: false,
            failure_count: 0,
        }
    }

    /// Record one attempt of the given stage; returns the running total
    pub fn record_attempt(&mut self, stage: StageState) -> u32 {
        let count = self.attempts.entry(stage).or_insert(0);
        *count += 1;
        *count
    }

    /// Attempts made so far for a stage
    pub fn attempts(&self, stage: StageState) -> u32 {
        self.attempts.get(&stage).copied().unwrap_or(0)
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    /// Move to the next stage in the sequence
    pub fn advance(&mut self) {
        self.current = self.current.next();
    }

    /// Enter the terminal aborted state
    pub fn abort(&mut self) {
        self.current = StageState::Aborted;
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_order_is_fixed() {
        let mut stage = StageState::Planning;
        let expected = [
            StageState::Building,
            StageState::Testing,
            StageState::Monitoring,
            StageState::SecurityScan,
            StageState::Deploying,
            StageState::Done,
        ];

        for want in expected {
            stage = stage.next();
            assert_eq!(stage, want);
        }

        // Terminal states are absorbing
        assert_eq!(StageState::Done.next(), StageState::Done);
        assert_eq!(StageState::Aborted.next(), StageState::Aborted);
    }

    #[test]
    fn test_attempt_counts_are_per_stage() {
        let mut state = PipelineState::new();

        assert_eq!(state.record_attempt(StageState::Building), 1);
        assert_eq!(state.record_attempt(StageState::Building), 2);
        assert_eq!(state.record_attempt(StageState::Testing), 1);

        assert_eq!(state.attempts(StageState::Building), 2);
        assert_eq!(state.attempts(StageState::Planning), 0);
    }

    #[test]
    fn test_abort_is_terminal() {
        let mut state = PipelineState::new();
        state.abort();

        assert_eq!(state.current, StageState::Aborted);
        assert!(state.current.is_terminal());
        state.advance();
        assert_eq!(state.current, StageState::Aborted);
    }
}
