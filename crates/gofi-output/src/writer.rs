//! The `OutputWriter` trait implemented by all backend writers.

use crate::{AgentStateRow, DecisionRow, GoalProbabilityRow, OutputResult};

/// Trait implemented by the CSV and SQLite writers.
///
/// Errors surface through [`SimOutputObserver::take_error`][crate::SimOutputObserver::take_error]
/// when driven by the observer.
pub trait OutputWriter {
    /// Write one committed decision.
    fn write_decision(&mut self, row: &DecisionRow) -> OutputResult<()>;

    /// Write a batch of goal probabilities.
    fn write_goal_probabilities(&mut self, rows: &[GoalProbabilityRow]) -> OutputResult<()>;

    /// Write a batch of agent states.
    fn write_agent_states(&mut self, rows: &[AgentStateRow]) -> OutputResult<()>;

    /// Flush and close all underlying handles.  Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
