//! CSV output backend.
//!
//! Creates three files in the output directory:
//! - `decisions.csv`
//! - `goal_probabilities.csv`
//! - `agent_states.csv`

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{AgentStateRow, DecisionRow, GoalProbabilityRow, OutputResult};

pub const DECISION_HEADER: [&str; 8] =
    ["frame", "time_secs", "agent_id", "action", "mean_reward", "visits", "fallback", "simulated_agents"];
pub const GOAL_PROBABILITY_HEADER: [&str; 7] =
    ["frame", "agent_id", "goal_index", "probability", "existence", "tracking", "reconcile"];
pub const AGENT_STATE_HEADER: [&str; 8] = ["frame", "time_secs", "agent_id", "x", "y", "vx", "vy", "heading"];

/// Writes run output to three CSV files.
pub struct CsvWriter {
    decisions: Writer<File>,
    goals:     Writer<File>,
    states:    Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open the three files and write their headers.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let mut decisions = Writer::from_path(dir.join("decisions.csv"))?;
        decisions.write_record(DECISION_HEADER)?;

        let mut goals = Writer::from_path(dir.join("goal_probabilities.csv"))?;
        goals.write_record(GOAL_PROBABILITY_HEADER)?;

        let mut states = Writer::from_path(dir.join("agent_states.csv"))?;
        states.write_record(AGENT_STATE_HEADER)?;

        Ok(Self { decisions, goals, states, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_decision(&mut self, row: &DecisionRow) -> OutputResult<()> {
        self.decisions.write_record(&[
            row.frame.to_string(),
            row.time_secs.to_string(),
            row.agent_id.to_string(),
            row.action.clone(),
            row.mean_reward.to_string(),
            row.visits.to_string(),
            (row.fallback as u8).to_string(),
            row.simulated_agents.to_string(),
        ])?;
        Ok(())
    }

    fn write_goal_probabilities(&mut self, rows: &[GoalProbabilityRow]) -> OutputResult<()> {
        for row in rows {
            self.goals.write_record(&[
                row.frame.to_string(),
                row.agent_id.to_string(),
                row.goal_index.to_string(),
                row.probability.to_string(),
                row.existence.to_string(),
                row.tracking.to_string(),
                row.reconcile.unwrap_or("").to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_agent_states(&mut self, rows: &[AgentStateRow]) -> OutputResult<()> {
        for row in rows {
            self.states.write_record(&[
                row.frame.to_string(),
                row.time_secs.to_string(),
                row.agent_id.to_string(),
                row.x.to_string(),
                row.y.to_string(),
                row.vx.to_string(),
                row.vy.to_string(),
                row.heading.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.decisions.flush()?;
        self.goals.flush()?;
        self.states.flush()?;
        Ok(())
    }
}
