//! `SimOutputObserver<W>`: bridges `SimObserver` to an `OutputWriter`.

use tracing::warn;

use gofi_core::{AgentId, Frame, ScenarioConfig, WorldState};
use gofi_recognition::{GoalProbabilityRecord, ReconcileOutcome};
use gofi_sim::{Decision, SimObserver};

use crate::row::{AgentStateRow, DecisionRow, GoalProbabilityRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes decisions, goal probabilities and agent
/// states to any [`OutputWriter`] backend.
///
/// Errors from the writer are stored because `SimObserver` methods have no
/// return value.  After `sim.run()` returns, check for them with
/// [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:     W,
    fps:        u32,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    /// Create an observer backed by `writer`, using `config.fps` to convert
    /// frames to seconds.
    pub fn new(writer: W, config: &ScenarioConfig) -> Self {
        Self { writer, fps: config.fps.max(1), last_error: None }
    }

    /// Take the first stored write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn secs(&self, frame: Frame) -> f64 {
        frame.0 as f64 / self.fps as f64
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            if self.last_error.is_none() {
                warn!(error = %e, "output write failed");
                self.last_error = Some(e);
            }
        }
    }
}

/// Expand one belief record into a row per candidate goal.
pub fn goal_rows(record: &GoalProbabilityRecord) -> impl Iterator<Item = GoalProbabilityRow> + '_ {
    record.probabilities.iter().enumerate().map(move |(i, &p)| GoalProbabilityRow {
        frame:       record.frame.0,
        agent_id:    record.agent.0,
        goal_index:  i as u32,
        probability: p,
        existence:   record.existence,
        tracking:    record.state.as_str(),
        reconcile:   record.reconcile.as_ref().map(ReconcileOutcome::as_str),
    })
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_frame_start(&mut self, frame: Frame, world: &WorldState) {
        let rows: Vec<AgentStateRow> = world
            .agents
            .iter()
            .map(|(id, s)| AgentStateRow {
                frame:     frame.0,
                time_secs: world.time,
                agent_id:  id.0,
                x:         s.position.x,
                y:         s.position.y,
                vx:        s.velocity.x,
                vy:        s.velocity.y,
                heading:   s.heading,
            })
            .collect();
        let result = self.writer.write_agent_states(&rows);
        self.store_err(result);
    }

    fn on_beliefs(
        &mut self,
        _frame:      Frame,
        records:     &[GoalProbabilityRecord],
        _reconciled: &[(AgentId, ReconcileOutcome)],
    ) {
        let rows: Vec<GoalProbabilityRow> = records.iter().flat_map(goal_rows).collect();
        let result = self.writer.write_goal_probabilities(&rows);
        self.store_err(result);
    }

    fn on_decision(&mut self, decision: &Decision) {
        let row = DecisionRow {
            frame:            decision.frame.0,
            time_secs:        self.secs(decision.frame),
            agent_id:         decision.agent.0,
            action:           decision.action.to_string(),
            mean_reward:      decision.mean_reward,
            visits:           decision.visits,
            fallback:         decision.fallback,
            simulated_agents: decision.simulated.len() as u32,
        };
        let result = self.writer.write_decision(&row);
        self.store_err(result);
    }

    fn on_sim_end(&mut self, _final_frame: Frame) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
