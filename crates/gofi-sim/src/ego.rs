//! The agent decision loop.
//!
//! # One frame of the ego
//!
//! ```text
//! observation ─▶ BeliefTable::update
//!   Stopped                      → hold, no planning
//!   stop_goals && in goal box    → Stopped
//!   replan due                   → MctsPlanner::plan → commit action
//!      NoViableAction / UnreachableGoal → commit Stop (fallback)
//! follow the committed trajectory to the next frame
//! ```
//!
//! Replanning is due every `round(t_update · fps)` frames, or earlier when
//! the committed trajectory has been driven to its end.

use tracing::{info, warn};

use gofi_core::{AgentId, AgentState, BoundingBox, Frame, Vec2};
use gofi_map::RoadMap;
use gofi_motion::{CostEvaluator, CostFactors, MacroAction, MacroActionConfig, MacroActionLibrary, Trajectory};
use gofi_planner::{MctsConfig, MctsPlanner, PlanDiagnostics, PlanError, PlanRequest, SimulatedAgentRecord};
use gofi_recognition::{
    BeliefTable, GoalRecognitionConfig, Observation, RecognitionContext, ReconcileOutcome,
};
use gofi_scenario::{AgentDescriptor, ScenarioFile};

use crate::{SimError, SimResult};

/// Driving state of the ego.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EgoStatus {
    Driving,
    /// Reached its goal with `stop_goals` set.  Terminal.
    Stopped,
}

/// The macro-action the ego committed to at one planning call.
#[derive(Clone, Debug)]
pub struct Decision {
    pub frame:       Frame,
    pub agent:       AgentId,
    pub action:      MacroAction,
    pub trajectory:  Trajectory,
    pub mean_reward: f64,
    pub visits:      u32,
    /// The planner produced no action and `Stop` was committed instead.
    pub fallback:    bool,
    /// Non-ego agents every rollout of this call simulated.
    pub simulated:   Vec<SimulatedAgentRecord>,
    pub diagnostics: Option<PlanDiagnostics>,
}

/// Everything the ego produced in one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    pub reconciled: Vec<(AgentId, ReconcileOutcome)>,
    pub decision:   Option<Decision>,
}

#[derive(Clone, Debug)]
struct Commitment {
    frame:      Frame,
    trajectory: Trajectory,
}

/// The planning agent.  Owns the only cross-frame belief state.
pub struct EgoAgent {
    pub id:       AgentId,
    pub goal:     BoundingBox,
    length:       f64,
    width:        f64,
    library:      MacroActionLibrary,
    cost_factors: CostFactors,
    mcts:         MctsConfig,
    recognition:  GoalRecognitionConfig,
    view_radius:  f64,
    stop_goals:   bool,
    seed:         u64,
    fps:          u32,
    beliefs:      BeliefTable,
    status:       EgoStatus,
    committed:    Option<Commitment>,
}

impl EgoAgent {
    pub fn new(desc: &AgentDescriptor, scenario: &ScenarioFile) -> SimResult<Self> {
        let goal = desc
            .primary_goal()
            .ok_or_else(|| SimError::Config(format!("ego {} has no goal", desc.id)))?;
        let cfg = &scenario.scenario;
        let library =
            MacroActionLibrary::new(MacroActionConfig::default(), desc.velocity_smoother.clone(), cfg.max_speed, cfg.fps);
        let beliefs = BeliefTable::new(desc.id, scenario.tracked_agents(desc.id), &desc.goal_recognition);
        Ok(Self {
            id: desc.id,
            goal,
            length: desc.length(),
            width: desc.width(),
            library,
            cost_factors: desc.cost_factors.clone(),
            mcts: desc.mcts.clone(),
            recognition: desc.goal_recognition.clone(),
            view_radius: desc.view_radius,
            stop_goals: desc.stop_goals,
            seed: cfg.seed,
            fps: cfg.fps,
            beliefs,
            status: EgoStatus::Driving,
            committed: None,
        })
    }

    pub fn beliefs(&self) -> &BeliefTable {
        &self.beliefs
    }

    pub fn set_record_beliefs(&mut self, record: bool) {
        self.beliefs.record_history = record;
    }

    pub fn status(&self) -> EgoStatus {
        self.status
    }

    pub fn view_radius(&self) -> f64 {
        self.view_radius
    }

    pub fn mcts(&self) -> &MctsConfig {
        &self.mcts
    }

    /// Frames between scheduled planning calls.
    pub fn replan_interval(&self) -> u64 {
        ((self.mcts.t_update * self.fps as f64).round() as u64).max(1)
    }

    fn dt(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Whether a planning call is due at `frame`.
    pub fn replan_due(&self, frame: Frame) -> bool {
        match &self.committed {
            None => true,
            Some(c) => {
                let elapsed = frame.since(c.frame);
                elapsed >= self.replan_interval() || elapsed as f64 * self.dt() >= c.trajectory.duration()
            }
        }
    }

    /// Run one frame of the decision loop from the ego's true `state`.
    pub fn step(
        &mut self,
        map:       &RoadMap,
        evaluator: &CostEvaluator,
        frame:     Frame,
        state:     &AgentState,
        obs:       &Observation,
    ) -> SimResult<FrameOutput> {
        let ctx = RecognitionContext {
            map,
            library: &self.library,
            evaluator,
            cost_factors: &self.cost_factors,
            config: &self.recognition,
        };
        let reconciled = self.beliefs.update(&ctx, obs);
        let mut out = FrameOutput { reconciled, decision: None };

        if self.status == EgoStatus::Stopped {
            return Ok(out);
        }
        if self.stop_goals && self.goal.contains(state.position) {
            info!(agent = %self.id, frame = %frame, "goal reached; stopping");
            self.status = EgoStatus::Stopped;
            self.committed = None;
            return Ok(out);
        }
        if !self.replan_due(frame) {
            return Ok(out);
        }

        let decision = self.plan(map, evaluator, frame, state)?;
        self.committed = Some(Commitment { frame, trajectory: decision.trajectory.clone() });
        out.decision = Some(decision);
        Ok(out)
    }

    fn plan(&self, map: &RoadMap, evaluator: &CostEvaluator, frame: Frame, state: &AgentState) -> SimResult<Decision> {
        let predictions = self.beliefs.predictions();
        let planner = MctsPlanner {
            map,
            library: &self.library,
            evaluator,
            config: &self.mcts,
            seed: self.seed,
        };
        let request = PlanRequest {
            agent: self.id,
            frame,
            state: *state,
            length: self.length,
            width: self.width,
            goal: self.goal,
            predictions: &predictions,
            presence: self.beliefs.presence(),
        };
        match planner.plan(&request) {
            Ok(outcome) => {
                info!(
                    agent = %self.id,
                    frame = %frame,
                    action = %outcome.action,
                    mean_reward = outcome.mean_reward,
                    visits = outcome.visits,
                    "decision"
                );
                Ok(Decision {
                    frame,
                    agent: self.id,
                    action: outcome.action,
                    trajectory: outcome.trajectory,
                    mean_reward: outcome.mean_reward,
                    visits: outcome.visits,
                    fallback: false,
                    simulated: outcome.simulated,
                    diagnostics: outcome.diagnostics,
                })
            }
            Err(e @ (PlanError::NoViableAction { .. } | PlanError::UnreachableGoal { .. })) => {
                warn!(agent = %self.id, frame = %frame, error = %e, "planning failed; falling back to Stop");
                Ok(self.fallback(map, frame, state))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fallback(&self, map: &RoadMap, frame: Frame, state: &AgentState) -> Decision {
        let action = MacroAction::Stop { duration: self.mcts.t_update };
        let trajectory = self
            .library
            .expand(map, state, &action)
            .unwrap_or_else(|_| Trajectory::hold(state, self.mcts.t_update, self.dt()));
        Decision {
            frame,
            agent: self.id,
            action,
            trajectory,
            mean_reward: 0.0,
            visits: 0,
            fallback: true,
            simulated: Vec::new(),
            diagnostics: None,
        }
    }

    /// The ego's state at `frame`, following its committed trajectory (its
    /// final sample once driven to the end).  Holds `current` with zero
    /// velocity once stopped or uncommitted.
    pub fn state_at(&self, frame: Frame, current: &AgentState) -> AgentState {
        let held = AgentState { velocity: Vec2::ZERO, ..*current };
        if self.status == EgoStatus::Stopped {
            return held;
        }
        let Some(c) = &self.committed else {
            return held;
        };
        let t = frame.since(c.frame) as f64 * self.dt();
        c.trajectory.state_at(t).unwrap_or(held)
    }
}
