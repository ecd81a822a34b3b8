//! Simulation of one ego macro-action against predicted non-ego motion.
//!
//! Non-ego agents never react to the ego inside a planning call: each
//! follows one motion fixed when the call starts.
//!
//! | Tracking            | Motion                                                   |
//! |---------------------|----------------------------------------------------------|
//! | observed, goal known | optimal plan toward its MAP goal, absent once finished  |
//! | observed, no plan    | `Continue`, absent once finished                        |
//! | occluded             | constant velocity from the belief                       |
//!
//! Occluded agents are never dropped from tree steps: a collision with one
//! is charged at its existence probability.  Each default-policy rollout
//! instead draws one presence factor and simulates only the agents it puts
//! on the road, charging their collisions in full.

use serde::{Deserialize, Serialize};
use tracing::debug;

use gofi_core::{AgentId, AgentState, BoundingBox, GoalId, RolloutRng};
use gofi_map::{LaneRouter, RoadMap};
use gofi_motion::{CostEvaluator, MacroAction, MacroActionLibrary, MotionResult, Trajectory, TrajectoryPoint};
use gofi_recognition::{AgentPrediction, PresenceBelief, goal_plan};

use crate::RewardConfig;

/// How a non-ego agent is simulated.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum SimulationMode {
    MapGoal { goal: GoalId, probability: f64 },
    Continue,
    Extrapolated { existence: f64 },
}

/// Something that ended a simulation early.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum StepEvent {
    /// `existence` is the weight the collision penalty was charged at.
    Collision { agent: AgentId, existence: f64 },
    GoalReached,
    DeadEnd,
}

#[derive(Clone, Debug)]
enum Motion {
    Planned(Trajectory),
    Extrapolated(AgentState),
}

/// A non-ego agent as the rollouts see it.
#[derive(Clone, Debug)]
pub struct SimulatedAgent {
    pub agent:     AgentId,
    pub mode:      SimulationMode,
    pub existence: f64,
    pub length:    f64,
    pub width:     f64,
    motion:        Motion,
}

impl SimulatedAgent {
    /// Build the fixed motion of `prediction`.
    pub fn from_prediction<R: LaneRouter>(
        map:        &RoadMap,
        library:    &MacroActionLibrary<R>,
        prediction: &AgentPrediction,
    ) -> Self {
        let planned = |mode: SimulationMode, plan: &[MacroAction]| {
            library.expand_plan(map, &prediction.state, plan).ok().map(|t| (mode, Motion::Planned(t)))
        };
        let (mode, motion) = if prediction.is_occluded() {
            (SimulationMode::Extrapolated { existence: prediction.existence }, Motion::Extrapolated(prediction.state))
        } else {
            prediction
                .map_goal
                .and_then(|g| {
                    let mode = SimulationMode::MapGoal { goal: g.id, probability: prediction.map_probability };
                    planned(mode, &goal_plan(&g))
                })
                .or_else(|| planned(SimulationMode::Continue, &[MacroAction::Continue]))
                .unwrap_or((
                    SimulationMode::Extrapolated { existence: prediction.existence },
                    Motion::Extrapolated(prediction.state),
                ))
        };
        Self {
            agent: prediction.agent,
            mode,
            existence: prediction.existence,
            length: prediction.length,
            width: prediction.width,
            motion,
        }
    }

    /// State at `t` seconds after the planning call started, `None` once a
    /// planned agent has finished.
    pub fn state_at(&self, t: f64) -> Option<AgentState> {
        match &self.motion {
            Motion::Planned(traj) if t <= traj.duration() + 1e-9 => traj.state_at(t),
            Motion::Planned(_) => None,
            Motion::Extrapolated(s) => Some(s.extrapolate(t)),
        }
    }

    pub fn footprint_at(&self, t: f64) -> Option<BoundingBox> {
        self.state_at(t).map(|s| BoundingBox::new(s.position, self.length, self.width, s.heading))
    }

    /// Motion over `[t0, t0 + duration]` re-based to start at 0.
    fn window(&self, t0: f64, duration: f64, dt: f64) -> Option<Trajectory> {
        let steps = (duration / dt).ceil() as usize;
        let points: Vec<TrajectoryPoint> = (0..=steps)
            .map_while(|k| {
                let t = (k as f64 * dt).min(duration);
                self.state_at(t0 + t).map(|s| TrajectoryPoint {
                    position: s.position,
                    heading:  s.heading,
                    speed:    s.speed(),
                    time:     t,
                })
            })
            .collect();
        (!points.is_empty()).then(|| Trajectory::new(points))
    }
}

/// Outcome of simulating one ego macro-action.
#[derive(Clone, Debug)]
pub struct Step {
    /// Ego motion, cut at a collision or at the goal.
    pub trajectory: Trajectory,
    pub reward:     f64,
    pub event:      Option<StepEvent>,
}

/// Everything one planning call's rollouts read.
pub struct RolloutWorld<'a, R: LaneRouter> {
    pub map:        &'a RoadMap,
    pub library:    &'a MacroActionLibrary<R>,
    pub evaluator:  &'a CostEvaluator,
    pub reward:     &'a RewardConfig,
    pub goal:       BoundingBox,
    pub ego_length: f64,
    pub ego_width:  f64,
    pub agents:     Vec<SimulatedAgent>,
    /// Joint presence of the agents in `agents` that may not exist.
    pub presence:   PresenceBelief,
    /// Ego candidates, in expansion order.
    pub candidates: Vec<MacroAction>,
}

impl<R: LaneRouter> RolloutWorld<'_, R> {
    /// Candidate actions feasible from `state`, in candidate order.
    pub fn feasible(&self, state: &AgentState) -> Vec<(MacroAction, Trajectory)> {
        self.library
            .applicable(self.map, state, &self.candidates)
            .into_iter()
            .map(|(a, t)| (a.clone(), t))
            .collect()
    }

    /// Expand and simulate `action` from `state` at planning time `t0`.
    pub fn step(&self, state: &AgentState, t0: f64, action: &MacroAction) -> MotionResult<Step> {
        let trajectory = self.library.expand(self.map, state, action)?;
        Ok(self.simulate(trajectory, t0))
    }

    /// Draw the agents taking part in one rollout, indexed like `agents`.
    /// Agents outside the presence belief always take part, and no number
    /// is drawn when the belief is empty.
    pub fn sample_presence(&self, rng: &mut RolloutRng) -> Vec<bool> {
        let ids = self.presence.agents();
        if ids.is_empty() {
            return vec![true; self.agents.len()];
        }
        let factor = self.presence.sample(rng.random::<f64>());
        self.agents
            .iter()
            .map(|a| match ids.iter().position(|&id| id == a.agent) {
                Some(k) => factor.is_some_and(|f| f.is_present(k)),
                None => true,
            })
            .collect()
    }

    /// Score an already expanded ego trajectory starting at `t0` against
    /// every agent, collisions weighted by existence.
    pub fn simulate(&self, trajectory: Trajectory, t0: f64) -> Step {
        self.simulate_among(trajectory, t0, None)
    }

    /// Score against the agents drawn present for one rollout.
    pub fn simulate_sampled(&self, trajectory: Trajectory, t0: f64, present: &[bool]) -> Step {
        self.simulate_among(trajectory, t0, Some(present))
    }

    fn simulate_among(&self, trajectory: Trajectory, t0: f64, present: Option<&[bool]>) -> Step {
        let dt = self.evaluator.dt;
        let (cut, event) = self.first_event(&trajectory, t0, dt, present);
        let trajectory = match cut {
            Some(t) => trajectory.truncate_at(t),
            None => trajectory,
        };

        let duration = trajectory.duration();
        let others: Vec<Trajectory> = if self.reward.factors.safety != 0.0 {
            self.taking_part(present).filter_map(|a| a.window(t0, duration, dt)).collect()
        } else {
            Vec::new()
        };
        let refs: Vec<&Trajectory> = others.iter().collect();
        let mut reward = self.evaluator.metrics_against(&trajectory, &refs).weighted(&self.reward.factors);
        reward += match event {
            Some(StepEvent::Collision { existence, .. }) => self.reward.collision * existence,
            Some(StepEvent::GoalReached) => self.reward.goal,
            Some(StepEvent::DeadEnd) => self.reward.dead_end,
            None => 0.0,
        };
        Step { trajectory, reward, event }
    }

    fn taking_part<'s>(&'s self, present: Option<&'s [bool]>) -> impl Iterator<Item = &'s SimulatedAgent> + 's {
        self.agents
            .iter()
            .enumerate()
            .filter(move |(i, _)| present.is_none_or(|p| p.get(*i).copied().unwrap_or(true)))
            .map(|(_, a)| a)
    }

    /// Earliest collision or goal arrival along `trajectory`.  A collision
    /// wins over reaching the goal in the same sample.
    fn first_event(
        &self,
        trajectory: &Trajectory,
        t0:         f64,
        dt:         f64,
        present:    Option<&[bool]>,
    ) -> (Option<f64>, Option<StepEvent>) {
        for p in &trajectory.resample(dt).points {
            let ego = BoundingBox::new(p.position, self.ego_length, self.ego_width, p.heading);
            for agent in self.taking_part(present) {
                let Some(other) = agent.footprint_at(t0 + p.time) else { continue };
                if ego.overlaps(&other) {
                    debug!(agent = %agent.agent, time = t0 + p.time, "rollout collision");
                    let existence = if present.is_some() { 1.0 } else { agent.existence };
                    return (Some(p.time), Some(StepEvent::Collision { agent: agent.agent, existence }));
                }
            }
            if p.time > 0.0 && self.goal.contains(p.position) {
                return (Some(p.time), Some(StepEvent::GoalReached));
            }
        }
        (None, None)
    }
}
