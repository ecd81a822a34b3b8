//! Scenario file data model.
//!
//! ```json
//! {
//!   "scenario": { "map_path": "map.json", "max_speed": 10.0, "fps": 20, "seed": 21, "max_steps": 300 },
//!   "agents": [
//!     { "id": 0, "type": "Ego",
//!       "spawn": { "box": { "center": [-31.0, -1.75], "length": 4.5, "width": 1.8 }, "velocity": [8.0, 0.0] },
//!       "goals": [ { "box": { "center": [90.0, -1.75], "length": 5.0, "width": 3.5 } } ],
//!       "mcts": { "t_update": 1.0, "n_simulations": 30, "max_depth": 3 },
//!       "stop_goals": true },
//!     { "id": 2, "type": "Occluded", ...,
//!       "macro_actions": [ { "type": "Stop", "duration": 100.0 } ],
//!       "occlusions": [ { "start_frame": 0, "end_frame": 60, "by_agent": 1 } ] }
//!   ]
//! }
//! ```
//!
//! Every per-agent block other than `id`, `type`, `spawn` and `goals` is
//! optional and falls back to its `Default`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use gofi_core::{AgentId, AgentMetadata, AgentRole, AgentState, BoundingBox, Frame, GoalId, ScenarioConfig, Vec2};
use gofi_motion::{CostFactors, MacroAction, SmootherConfig};
use gofi_planner::MctsConfig;
use gofi_recognition::{Goal, GoalRecognitionConfig, TrackedAgent};

/// Observation range used when an agent does not set `view_radius` (m).
pub const DEFAULT_VIEW_RADIUS: f64 = 100.0;

fn default_view_radius() -> f64 {
    DEFAULT_VIEW_RADIUS
}

// ── Boxes ─────────────────────────────────────────────────────────────────────

/// Initial pose box and velocity vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnDescriptor {
    #[serde(rename = "box")]
    pub region:   BoundingBox,
    pub velocity: Vec2,
}

impl SpawnDescriptor {
    /// Kinematic state at frame 0.  The heading follows the velocity, or the
    /// box heading for an agent spawned at rest.
    pub fn state(&self) -> AgentState {
        let heading = if self.velocity.norm() > 1e-9 { self.velocity.angle() } else { self.region.heading };
        AgentState { position: self.region.center, velocity: self.velocity, heading }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalDescriptor {
    #[serde(rename = "box")]
    pub region: BoundingBox,
}

// ── OcclusionRecord ───────────────────────────────────────────────────────────

/// Half-open frame window `[start_frame, end_frame)` during which the ego
/// cannot observe the agent carrying the record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcclusionRecord {
    pub start_frame: Frame,
    pub end_frame:   Frame,
    pub by_agent:    AgentId,
}

impl OcclusionRecord {
    #[inline]
    pub fn contains(&self, frame: Frame) -> bool {
        self.start_frame <= frame && frame < self.end_frame
    }
}

// ── AgentDescriptor ───────────────────────────────────────────────────────────

/// One entry of the `agents` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id:    AgentId,
    #[serde(rename = "type")]
    pub role:  AgentRole,
    pub spawn: SpawnDescriptor,
    pub goals: Vec<GoalDescriptor>,

    #[serde(default)]
    pub cost_factors:      CostFactors,
    #[serde(default)]
    pub mcts:              MctsConfig,
    #[serde(default)]
    pub goal_recognition:  GoalRecognitionConfig,
    #[serde(default)]
    pub velocity_smoother: SmootherConfig,
    #[serde(default = "default_view_radius")]
    pub view_radius:       f64,
    /// Whether reaching the goal box ends the agent's driving.
    #[serde(default)]
    pub stop_goals:        bool,
    /// Scripted plan of non-ego agents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub macro_actions:     Vec<MacroAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub occlusions:        Vec<OcclusionRecord>,
}

impl AgentDescriptor {
    pub fn length(&self) -> f64 {
        self.spawn.region.length
    }

    pub fn width(&self) -> f64 {
        self.spawn.region.width
    }

    pub fn metadata(&self) -> AgentMetadata {
        AgentMetadata::new(self.length(), self.width(), self.role)
    }

    /// Candidate goals, numbered in file order.
    pub fn candidate_goals(&self) -> Vec<Goal> {
        self.goals.iter().enumerate().map(|(i, g)| Goal::new(GoalId(i as u16), g.region)).collect()
    }

    /// The goal the agent itself drives to: the first listed.
    pub fn primary_goal(&self) -> Option<BoundingBox> {
        self.goals.first().map(|g| g.region)
    }

    /// What another agent's belief table needs to know about this one.
    pub fn tracked(&self) -> TrackedAgent {
        TrackedAgent {
            id:     self.id,
            goals:  self.candidate_goals(),
            spawn:  self.spawn.state(),
            length: self.length(),
            width:  self.width(),
        }
    }

    /// The occlusion record active at `frame`, if any.
    pub fn occlusion_at(&self, frame: Frame) -> Option<&OcclusionRecord> {
        self.occlusions.iter().find(|r| r.contains(frame))
    }
}

// ── ScenarioFile ──────────────────────────────────────────────────────────────

/// A complete scenario: run settings plus every agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub scenario: ScenarioConfig,
    pub agents:   Vec<AgentDescriptor>,
}

impl ScenarioFile {
    /// The first agent of type `Ego`.
    pub fn ego(&self) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.role.is_ego())
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Agents hidden from the ego at `frame`.
    pub fn occluded_at(&self, frame: Frame) -> BTreeSet<AgentId> {
        self.agents.iter().filter(|a| a.occlusion_at(frame).is_some()).map(|a| a.id).collect()
    }

    /// Tracking descriptions of every agent except `ego`.
    pub fn tracked_agents(&self, ego: AgentId) -> Vec<TrackedAgent> {
        self.agents.iter().filter(|a| a.id != ego).map(AgentDescriptor::tracked).collect()
    }
}
