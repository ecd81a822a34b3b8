//! Kinematic agent state and the immutable world snapshot.
//!
//! `WorldState` is cloned freely: planners copy it into each rollout and
//! mutate the copy, never the snapshot the decision loop handed them.

use std::collections::BTreeMap;

use crate::{AgentId, AgentRole, BoundingBox, CoreError, CoreResult, Frame, Vec2};

/// Speed (m/s) below which an agent is considered stationary.
pub const STOP_VELOCITY: f64 = 0.1;

// ── AgentState ────────────────────────────────────────────────────────────────

/// Position, heading and velocity of one agent at one instant.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub heading:  f64,
}

impl AgentState {
    /// Build a state moving at `speed` along `heading`.
    pub fn new(position: Vec2, heading: f64, speed: f64) -> Self {
        Self { position, velocity: Vec2::from_heading(heading) * speed, heading }
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.speed() < STOP_VELOCITY
    }

    /// Constant-velocity extrapolation `dt` seconds ahead.
    pub fn extrapolate(&self, dt: f64) -> AgentState {
        AgentState { position: self.position + self.velocity * dt, ..*self }
    }
}

// ── AgentMetadata ─────────────────────────────────────────────────────────────

/// Static per-agent attributes that do not change frame to frame.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentMetadata {
    pub length: f64,
    pub width:  f64,
    pub role:   AgentRole,
}

impl AgentMetadata {
    pub fn new(length: f64, width: f64, role: AgentRole) -> Self {
        Self { length, width, role }
    }
}

// ── WorldState ────────────────────────────────────────────────────────────────

/// Snapshot of every agent at one frame.
///
/// Agents are kept in `BTreeMap`s so iteration order is by id, which keeps
/// every consumer (rollouts, writers, tests) deterministic.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    pub frame:    Frame,
    /// Simulated seconds at `frame`.
    pub time:     f64,
    pub agents:   BTreeMap<AgentId, AgentState>,
    pub metadata: BTreeMap<AgentId, AgentMetadata>,
}

impl WorldState {
    pub fn new(frame: Frame, time: f64) -> Self {
        Self { frame, time, ..Default::default() }
    }

    pub fn insert(&mut self, id: AgentId, state: AgentState, metadata: AgentMetadata) {
        self.agents.insert(id, state);
        self.metadata.insert(id, metadata);
    }

    #[inline]
    pub fn get(&self, id: AgentId) -> Option<&AgentState> {
        self.agents.get(&id)
    }

    /// Like [`get`](Self::get) but failing with `AgentNotFound`.
    pub fn require(&self, id: AgentId) -> CoreResult<&AgentState> {
        self.agents.get(&id).ok_or(CoreError::AgentNotFound(id))
    }

    /// The oriented footprint of `id` at its current pose.
    pub fn footprint(&self, id: AgentId) -> Option<BoundingBox> {
        let state = self.agents.get(&id)?;
        let meta = self.metadata.get(&id)?;
        Some(BoundingBox::new(state.position, meta.length, meta.width, state.heading))
    }

    pub fn role(&self, id: AgentId) -> Option<AgentRole> {
        self.metadata.get(&id).map(|m| m.role)
    }

    /// Ids of every agent other than `ego`, ascending.
    pub fn others(&self, ego: AgentId) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.keys().copied().filter(move |&id| id != ego)
    }
}
