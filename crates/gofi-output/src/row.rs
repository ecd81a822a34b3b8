//! Plain data row types written by output backends.

/// One committed macro-action of the ego.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRow {
    pub frame:            u64,
    pub time_secs:        f64,
    pub agent_id:         u32,
    /// Display form of the action, e.g. `ChangeLaneLeft` or `Stop(1.0s)`.
    pub action:           String,
    pub mean_reward:      f64,
    pub visits:           u32,
    pub fallback:         bool,
    /// Number of non-ego agents the planning call simulated.
    pub simulated_agents: u32,
}

/// Posterior probability of one candidate goal of one tracked agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProbabilityRow {
    pub frame:       u64,
    pub agent_id:    u32,
    pub goal_index:  u32,
    pub probability: f64,
    pub existence:   f64,
    pub tracking:    &'static str,
    /// Reconciliation outcome when the agent re-entered view this frame.
    pub reconcile:   Option<&'static str>,
}

/// True kinematic state of one agent at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentStateRow {
    pub frame:     u64,
    pub time_secs: f64,
    pub agent_id:  u32,
    pub x:         f64,
    pub y:         f64,
    pub vx:        f64,
    pub vy:        f64,
    pub heading:   f64,
}
