//! Agent role enum shared across all crates.
//!
//! The role set is fixed by the scenario schema, so consumers match on it
//! exhaustively rather than dispatching through trait objects.

/// How an agent participates in the scenario.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgentRole {
    /// The planning agent: runs goal recognition and MCTS.
    Ego,
    /// A scripted vehicle that is always observable (within view radius).
    Traffic,
    /// A scripted vehicle with occlusion windows during which the ego
    /// cannot observe it.
    Occluded,
}

impl AgentRole {
    #[inline]
    pub fn is_ego(self) -> bool {
        matches!(self, AgentRole::Ego)
    }

    /// Human-readable label, useful for CSV column values.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Ego      => "ego",
            AgentRole::Traffic  => "traffic",
            AgentRole::Occluded => "occluded",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
