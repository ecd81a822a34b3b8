//! Search summaries kept when `store_results` asks for them.  Never read
//! back by the search.

use serde::{Deserialize, Serialize};

use gofi_core::{AgentId, Frame};
use gofi_motion::MacroAction;

use crate::{SimulationMode, StepEvent};

/// Statistics of one root child.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChildStats {
    pub action:      MacroAction,
    pub visits:      u32,
    pub mean_reward: f64,
}

/// A non-ego agent as one rollout simulated it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulatedAgentRecord {
    pub agent: AgentId,
    #[serde(flatten)]
    pub mode:  SimulationMode,
}

/// One simulation: the ego's macro-action sequence and what it earned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RolloutRecord {
    pub index:   usize,
    pub actions: Vec<MacroAction>,
    pub reward:  f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event:   Option<StepEvent>,
    pub agents:  Vec<SimulatedAgentRecord>,
    /// Agents in `agents` this rollout drew absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub absent:  Vec<AgentId>,
}

/// Everything retained from one planning call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDiagnostics {
    pub agent:     AgentId,
    pub frame:     Frame,
    pub tree_size: usize,
    pub root:      Vec<ChildStats>,
    /// Empty unless `store_results` is `all`.
    pub rollouts:  Vec<RolloutRecord>,
}
