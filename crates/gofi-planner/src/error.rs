//! Planner error type.

use thiserror::Error;

use gofi_core::AgentId;
use gofi_motion::MotionError;

/// Errors produced by a planning call.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The ego's goal cannot be reached on the map.
    #[error("goal of agent {agent} is unreachable")]
    UnreachableGoal { agent: AgentId },

    /// Every root macro-action was infeasible.
    #[error("no viable macro-action for agent {agent}")]
    NoViableAction { agent: AgentId },

    #[error(transparent)]
    Motion(#[from] MotionError),
}

pub type PlanResult<T> = Result<T, PlanError>;
