//! Recognition-subsystem error type.

use thiserror::Error;

use gofi_core::{AgentId, CoreError};
use gofi_motion::MotionError;

/// Errors produced by `gofi-recognition`.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// No candidate goal of `agent` is reachable from its observed state.
    #[error("no candidate goal of agent {agent} is reachable")]
    UnreachableGoal { agent: AgentId },

    #[error("agent {0} is not tracked by the belief table")]
    UnknownAgent(AgentId),

    #[error(transparent)]
    Motion(#[from] MotionError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type RecognitionResult<T> = Result<T, RecognitionError>;
