//! Motion-subsystem error type.

use thiserror::Error;

use gofi_core::CoreError;
use gofi_map::MapError;

use crate::MacroAction;

/// Errors produced by `gofi-motion`.
#[derive(Debug, Error)]
pub enum MotionError {
    /// The macro-action cannot be realised from the current state.  Pruned
    /// by planners, never fatal.
    #[error("infeasible {action}: {reason}")]
    InfeasibleAction { action: MacroAction, reason: String },

    /// No speed profile within the acceleration bounds reaches `v_end` over
    /// `length` metres starting from `v0`.
    #[error("no bounded speed profile from {v0:.2} m/s to {v_end:.2} m/s within {length:.2} m")]
    InfeasibleProfile { v0: f64, v_end: f64, length: f64 },

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl MotionError {
    /// `true` for the kinds a planner should treat as "prune this action".
    pub fn is_infeasible(&self) -> bool {
        matches!(self, MotionError::InfeasibleAction { .. } | MotionError::InfeasibleProfile { .. })
    }
}

pub type MotionResult<T> = Result<T, MotionError>;
