//! `gofi-motion` — macro-actions and the trajectories they expand to.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                       |
//! |----------------|----------------------------------------------------------------|
//! | [`action`]     | `MacroAction` enum (`Continue`, `ChangeLane`, `Exit`, `Stop`)  |
//! | [`trajectory`] | `Trajectory`, `TrajectoryPoint`                                |
//! | [`smoother`]   | `VelocitySmoother`, `SmootherConfig`                           |
//! | [`library`]    | `MacroActionLibrary`: action → trajectory, `expand_plan`       |
//! | [`cost`]       | `CostFactors`, `TrajectoryMetrics`, `CostEvaluator`            |
//! | [`error`]      | `MotionError`, `MotionResult<T>`                               |
//!
//! # Design notes
//!
//! Expansion is a pure function of (map, agent state, action, config): no RNG
//! is consumed, so the same inputs always yield the same trajectory.  A
//! macro-action that cannot be realised returns
//! [`MotionError::InfeasibleAction`]; planners prune such actions locally.

pub mod action;
pub mod cost;
pub mod error;
pub mod library;
pub mod smoother;
pub mod trajectory;

#[cfg(test)]
mod tests;

pub use action::{LaneDirection, MacroAction};
pub use cost::{CostEvaluator, CostFactors, TrajectoryMetrics};
pub use error::{MotionError, MotionResult};
pub use library::{MacroActionConfig, MacroActionLibrary};
pub use smoother::{SmootherConfig, VelocitySmoother};
pub use trajectory::{Trajectory, TrajectoryPoint};
