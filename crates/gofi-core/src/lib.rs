//! `gofi-core` — foundational types for the gofi occlusion-aware planner.
//!
//! This crate is a dependency of every other `gofi-*` crate.  It has no
//! `gofi-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`ids`]     | `AgentId`, `LaneId`, `GoalId`, `NodeId`                   |
//! | [`geom`]    | `Vec2`, `BoundingBox`, angle helpers                      |
//! | [`time`]    | `Frame`, `SimClock`, `ScenarioConfig`                     |
//! | [`rng`]     | `RolloutRng` (per rollout)                                |
//! | [`role`]    | `AgentRole` enum                                          |
//! | [`state`]   | `AgentState`, `AgentMetadata`, `WorldState`               |
//! | [`error`]   | `CoreError`, `CoreResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required by `gofi-scenario`.                               |

pub mod error;
pub mod geom;
pub mod ids;
pub mod rng;
pub mod role;
pub mod state;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geom::{BoundingBox, Vec2, wrap_angle};
pub use ids::{AgentId, GoalId, LaneId, NodeId};
pub use rng::RolloutRng;
pub use role::AgentRole;
pub use state::{AgentMetadata, AgentState, STOP_VELOCITY, WorldState};
pub use time::{Frame, ScenarioConfig, SimClock};
