//! `gofi-recognition` — who is going where, including agents we cannot see.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                      |
//! |-----------------|---------------------------------------------------------------|
//! | [`config`]      | `GoalRecognitionConfig`, `OcclusionConfig`                    |
//! | [`goals`]       | `Goal`, `GoalDistribution` (entropy, MAP goal, inflation)     |
//! | [`recognition`] | `GoalRecognizer`: inverse planning + softmax posterior        |
//! | [`belief`]      | `AgentBelief`, `TrackingState`, `ReconcileOutcome`            |
//! | [`presence`]    | `PresenceBelief`: joint present/absent factors of hypotheses  |
//! | [`table`]       | `BeliefTable`, `Observation`, `AgentPrediction`               |
//! | [`error`]       | `RecognitionError`, `RecognitionResult<T>`                    |
//!
//! # Ownership
//!
//! The [`BeliefTable`] is the only state in the planner that carries history
//! across steps.  It is owned by the decision loop and passed by `&mut` into
//! [`BeliefTable::update`] between planning calls; planners only ever see
//! the immutable [`AgentPrediction`] snapshot it produces.
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                      |
//! |-----------|-------------------------------------------------------------|
//! | `fx-hash` | FxHash instead of SipHash for the optimal-cost cache.       |

pub mod belief;
pub mod config;
pub mod error;
pub mod goals;
pub mod presence;
pub mod recognition;
pub mod table;

#[cfg(test)]
mod tests;

pub use belief::{AgentBelief, ReconcileOutcome, TrackingState};
pub use config::{GoalRecognitionConfig, OcclusionConfig};
pub use error::{RecognitionError, RecognitionResult};
pub use goals::{Goal, GoalDistribution, inflation_weight};
pub use presence::{PresenceBelief, PresenceFactor};
pub use recognition::{
    CostCache, GoalRecognizer, RecognitionContext, detour_plans, drives_through, goal_plan, softmax_posterior,
};
pub use table::{AgentPrediction, BeliefTable, GoalProbabilityRecord, Observation, TrackedAgent};
