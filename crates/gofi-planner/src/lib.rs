//! `gofi-planner` — Monte-Carlo Tree Search over ego macro-actions, with
//! non-ego agents driven by goal recognition and occluded agents kept in
//! the risk model.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                    |
//! |-----------------|-------------------------------------------------------------|
//! | [`config`]      | `MctsConfig`, `RewardConfig`, `StoreResults`                |
//! | [`tree`]        | `SearchTree` arena, `TreeNode`, UCB1                        |
//! | [`rollout`]     | `RolloutWorld`, `SimulatedAgent`, presence draws, `Step`    |
//! | [`planner`]     | `MctsPlanner::plan`, `PlanRequest`, `PlanOutcome`           |
//! | [`diagnostics`] | `PlanDiagnostics`, `RolloutRecord`, `ChildStats`            |
//! | [`error`]       | `PlanError`, `PlanResult<T>`                                |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | Runs each batch of rollouts on Rayon's thread pool.       |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let planner = MctsPlanner { map: &map, library: &library, evaluator: &evaluator, config: &mcts, seed };
//! let outcome = planner.plan(&PlanRequest {
//!     agent, frame, state, length: 4.5, width: 1.8,
//!     goal: goal_box,
//!     predictions: &beliefs.predictions(),
//!     presence: beliefs.presence(),
//! })?;
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod planner;
pub mod rollout;
pub mod tree;


pub use config::{MctsConfig, RewardConfig, StoreResults};
pub use diagnostics::{ChildStats, PlanDiagnostics, RolloutRecord, SimulatedAgentRecord};
pub use error::{PlanError, PlanResult};
pub use planner::{MctsPlanner, PlanOutcome, PlanRequest};
pub use rollout::{RolloutWorld, SimulatedAgent, SimulationMode, Step, StepEvent};
pub use tree::{SearchTree, TreeNode};
