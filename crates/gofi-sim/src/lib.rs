//! `gofi-sim` — the agent decision loop and the frame-stepping driver.
//!
//! # Frame loop
//!
//! ```text
//! for frame in 0..scenario.max_steps:
//!   ① Perceive  — visible / occluded / out-of-view split for the ego
//!                 (occlusion records, then view radius).
//!   ② Beliefs   — BeliefTable::update: goal recognition, occlusion
//!                 inflation, reconciliation on re-observation.
//!   ③ Decide    — every round(t_update · fps) frames, or when the committed
//!                 trajectory runs out: MctsPlanner::plan, or Stop as the
//!                 fallback when no action is viable.
//!   ④ Advance   — ego along its commitment, scripted agents along their
//!                 script.
//! ```
//!
//! # Crate layout
//!
//! | Module         | Contents                                               |
//! |----------------|--------------------------------------------------------|
//! | [`ego`]        | `EgoAgent`, `Decision`, `EgoStatus`, `FrameOutput`     |
//! | [`scripted`]   | `ScriptedAgent`: macro queue, then `Continue`, then hold |
//! | [`perception`] | `perceive`: the ego's `Observation` of one frame       |
//! | [`sim`]        | `Sim::run`, `Sim::run_frames`                          |
//! | [`builder`]    | `SimBuilder`                                           |
//! | [`observer`]   | `SimObserver`, `NoopObserver`                          |
//! | [`error`]      | `SimError`, `SimResult<T>`                             |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Rollout batches run on Rayon's thread pool.             |
//! | `fx-hash`  | FxHash for the recognition cost cache.                  |

pub mod builder;
pub mod ego;
pub mod error;
pub mod observer;
pub mod perception;
pub mod scripted;
pub mod sim;


pub use builder::SimBuilder;
pub use ego::{Decision, EgoAgent, EgoStatus, FrameOutput};
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver};
pub use perception::perceive;
pub use scripted::ScriptedAgent;
pub use sim::Sim;
