//! `gofi-scenario` — scenario files: data model, JSON I/O and validation.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                        |
//! |----------------|-----------------------------------------------------------------|
//! | [`descriptor`] | `ScenarioFile`, `AgentDescriptor`, `OcclusionRecord`, boxes     |
//! | [`loader`]     | `load_scenario`, `load_scenario_reader`, `save_scenario`, maps  |
//! | [`validate`]   | `validate`: every `InvalidConfiguration` check                  |
//! | [`error`]      | `ScenarioError`, `ScenarioResult<T>`                            |
//!
//! Loading is the only place configuration errors surface; everything
//! downstream assumes a validated scenario.

pub mod descriptor;
pub mod error;
pub mod loader;
pub mod validate;


pub use descriptor::{
    AgentDescriptor, DEFAULT_VIEW_RADIUS, GoalDescriptor, OcclusionRecord, ScenarioFile, SpawnDescriptor,
};
pub use error::{ScenarioError, ScenarioResult};
pub use loader::{
    load_map, load_map_reader, load_scenario, load_scenario_reader, load_scenario_with_map, resolve_map_path,
    save_scenario, write_scenario,
};
pub use validate::validate;
