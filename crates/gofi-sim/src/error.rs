use thiserror::Error;

use gofi_core::CoreError;
use gofi_planner::PlanError;
use gofi_scenario::ScenarioError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// A planning failure the decision loop has no fallback for.
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),
}

pub type SimResult<T> = Result<T, SimError>;
