use thiserror::Error;

use gofi_map::MapError;

#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Malformed or inconsistent scenario contents.  Fatal at load.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("scenario parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Map(#[from] MapError),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;
