//! Map-subsystem error type.

use thiserror::Error;

use gofi_core::{LaneId, Vec2};

/// Errors produced by `gofi-map`.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("lane {0} not found in map")]
    LaneNotFound(LaneId),

    #[error("no lane route from {from} to {target}")]
    NoRoute { from: LaneId, target: Vec2 },

    #[error("point {0} is not on any lane")]
    OffLane(Vec2),

    #[error("invalid lane {lane}: {reason}")]
    InvalidLane { lane: LaneId, reason: String },
}

pub type MapResult<T> = Result<T, MapError>;
