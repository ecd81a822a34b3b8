//! Macro-actions: temporally extended, parameterised driving maneuvers.
//!
//! The variant set is closed, so every consumer dispatches with a single
//! `match`.  Serialised with an internal `"type"` tag:
//!
//! ```json
//! { "type": "ChangeLane", "direction": "Left" }
//! { "type": "Exit", "turn_target": [59.0, -1.75] }
//! { "type": "Stop", "duration": 100.0 }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use gofi_core::Vec2;

/// Side of a lane change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaneDirection {
    Left,
    Right,
}

/// A parameterised driving maneuver.  Immutable once instantiated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MacroAction {
    /// Follow the current lane chain.
    Continue,
    /// Move into the neighbouring lane on `direction`.
    ChangeLane { direction: LaneDirection },
    /// Drive the routed path to `turn_target`.
    Exit { turn_target: Vec2 },
    /// Brake to standstill, then hold for `duration` seconds.
    Stop { duration: f64 },
}

impl MacroAction {
    /// Short label used in logs and CSV output.
    pub fn name(&self) -> &'static str {
        match self {
            MacroAction::Continue => "Continue",
            MacroAction::ChangeLane { direction: LaneDirection::Left } => "ChangeLaneLeft",
            MacroAction::ChangeLane { direction: LaneDirection::Right } => "ChangeLaneRight",
            MacroAction::Exit { .. } => "Exit",
            MacroAction::Stop { .. } => "Stop",
        }
    }

    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(self, MacroAction::Stop { .. })
    }
}

impl fmt::Display for MacroAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroAction::Exit { turn_target } => write!(f, "Exit{turn_target}"),
            MacroAction::Stop { duration } => write!(f, "Stop({duration:.1}s)"),
            other => f.write_str(other.name()),
        }
    }
}
