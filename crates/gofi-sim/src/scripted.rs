//! Non-ego agents that replay a fixed macro-action script.

use tracing::{debug, warn};

use gofi_core::{AgentId, AgentRole, AgentState, Vec2};
use gofi_map::RoadMap;
use gofi_motion::{MacroAction, MacroActionConfig, MacroActionLibrary, Trajectory};
use gofi_scenario::AgentDescriptor;

/// A `Traffic` or `Occluded` agent.  Its whole motion is expanded once at
/// build time: the configured macro-actions, then `Continue` until the lane
/// chain runs out or the run is over, then a standstill.
#[derive(Clone, Debug)]
pub struct ScriptedAgent {
    pub id:     AgentId,
    pub role:   AgentRole,
    trajectory: Trajectory,
}

impl ScriptedAgent {
    /// Expand `desc`'s script over `horizon` seconds.  Infeasible script
    /// entries are skipped.
    pub fn new(desc: &AgentDescriptor, map: &RoadMap, max_speed: f64, fps: u32, horizon: f64) -> Self {
        let library: MacroActionLibrary =
            MacroActionLibrary::new(MacroActionConfig::default(), desc.velocity_smoother.clone(), max_speed, fps);
        let spawn = desc.spawn.state();
        let mut trajectory = Trajectory::at_rest(&spawn);
        let mut current = spawn;
        let mut script = desc.macro_actions.iter();

        while trajectory.duration() < horizon {
            let (action, scripted) = match script.next() {
                Some(a) => (a.clone(), true),
                None => (MacroAction::Continue, false),
            };
            match library.expand(map, &current, &action) {
                Ok(next) => {
                    if !scripted && next.length() < 1e-6 {
                        break;
                    }
                    if let Some(end) = next.final_state() {
                        current = end;
                    }
                    trajectory.append(&next);
                }
                Err(e) if scripted => {
                    warn!(agent = %desc.id, action = %action, error = %e, "scripted macro-action skipped");
                }
                Err(e) => {
                    debug!(agent = %desc.id, error = %e, "script ends");
                    break;
                }
            }
        }
        Self { id: desc.id, role: desc.role, trajectory }
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// State `t` seconds after spawn.  Past the end of the script the agent
    /// stands still at its final pose.
    pub fn state_at(&self, t: f64) -> Option<AgentState> {
        let state = self.trajectory.state_at(t)?;
        if t >= self.trajectory.duration() {
            return Some(AgentState { velocity: Vec2::ZERO, ..state });
        }
        Some(state)
    }
}
