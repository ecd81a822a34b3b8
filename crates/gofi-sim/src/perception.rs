//! What the ego can see in one frame.

use std::collections::BTreeSet;

use gofi_core::{AgentId, WorldState};
use gofi_recognition::Observation;

/// Split every non-ego agent into visible, occluded or out of view.
///
/// Agents farther than `view_radius` from the ego are out of view whether or
/// not an occlusion record names them.  Within range, agents in `occluded`
/// are hidden and everyone else is observed with their true state.
pub fn perceive(world: &WorldState, ego: AgentId, view_radius: f64, occluded: &BTreeSet<AgentId>) -> Observation {
    let mut obs = Observation::new(world.frame);
    let Some(me) = world.get(ego) else {
        return obs;
    };
    for id in world.others(ego) {
        let Some(state) = world.get(id) else { continue };
        if state.position.distance(me.position) > view_radius {
            continue;
        }
        if occluded.contains(&id) {
            obs.occluded.insert(id);
        } else {
            obs.visible.insert(id, *state);
        }
    }
    obs
}
