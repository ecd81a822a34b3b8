//! The `Sim` struct and its frame loop.

use tracing::debug;

use gofi_core::{AgentState, Frame, SimClock, Vec2, WorldState};
use gofi_map::RoadMap;
use gofi_motion::CostEvaluator;
use gofi_scenario::ScenarioFile;

use crate::{EgoAgent, ScriptedAgent, SimObserver, SimResult, perceive};

/// The frame-stepping driver.
///
/// Each frame runs three phases:
///
/// 1. **Perceive**: build the ego's [`Observation`][gofi_recognition::Observation]
///    from the occlusion records and view radius.
/// 2. **Decide**: the ego updates its beliefs and, when due, plans and
///    commits a macro-action.
/// 3. **Advance**: every agent moves to its state at the next frame; the ego
///    along its committed trajectory, scripted agents along their script.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim {
    pub scenario:  ScenarioFile,
    pub clock:     SimClock,
    /// Read-only road network shared by every planning call.
    pub map:       RoadMap,
    pub evaluator: CostEvaluator,
    /// True state of every agent at `clock.current_frame`.
    pub world:     WorldState,
    pub ego:       EgoAgent,
    pub scripted:  Vec<ScriptedAgent>,
}

impl Sim {
    // ── Public API ────────────────────────────────────────────────────────

    /// Run from the current frame to `scenario.max_steps`.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let end = self.scenario.scenario.end_frame();
        while self.clock.current_frame < end {
            self.process_frame(observer)?;
        }
        observer.on_sim_end(self.clock.current_frame);
        Ok(())
    }

    /// Run exactly `n` frames from the current position (ignores
    /// `max_steps`).
    pub fn run_frames<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            self.process_frame(observer)?;
        }
        Ok(())
    }

    // ── Core frame processing ─────────────────────────────────────────────

    fn process_frame<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let now = self.clock.current_frame;
        observer.on_frame_start(now, &self.world);

        let ego_state = *self.world.require(self.ego.id)?;
        let occluded = self.scenario.occluded_at(now);
        let obs = perceive(&self.world, self.ego.id, self.ego.view_radius(), &occluded);

        let recorded = self.ego.beliefs().history().len();
        let out = self.ego.step(&self.map, &self.evaluator, now, &ego_state, &obs)?;
        let history = self.ego.beliefs().history();
        observer.on_beliefs(now, &history[recorded.min(history.len())..], &out.reconciled);
        if let Some(decision) = &out.decision {
            observer.on_decision(decision);
        }

        observer.on_frame_end(now, &self.world);
        self.advance(now);
        Ok(())
    }

    fn advance(&mut self, now: Frame) {
        let next = now + 1;
        let t = self.clock.secs_at(next);
        let mut world = WorldState::new(next, t);
        world.metadata = std::mem::take(&mut self.world.metadata);

        if let Some(current) = self.world.get(self.ego.id) {
            world.agents.insert(self.ego.id, self.ego.state_at(next, current));
        }
        for agent in &self.scripted {
            let state = agent
                .state_at(t)
                .or_else(|| self.world.get(agent.id).map(|s| AgentState { velocity: Vec2::ZERO, ..*s }));
            if let Some(state) = state {
                world.agents.insert(agent.id, state);
            }
        }
        debug!(frame = %next, agents = world.agents.len(), "advanced");

        self.world = world;
        self.clock.advance();
    }
}
