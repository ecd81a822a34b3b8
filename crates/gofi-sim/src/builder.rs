//! Fluent builder for constructing a [`Sim`].

use gofi_core::{AgentRole, Frame, WorldState};
use gofi_map::RoadMap;
use gofi_motion::CostEvaluator;
use gofi_scenario::{ScenarioFile, validate};

use crate::{EgoAgent, ScriptedAgent, Sim, SimError, SimResult};

/// Fluent builder for [`Sim`].
///
/// # Required inputs
///
/// - [`ScenarioFile`]: run settings and agents, validated again on build
/// - [`RoadMap`]: the map named by the scenario's `map_path`
///
/// # Optional inputs (have defaults)
///
/// | Method                 | Default                                   |
/// |------------------------|-------------------------------------------|
/// | `.record_beliefs(b)`   | `true`: goal-probability history is kept  |
///
/// # Example
///
/// ```rust,ignore
/// let (scenario, map) = load_scenario_with_map(path)?;
/// let mut sim = SimBuilder::new(scenario, map).build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    scenario:       ScenarioFile,
    map:            RoadMap,
    record_beliefs: bool,
}

impl SimBuilder {
    pub fn new(scenario: ScenarioFile, map: RoadMap) -> Self {
        Self { scenario, map, record_beliefs: true }
    }

    /// Whether the ego keeps its per-frame goal-probability history.
    pub fn record_beliefs(mut self, record: bool) -> Self {
        self.record_beliefs = record;
        self
    }

    /// Validate the scenario, expand every scripted agent and place all
    /// agents at their spawn state.
    pub fn build(self) -> SimResult<Sim> {
        validate(&self.scenario)?;
        let cfg = &self.scenario.scenario;
        let ego_desc = self
            .scenario
            .ego()
            .ok_or_else(|| SimError::Config("scenario has no Ego agent".into()))?;

        let mut ego = EgoAgent::new(ego_desc, &self.scenario)?;
        ego.set_record_beliefs(self.record_beliefs);

        let horizon = cfg.max_steps as f64 / cfg.fps as f64;
        let scripted: Vec<ScriptedAgent> = self
            .scenario
            .agents
            .iter()
            .filter(|a| a.role != AgentRole::Ego)
            .map(|a| ScriptedAgent::new(a, &self.map, cfg.max_speed, cfg.fps, horizon))
            .collect();

        let mut world = WorldState::new(Frame::ZERO, 0.0);
        for a in &self.scenario.agents {
            world.insert(a.id, a.spawn.state(), a.metadata());
        }

        Ok(Sim {
            clock: cfg.make_clock(),
            evaluator: CostEvaluator::new(cfg.fps),
            world,
            ego,
            scripted,
            map: self.map,
            scenario: self.scenario,
        })
    }
}
