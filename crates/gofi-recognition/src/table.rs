//! The ego's belief about every other agent, updated once per frame.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gofi_core::{AgentId, AgentState, BoundingBox, Frame};
use gofi_map::LaneRouter;

use crate::{
    AgentBelief, Goal, GoalDistribution, GoalRecognitionConfig, PresenceBelief, RecognitionContext,
    RecognitionError, RecognitionResult, ReconcileOutcome, TrackingState,
};

/// Static description of an agent the ego tracks.
#[derive(Clone, Debug)]
pub struct TrackedAgent {
    pub id:     AgentId,
    pub goals:  Vec<Goal>,
    pub spawn:  AgentState,
    pub length: f64,
    pub width:  f64,
}

/// What the ego perceives in one frame.  Agents in neither set are out of
/// view.
#[derive(Clone, Debug, Default)]
pub struct Observation {
    pub frame:    Frame,
    pub visible:  BTreeMap<AgentId, AgentState>,
    /// Agents hidden by an active occlusion record.
    pub occluded: BTreeSet<AgentId>,
}

impl Observation {
    pub fn new(frame: Frame) -> Self {
        Self { frame, ..Default::default() }
    }
}

/// One row of goal-probability history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalProbabilityRecord {
    pub frame:         Frame,
    pub agent:         AgentId,
    pub state:         TrackingState,
    pub probabilities: Vec<f64>,
    pub existence:     f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile:     Option<ReconcileOutcome>,
}

/// Immutable per-agent snapshot handed to the planner.
#[derive(Clone, Debug)]
pub struct AgentPrediction {
    pub agent:           AgentId,
    /// Observed state, or the constant-velocity extrapolation if occluded.
    pub state:           AgentState,
    pub tracking:        TrackingState,
    pub existence:       f64,
    pub map_goal:        Option<Goal>,
    pub map_probability: f64,
    pub distribution:    GoalDistribution,
    pub length:          f64,
    pub width:           f64,
}

impl AgentPrediction {
    pub fn is_occluded(&self) -> bool {
        self.tracking == TrackingState::Occluded
    }

    pub fn footprint(&self) -> BoundingBox {
        BoundingBox::new(self.state.position, self.length, self.width, self.state.heading)
    }
}

// ── BeliefTable ───────────────────────────────────────────────────────────────

/// Beliefs of one ego about all other agents, keyed by agent id.
#[derive(Clone, Debug)]
pub struct BeliefTable {
    ego:      AgentId,
    beliefs:  BTreeMap<AgentId, AgentBelief>,
    history:  Vec<GoalProbabilityRecord>,
    presence: Option<PresenceBelief>,
    /// Whether per-update rows are appended to `history`.
    pub record_history: bool,
}

impl BeliefTable {
    pub fn new(ego: AgentId, agents: Vec<TrackedAgent>, config: &GoalRecognitionConfig) -> Self {
        let beliefs = agents
            .into_iter()
            .filter(|a| a.id != ego)
            .map(|a| {
                let priors = GoalDistribution::priors(config.goal_priors.as_deref(), a.goals.len());
                let belief = AgentBelief::new(a.id, a.goals, a.spawn, priors).with_size(a.length, a.width);
                (a.id, belief)
            })
            .collect();
        Self { ego, beliefs, history: Vec::new(), presence: None, record_history: true }
    }

    pub fn ego(&self) -> AgentId {
        self.ego
    }

    pub fn len(&self) -> usize {
        self.beliefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beliefs.is_empty()
    }

    pub fn get(&self, agent: AgentId) -> Option<&AgentBelief> {
        self.beliefs.get(&agent)
    }

    pub fn require(&self, agent: AgentId) -> RecognitionResult<&AgentBelief> {
        self.get(agent).ok_or(RecognitionError::UnknownAgent(agent))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AgentId, &AgentBelief)> {
        self.beliefs.iter()
    }

    /// Joint presence belief over the current spawn hypotheses, `None`
    /// when there are none.
    pub fn presence(&self) -> Option<&PresenceBelief> {
        self.presence.as_ref()
    }

    /// Goal-probability history recorded so far.
    pub fn history(&self) -> &[GoalProbabilityRecord] {
        &self.history
    }

    /// Rows recorded at `frame`.
    pub fn records_at(&self, frame: Frame) -> impl Iterator<Item = &GoalProbabilityRecord> {
        self.history.iter().filter(move |r| r.frame == frame)
    }

    /// Apply one frame of perception to every tracked agent, then infer
    /// the presence of hypothesised agents from the observed ones.  Returns
    /// the reconciliation outcome of each agent that (re)entered direct view.
    pub fn update<R: LaneRouter>(
        &mut self,
        ctx: &RecognitionContext<'_, R>,
        obs: &Observation,
    ) -> Vec<(AgentId, ReconcileOutcome)> {
        let dt = ctx.dt();
        let occ = &ctx.config.occlusion;
        let mut outcomes = Vec::new();

        for (&id, belief) in self.beliefs.iter_mut() {
            let reconcile = if obs.occluded.contains(&id) {
                belief.occlude(obs.frame, dt, occ.inflation_rate, occ.occluded_prior);
                None
            } else if let Some(state) = obs.visible.get(&id) {
                belief.observe(ctx, obs.frame, *state)
            } else {
                belief.lose_sight();
                None
            };

            if let Some(outcome) = reconcile {
                match outcome {
                    ReconcileOutcome::Diverged { error } => {
                        warn!(agent = %id, frame = %obs.frame, error, "belief reset after occlusion");
                    }
                    ReconcileOutcome::Consistent { error } => {
                        info!(agent = %id, frame = %obs.frame, error, "belief reconciled after occlusion");
                    }
                    ReconcileOutcome::Fresh => {
                        info!(agent = %id, frame = %obs.frame, "agent entered view");
                    }
                }
                outcomes.push((id, outcome));
            }
        }

        self.presence = self.infer_presence(ctx, obs.frame);

        if self.record_history {
            for (&id, belief) in &self.beliefs {
                let reconcile = outcomes.iter().find(|(a, _)| *a == id).map(|&(_, o)| o);
                self.history.push(GoalProbabilityRecord {
                    frame:         obs.frame,
                    agent:         id,
                    state:         belief.state(),
                    probabilities: belief.distribution().as_slice().to_vec(),
                    existence:     belief.existence(),
                    reconcile,
                });
            }
        }
        outcomes
    }

    /// Joint goal × presence inference over every spawn hypothesis.
    ///
    /// Each factor puts its present hypotheses on the road; those standing
    /// still block the plans of observed agents, as do stopped agents that
    /// were seen before their occlusion.  Goal-estimated agents are folded
    /// in increasing id order.  Their goal distributions become the
    /// marginal over the final factor posterior, and each hypothesis takes
    /// its marginal presence as existence.
    fn infer_presence<R: LaneRouter>(&mut self, ctx: &RecognitionContext<'_, R>, frame: Frame) -> Option<PresenceBelief> {
        let priors: Vec<(AgentId, f64)> = self
            .beliefs
            .values()
            .filter_map(|b| b.presence_prior().map(|p| (b.agent, p)))
            .collect();
        if priors.is_empty() {
            return None;
        }
        let mut presence = PresenceBelief::new(&priors);

        let known: Vec<BoundingBox> = self
            .beliefs
            .values()
            .filter(|b| b.state() == TrackingState::Occluded && b.presence_prior().is_none())
            .filter_map(AgentBelief::stopped_footprint)
            .collect();
        let hypothesised: Vec<Option<BoundingBox>> = presence
            .agents()
            .iter()
            .map(|id| self.beliefs.get(id).and_then(AgentBelief::stopped_footprint))
            .collect();
        let blockers: Vec<Vec<BoundingBox>> = presence
            .factors()
            .iter()
            .map(|f| known.iter().copied().chain(f.present().filter_map(|k| hypothesised[k])).collect())
            .collect();

        let mut conditionals = Vec::new();
        for belief in self.beliefs.values_mut().filter(|b| b.state() == TrackingState::GoalEstimated) {
            let Some(weights) = belief.factor_weights(ctx, &blockers) else { continue };
            match presence.update(&weights, belief.priors()) {
                Some(c) => conditionals.push((belief.agent, c)),
                None => debug!(agent = %belief.agent, frame = %frame, "agent explained by no presence factor"),
            }
        }

        for (id, c) in conditionals {
            let marginal = presence.goal_marginal(&c);
            if let Some(b) = self.beliefs.get_mut(&id) {
                b.set_distribution(marginal);
            }
        }
        for &id in presence.agents() {
            let existence = presence.existence(id).unwrap_or(0.0);
            if let Some(b) = self.beliefs.get_mut(&id) {
                b.set_existence(existence);
            }
            debug!(agent = %id, frame = %frame, existence, "presence posterior");
        }
        Some(presence)
    }

    /// Snapshot of every agent the ego currently has a state for: observed
    /// agents and occluded hypotheses.  Out-of-view agents are absent.
    pub fn predictions(&self) -> Vec<AgentPrediction> {
        self.beliefs
            .values()
            .filter_map(|b| {
                let state = *b.current_state()?;
                let (map_goal, map_probability) = match b.map_goal() {
                    Some((g, p)) if b.state() == TrackingState::GoalEstimated => (Some(*g), p),
                    _ => (None, 0.0),
                };
                Some(AgentPrediction {
                    agent: b.agent,
                    state,
                    tracking: b.state(),
                    existence: b.existence(),
                    map_goal,
                    map_probability,
                    distribution: b.distribution().clone(),
                    length: b.length,
                    width: b.width,
                })
            })
            .collect()
    }
}
