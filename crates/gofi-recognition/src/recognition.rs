//! Inverse-planning goal recognition.
//!
//! For each candidate goal `g` of an agent first observed in state `x₀` and
//! now in state `xₜ` after the observed trajectory `o`:
//!
//! ```text
//! C*(g)  = cost(optimal plan x₀ → g)                 (cached per agent, goal)
//! Cₒ(g)  = cost(o ⧺ optimal plan xₜ → g)
//! Δ(g)   = Cₒ(g) − C*(g)
//! P(g|o) ∝ P(g) · exp(−β · Δ(g))
//! ```
//!
//! A goal whose plan cannot be expanded gets zero likelihood.  A goal region
//! that already contains `x₀` is treated the same way: an agent does not set
//! out toward where it starts.
//!
//! Under a presence hypothesis the optimal plans must also avoid every
//! stopped agent the hypothesis places on the road.  A plan whose reference
//! point passes through such an agent's footprint is blocked, and the agent
//! is assumed to move over one lane first instead.

use tracing::debug;

use gofi_core::{AgentId, AgentState, BoundingBox, GoalId};
use gofi_map::{DijkstraLaneRouter, LaneRouter, RoadMap};
use gofi_motion::{CostEvaluator, CostFactors, LaneDirection, MacroAction, MacroActionLibrary, Trajectory};

use crate::{Goal, GoalDistribution, GoalRecognitionConfig, RecognitionError, RecognitionResult};

/// Optimal cost per goal, `None` when the goal is unreachable.
#[cfg(feature = "fx-hash")]
pub type CostCache = rustc_hash::FxHashMap<GoalId, Option<f64>>;
#[cfg(not(feature = "fx-hash"))]
pub type CostCache = std::collections::HashMap<GoalId, Option<f64>>;

/// The reference plan an agent pursuing `goal` is assumed to follow.
pub fn goal_plan(goal: &Goal) -> Vec<MacroAction> {
    vec![MacroAction::Exit { turn_target: goal.center() }]
}

/// Plans tried when the reference plan is blocked: one lane over, then on
/// to the goal.
pub fn detour_plans(goal: &Goal) -> [Vec<MacroAction>; 2] {
    [LaneDirection::Left, LaneDirection::Right]
        .map(|direction| vec![MacroAction::ChangeLane { direction }, MacroAction::Exit { turn_target: goal.center() }])
}

/// Whether the reference point of `trajectory` enters any of `blockers`.
pub fn drives_through(trajectory: &Trajectory, blockers: &[BoundingBox]) -> bool {
    trajectory
        .points
        .iter()
        .any(|p| blockers.iter().any(|b| b.contains(p.position)))
}

/// Posterior from per-goal cost differences: `prior · exp(−β Δ)`,
/// normalised.  `None` entries have zero likelihood.  Returns `None` when
/// every goal has zero posterior mass.
pub fn softmax_posterior(diffs: &[Option<f64>], priors: &GoalDistribution, beta: f64) -> Option<GoalDistribution> {
    let min = diffs.iter().flatten().copied().fold(f64::INFINITY, f64::min);
    if !min.is_finite() {
        return None;
    }
    let weights: Vec<f64> = diffs
        .iter()
        .enumerate()
        .map(|(i, d)| match d {
            Some(d) => priors.as_slice().get(i).copied().unwrap_or(0.0) * (-beta * (d - min)).exp(),
            None => 0.0,
        })
        .collect();
    if weights.iter().sum::<f64>() <= 0.0 {
        return None;
    }
    Some(GoalDistribution::normalized(weights))
}

// ── RecognitionContext ────────────────────────────────────────────────────────

/// Everything recognition reads but never mutates.
pub struct RecognitionContext<'a, R: LaneRouter = DijkstraLaneRouter> {
    pub map:          &'a RoadMap,
    pub library:      &'a MacroActionLibrary<R>,
    pub evaluator:    &'a CostEvaluator,
    pub cost_factors: &'a CostFactors,
    pub config:       &'a GoalRecognitionConfig,
}

impl<R: LaneRouter> RecognitionContext<'_, R> {
    /// Seconds per frame.
    pub fn dt(&self) -> f64 {
        self.library.dt()
    }

    /// `C*(g)`: cost of the reference plan from `initial`.
    pub fn optimal_cost(&self, initial: &AgentState, goal: &Goal) -> Option<f64> {
        self.optimal_cost_avoiding(initial, goal, &[])
    }

    /// `Cₒ(g)`: cost of the observed trajectory continued optimally.
    pub fn observed_cost(&self, observed: &Trajectory, current: &AgentState, goal: &Goal) -> Option<f64> {
        self.observed_cost_avoiding(observed, current, goal, &[])
    }

    /// `C*(g)` with the stopped agents in `blockers` on the road.
    pub fn optimal_cost_avoiding(&self, initial: &AgentState, goal: &Goal, blockers: &[BoundingBox]) -> Option<f64> {
        if goal.reached(initial.position) {
            return None;
        }
        self.plan_to(initial, goal, blockers).map(|t| self.evaluator.cost(&t, self.cost_factors))
    }

    /// `Cₒ(g)` with the stopped agents in `blockers` on the road.  The
    /// observed part is taken as it is.
    pub fn observed_cost_avoiding(
        &self,
        observed: &Trajectory,
        current:  &AgentState,
        goal:     &Goal,
        blockers: &[BoundingBox],
    ) -> Option<f64> {
        let mut joined = observed.clone();
        if !goal.reached(current.position) {
            joined.append(&self.plan_to(current, goal, blockers)?);
        }
        Some(self.evaluator.cost(&joined, self.cost_factors))
    }

    /// The reference plan from `from`, or the cheapest unblocked detour when
    /// the reference plan drives through a blocker.
    fn plan_to(&self, from: &AgentState, goal: &Goal, blockers: &[BoundingBox]) -> Option<Trajectory> {
        let direct = self.library.expand_plan(self.map, from, &goal_plan(goal)).ok()?;
        if !drives_through(&direct, blockers) {
            return Some(direct);
        }
        detour_plans(goal)
            .into_iter()
            .filter_map(|plan| self.library.expand_plan(self.map, from, &plan).ok())
            .filter(|t| !drives_through(t, blockers))
            .map(|t| (self.evaluator.cost(&t, self.cost_factors), t))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, t)| t)
    }
}

// ── GoalRecognizer ────────────────────────────────────────────────────────────

/// Runs one recognition update for one agent.
pub struct GoalRecognizer<'c, 'a, R: LaneRouter = DijkstraLaneRouter> {
    pub ctx: &'c RecognitionContext<'a, R>,
}

impl<'c, 'a, R: LaneRouter> GoalRecognizer<'c, 'a, R> {
    pub fn new(ctx: &'c RecognitionContext<'a, R>) -> Self {
        Self { ctx }
    }

    /// Posterior over `goals` given the observed trajectory.  The first point
    /// of `observed` is the initial state; the last is the current state.
    pub fn recognize(
        &self,
        agent:    AgentId,
        goals:    &[Goal],
        priors:   &GoalDistribution,
        observed: &Trajectory,
        cache:    &mut CostCache,
    ) -> RecognitionResult<GoalDistribution> {
        let (Some(initial), Some(current)) = (observed.first(), observed.last()) else {
            return Err(RecognitionError::UnreachableGoal { agent });
        };
        let (initial, current) = (initial.to_state(), current.to_state());

        let diffs: Vec<Option<f64>> = goals
            .iter()
            .map(|goal| {
                let optimal = *cache.entry(goal.id).or_insert_with(|| self.ctx.optimal_cost(&initial, goal));
                let diff = optimal.and_then(|opt| {
                    self.ctx.observed_cost(observed, &current, goal).map(|obs| obs - opt)
                });
                debug!(agent = %agent, goal = %goal.id, ?optimal, ?diff, "goal likelihood");
                diff
            })
            .collect();

        softmax_posterior(&diffs, priors, self.ctx.config.beta)
            .ok_or(RecognitionError::UnreachableGoal { agent })
    }

    /// Unnormalised `P(o | g, z) · P(g)` for every presence factor `z`, where
    /// `blockers[z]` are the stopped agents factor `z` puts on the road.
    /// All factors share one scale, so the rows can be compared.  `None`
    /// when no goal is reachable under any factor.
    ///
    /// Optimal costs of factors without blockers come from `cache`.
    pub fn factor_weights(
        &self,
        agent:    AgentId,
        goals:    &[Goal],
        priors:   &GoalDistribution,
        observed: &Trajectory,
        blockers: &[Vec<BoundingBox>],
        cache:    &mut CostCache,
    ) -> Option<Vec<Vec<f64>>> {
        let (initial, current) = (observed.first()?.to_state(), observed.last()?.to_state());

        let diffs: Vec<Vec<Option<f64>>> = blockers
            .iter()
            .map(|boxes| {
                goals
                    .iter()
                    .map(|goal| {
                        let optimal = if boxes.is_empty() {
                            *cache.entry(goal.id).or_insert_with(|| self.ctx.optimal_cost(&initial, goal))
                        } else {
                            self.ctx.optimal_cost_avoiding(&initial, goal, boxes)
                        };
                        let cost = self.ctx.observed_cost_avoiding(observed, &current, goal, boxes)?;
                        optimal.map(|opt| cost - opt)
                    })
                    .collect()
            })
            .collect();

        let min = diffs.iter().flatten().flatten().copied().fold(f64::INFINITY, f64::min);
        if !min.is_finite() {
            debug!(agent = %agent, "no goal reachable under any presence factor");
            return None;
        }
        let beta = self.ctx.config.beta;
        Some(
            diffs
                .iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .map(|(i, d)| match d {
                            Some(d) => priors.as_slice().get(i).copied().unwrap_or(0.0) * (-beta * (d - min)).exp(),
                            None => 0.0,
                        })
                        .collect()
                })
                .collect(),
        )
    }
}
