//! Per-agent belief: observed history, goal distribution and occlusion
//! tracking.
//!
//! # State machine
//!
//! ```text
//!              observe                 observe (≥ min_observations)
//! Unobserved ───────────▶ Observing ─────────────────────────────▶ GoalEstimated
//!     ▲   │                   │  ▲                                       │
//!     │   │ occlude           │  │ observe (reconcile)                   │
//!     │   ▼                   ▼  │                                       │
//!     │  Occluded ◀───────────────┴──────────────── occlude ─────────────┘
//!     │
//!     └──────── out of view (from any state) ────────
//! ```
//!
//! While `Occluded`, the true state is never read.  The belief extrapolates
//! the last known state at constant velocity and relaxes the goal
//! distribution frozen at onset toward uniform.  On re-observation the
//! prediction is compared with what is seen (see [`ReconcileOutcome`]).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gofi_core::{AgentId, AgentState, BoundingBox, Frame};
use gofi_map::LaneRouter;
use gofi_motion::{Trajectory, TrajectoryPoint};

use crate::{
    CostCache, Goal, GoalDistribution, GoalRecognizer, RecognitionContext, RecognitionError,
    inflation_weight,
};

/// Recognition state of one tracked agent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackingState {
    /// Not observed; beyond view radius or never seen.
    Unobserved,
    /// Observed, but too few samples for an estimate.
    Observing,
    /// Observed with an inverse-planning estimate.
    GoalEstimated,
    /// Hidden by an occlusion; state and goals are extrapolated.
    Occluded,
}

impl TrackingState {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackingState::Unobserved    => "unobserved",
            TrackingState::Observing     => "observing",
            TrackingState::GoalEstimated => "goal_estimated",
            TrackingState::Occluded      => "occluded",
        }
    }
}

/// Result of comparing a re-observed state with the occlusion prediction.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    /// First sighting with nothing to compare against.
    Fresh,
    /// Within tolerance: the pre-occlusion belief is kept and refined.
    Consistent { error: f64 },
    /// Beyond tolerance: history restarts from the re-observation.
    Diverged { error: f64 },
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Fresh => "fresh",
            ReconcileOutcome::Consistent { .. } => "consistent",
            ReconcileOutcome::Diverged { .. } => "diverged",
        }
    }
}

#[derive(Clone, Debug)]
struct Occlusion {
    onset_frame:        Frame,
    /// Frame `anchor` refers to.
    anchor_frame:       Frame,
    anchor:             AgentState,
    onset_distribution: GoalDistribution,
    /// `true` when `anchor` was observed, `false` for a spawn hypothesis.
    observed:           bool,
    /// Presence probability before any evidence.
    prior:              f64,
}

/// Everything the ego believes about one other agent.
#[derive(Clone, Debug)]
pub struct AgentBelief {
    pub agent:    AgentId,
    pub goals:    Vec<Goal>,
    /// Scenario spawn pose, used to hypothesise never-observed agents.
    pub spawn:    AgentState,
    pub length:   f64,
    pub width:    f64,
    priors:       GoalDistribution,
    state:        TrackingState,
    history:      Vec<(Frame, AgentState)>,
    cache:        CostCache,
    distribution: GoalDistribution,
    existence:    f64,
    current:      Option<AgentState>,
    last_seen:    Option<(Frame, AgentState)>,
    occlusion:    Option<Occlusion>,
}

impl AgentBelief {
    pub fn new(agent: AgentId, goals: Vec<Goal>, spawn: AgentState, priors: GoalDistribution) -> Self {
        Self {
            agent,
            goals,
            spawn,
            length: 4.5,
            width: 1.8,
            distribution: priors.clone(),
            priors,
            state: TrackingState::Unobserved,
            history: Vec::new(),
            cache: CostCache::default(),
            existence: 0.0,
            current: None,
            last_seen: None,
            occlusion: None,
        }
    }

    pub fn with_size(mut self, length: f64, width: f64) -> Self {
        self.length = length;
        self.width = width;
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn distribution(&self) -> &GoalDistribution {
        &self.distribution
    }

    /// Probability that the agent exists at all (1 once observed).
    pub fn existence(&self) -> f64 {
        self.existence
    }

    /// Latest observed or extrapolated state.
    pub fn current_state(&self) -> Option<&AgentState> {
        self.current.as_ref()
    }

    /// Observed samples since tracking last (re)started.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Number of cached optimal costs.
    pub fn cached_goals(&self) -> usize {
        self.cache.len()
    }

    pub fn priors(&self) -> &GoalDistribution {
        &self.priors
    }

    /// Presence prior while the belief is an unconfirmed spawn hypothesis.
    pub fn presence_prior(&self) -> Option<f64> {
        match &self.occlusion {
            Some(occ) if self.state == TrackingState::Occluded && !occ.observed => Some(occ.prior),
            _ => None,
        }
    }

    /// Footprint of the current state if the agent is standing still.
    pub fn stopped_footprint(&self) -> Option<BoundingBox> {
        self.current
            .filter(AgentState::is_stopped)
            .map(|s| BoundingBox::new(s.position, self.length, self.width, s.heading))
    }

    /// MAP goal; ties go to the lowest goal id.
    pub fn map_goal(&self) -> Option<(&Goal, f64)> {
        let (id, p) = self.distribution.map_goal()?;
        self.goals.get(id.index()).map(|g| (g, p))
    }

    /// The observed history as a trajectory starting at time 0.
    pub fn observed_trajectory(&self, dt: f64) -> Trajectory {
        let Some(&(first, _)) = self.history.first() else {
            return Trajectory::default();
        };
        let points = self
            .history
            .iter()
            .map(|(f, s)| TrajectoryPoint {
                position: s.position,
                heading:  s.heading,
                speed:    s.speed(),
                time:     f.since(first) as f64 * dt,
            })
            .collect();
        Trajectory::new(points)
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Feed a direct observation.  Returns the reconciliation outcome when
    /// the agent was previously occluded or unobserved.
    pub fn observe<R: LaneRouter>(
        &mut self,
        ctx:      &RecognitionContext<'_, R>,
        frame:    Frame,
        observed: AgentState,
    ) -> Option<ReconcileOutcome> {
        let dt = ctx.dt();
        let outcome = match self.state {
            TrackingState::Occluded => Some(self.reconcile(frame, &observed, dt, ctx.config.occlusion.reconcile_tolerance)),
            TrackingState::Unobserved => {
                self.restart();
                Some(ReconcileOutcome::Fresh)
            }
            TrackingState::Observing | TrackingState::GoalEstimated => None,
        };
        self.occlusion = None;
        self.history.push((frame, observed));
        self.existence = 1.0;
        self.current = Some(observed);
        self.last_seen = Some((frame, observed));
        self.refresh(ctx);
        outcome
    }

    /// Advance the belief through one occluded frame.
    pub fn occlude(&mut self, frame: Frame, dt: f64, inflation_rate: f64, occluded_prior: f64) {
        if self.state != TrackingState::Occluded {
            let (anchor_frame, anchor, observed) = match self.last_seen {
                Some((f, s)) => (f, s, true),
                None => (Frame::ZERO, self.spawn, false),
            };
            self.existence = if observed { 1.0 } else { occluded_prior.clamp(0.0, 1.0) };
            self.occlusion = Some(Occlusion {
                onset_frame: frame,
                anchor_frame,
                anchor,
                onset_distribution: self.distribution.clone(),
                observed,
                prior: self.existence,
            });
            self.state = TrackingState::Occluded;
            debug!(agent = %self.agent, frame = %frame, observed, existence = self.existence, "occlusion onset");
        }
        if let Some(occ) = &self.occlusion {
            let tau = frame.since(occ.onset_frame) as f64 * dt;
            self.distribution = occ.onset_distribution.inflate(inflation_weight(inflation_rate, tau));
            self.current = Some(occ.anchor.extrapolate(frame.since(occ.anchor_frame) as f64 * dt));
        }
    }

    /// The agent left the view radius: forget its history.
    pub fn lose_sight(&mut self) {
        if self.state != TrackingState::Unobserved {
            debug!(agent = %self.agent, "agent out of view");
        }
        self.restart();
        self.state = TrackingState::Unobserved;
        self.occlusion = None;
        self.current = None;
        self.last_seen = None;
        self.existence = 0.0;
    }

    // ── Presence inference ────────────────────────────────────────────────

    /// Per-factor goal weights of this agent's observed history, see
    /// [`GoalRecognizer::factor_weights`].
    pub(crate) fn factor_weights<R: LaneRouter>(
        &mut self,
        ctx:      &RecognitionContext<'_, R>,
        blockers: &[Vec<BoundingBox>],
    ) -> Option<Vec<Vec<f64>>> {
        let observed = self.observed_trajectory(ctx.dt());
        GoalRecognizer::new(ctx).factor_weights(self.agent, &self.goals, &self.priors, &observed, blockers, &mut self.cache)
    }

    pub(crate) fn set_distribution(&mut self, distribution: GoalDistribution) {
        self.distribution = distribution;
    }

    /// Posterior presence of a spawn hypothesis.  Ignored otherwise.
    pub(crate) fn set_existence(&mut self, existence: f64) {
        if self.presence_prior().is_some() {
            self.existence = existence.clamp(0.0, 1.0);
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn restart(&mut self) {
        self.history.clear();
        self.cache.clear();
        self.distribution = self.priors.clone();
    }

    fn reconcile(&mut self, frame: Frame, observed: &AgentState, dt: f64, tolerance: f64) -> ReconcileOutcome {
        let Some(occ) = self.occlusion.take() else {
            self.restart();
            return ReconcileOutcome::Fresh;
        };
        let predicted = occ.anchor.extrapolate(frame.since(occ.anchor_frame) as f64 * dt);
        let error = predicted.position.distance(observed.position);
        if error > tolerance {
            warn!(agent = %self.agent, frame = %frame, error, tolerance, "re-observed state diverged from extrapolation");
            self.restart();
            return ReconcileOutcome::Diverged { error };
        }
        if occ.observed && !self.history.is_empty() {
            // Fill the occluded gap with the extrapolation the belief used.
            let last = self.history.last().map_or(occ.anchor_frame, |&(f, _)| f);
            for k in last.0 + 1..frame.0 {
                let f = Frame(k);
                self.history.push((f, occ.anchor.extrapolate(f.since(occ.anchor_frame) as f64 * dt)));
            }
            self.distribution = occ.onset_distribution;
        } else {
            self.restart();
        }
        ReconcileOutcome::Consistent { error }
    }

    fn refresh<R: LaneRouter>(&mut self, ctx: &RecognitionContext<'_, R>) {
        if self.history.len() < ctx.config.min_observations.max(1) {
            self.state = TrackingState::Observing;
            return;
        }
        let observed = self.observed_trajectory(ctx.dt());
        let recognizer = GoalRecognizer::new(ctx);
        match recognizer.recognize(self.agent, &self.goals, &self.priors, &observed, &mut self.cache) {
            Ok(d) => {
                self.distribution = d;
                self.state = TrackingState::GoalEstimated;
            }
            Err(RecognitionError::UnreachableGoal { .. }) => {
                debug!(agent = %self.agent, "no reachable goal; keeping priors");
                self.distribution = self.priors.clone();
                self.state = TrackingState::Observing;
            }
            Err(e) => {
                warn!(agent = %self.agent, error = %e, "goal recognition failed");
                self.state = TrackingState::Observing;
            }
        }
    }
}
