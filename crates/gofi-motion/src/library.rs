//! The macro-action library: expands a [`MacroAction`] into a [`Trajectory`].
//!
//! # Path construction
//!
//! | Action       | Path                                                           |
//! |--------------|----------------------------------------------------------------|
//! | `Continue`   | current lane chain for `max(v · continue_horizon, min_length)` |
//! | `ChangeLane` | smoothstep blend into the neighbour over `max(v · lane_change_time, min_length)` |
//! | `Exit`       | routed lane path to `turn_target`                              |
//! | `Stop`       | braking distance ahead, then a hold                            |
//!
//! Paths are sampled every `sample_spacing` metres and timed by the
//! [`VelocitySmoother`].  An agent off the lane centre keeps its lateral
//! offset and decays it to zero over the first `min_length` metres.

use serde::{Deserialize, Serialize};

use gofi_core::{AgentState, LaneId, Vec2};
use gofi_map::{DijkstraLaneRouter, LaneRouter, RoadMap, RouteSegment};

use crate::{
    LaneDirection, MacroAction, MotionError, MotionResult, SmootherConfig, Trajectory,
    VelocitySmoother,
};

/// Tunables for path construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroActionConfig {
    /// Seconds of travel a `Continue` covers.
    pub continue_horizon: f64,
    /// Seconds a lane change takes at the current speed.
    pub lane_change_time: f64,
    /// Lower bound on `Continue` and lane-change lengths (m).
    pub min_length:       f64,
    /// Minimum remaining lane length for `Continue` to be feasible (m).
    pub min_remaining:    f64,
    /// Path sampling distance (m).
    pub sample_spacing:   f64,
}

impl Default for MacroActionConfig {
    fn default() -> Self {
        Self {
            continue_horizon: 5.0,
            lane_change_time: 3.0,
            min_length:       10.0,
            min_remaining:    1.0,
            sample_spacing:   0.5,
        }
    }
}

/// Expands macro-actions for any agent.  Shared read-only across rollouts.
pub struct MacroActionLibrary<R: LaneRouter = DijkstraLaneRouter> {
    pub config:   MacroActionConfig,
    pub smoother: VelocitySmoother,
    router:       R,
    max_speed:    f64,
    dt:           f64,
}

impl MacroActionLibrary<DijkstraLaneRouter> {
    pub fn new(config: MacroActionConfig, smoother: SmootherConfig, max_speed: f64, fps: u32) -> Self {
        Self::with_router(config, smoother, max_speed, fps, DijkstraLaneRouter)
    }
}

impl<R: LaneRouter> MacroActionLibrary<R> {
    pub fn with_router(
        config:    MacroActionConfig,
        smoother:  SmootherConfig,
        max_speed: f64,
        fps:       u32,
        router:    R,
    ) -> Self {
        Self {
            config,
            smoother: VelocitySmoother::new(smoother),
            router,
            max_speed,
            dt: 1.0 / fps.max(1) as f64,
        }
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Seconds per simulation frame.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Expand one macro-action from `state`.
    pub fn expand(&self, map: &RoadMap, state: &AgentState, action: &MacroAction) -> MotionResult<Trajectory> {
        let infeasible = |reason: &str| MotionError::InfeasibleAction {
            action: action.clone(),
            reason: reason.to_owned(),
        };
        let result = match action {
            MacroAction::Continue => self.expand_continue(map, state),
            MacroAction::ChangeLane { direction } => self.expand_change_lane(map, state, *direction),
            MacroAction::Exit { turn_target } => self.expand_exit(map, state, *turn_target),
            MacroAction::Stop { duration } => Ok(self.expand_stop(map, state, *duration)),
        };
        result.map_err(|e| match e {
            MotionError::InfeasibleAction { reason, .. } => infeasible(&reason),
            MotionError::InfeasibleProfile { .. } => infeasible(&e.to_string()),
            other => other,
        })
    }

    /// Expand a sequence of macro-actions, chaining each from the final
    /// state of the previous one.
    pub fn expand_plan(&self, map: &RoadMap, state: &AgentState, plan: &[MacroAction]) -> MotionResult<Trajectory> {
        let mut trajectory = Trajectory::at_rest(state);
        let mut current = *state;
        for action in plan {
            let next = self.expand(map, &current, action)?;
            if let Some(end) = next.final_state() {
                current = end;
            }
            trajectory.append(&next);
        }
        Ok(trajectory)
    }

    /// Macro-actions that expand successfully from `state`, in input order.
    pub fn applicable<'a>(
        &self,
        map:        &RoadMap,
        state:      &AgentState,
        candidates: &'a [MacroAction],
    ) -> Vec<(&'a MacroAction, Trajectory)> {
        candidates
            .iter()
            .filter_map(|a| self.expand(map, state, a).ok().map(|t| (a, t)))
            .collect()
    }

    // ── Per-action expansion ──────────────────────────────────────────────

    fn current_lane(&self, map: &RoadMap, state: &AgentState) -> MotionResult<(LaneId, f64, f64)> {
        let lane = map
            .best_lane_at(state.position, state.heading)
            .ok_or_else(|| MotionError::InfeasibleAction {
                action: MacroAction::Continue,
                reason: "agent is not on a lane".into(),
            })?;
        let (s, lateral) = map.project(lane, state.position)?;
        Ok((lane, s, lateral))
    }

    fn expand_continue(&self, map: &RoadMap, state: &AgentState) -> MotionResult<Trajectory> {
        let (lane, s0, lateral) = self.current_lane(map, state)?;
        let want = (self.max_speed * self.config.continue_horizon).max(self.config.min_length);
        let mut path = vec![state.position];
        let covered = self.follow_chain(map, lane, s0, want, lateral, &mut path)?;
        if covered < self.config.min_remaining {
            return Err(MotionError::InfeasibleAction {
                action: MacroAction::Continue,
                reason: format!("only {covered:.2} m of lane left"),
            });
        }
        self.time_path(&path, state, None)
    }

    fn expand_change_lane(&self, map: &RoadMap, state: &AgentState, direction: LaneDirection) -> MotionResult<Trajectory> {
        let action = MacroAction::ChangeLane { direction };
        let (lane_id, s0, lateral) = self.current_lane(map, state)?;
        let lane = map.lane(lane_id)?;
        let target = match direction {
            LaneDirection::Left => lane.left,
            LaneDirection::Right => lane.right,
        }
        .ok_or_else(|| MotionError::InfeasibleAction { action: action.clone(), reason: "no neighbouring lane".into() })?;

        let length = (state.speed() * self.config.lane_change_time).max(self.config.min_length);
        if s0 + length > lane.length() {
            return Err(MotionError::InfeasibleAction { action, reason: "not enough lane left to change".into() });
        }
        let mut path = vec![state.position];
        self.blend(map, lane_id, target, s0, length, lateral, &mut path)?;
        self.time_path(&path, state, None)
    }

    fn expand_exit(&self, map: &RoadMap, state: &AgentState, turn_target: Vec2) -> MotionResult<Trajectory> {
        let action = MacroAction::Exit { turn_target };
        if !map.contains(turn_target) {
            return Err(MotionError::InfeasibleAction { action, reason: "target outside map bounds".into() });
        }
        let (lane, s0, lateral) = self.current_lane(map, state)?;
        let change = (state.speed() * self.config.lane_change_time).max(self.config.min_length);
        let route = self
            .router
            .route(map, lane, s0, turn_target, change)
            .map_err(|e| MotionError::InfeasibleAction { action: action.clone(), reason: e.to_string() })?;
        if route.length_m < self.config.min_remaining {
            return Err(MotionError::InfeasibleAction { action, reason: "target already reached".into() });
        }

        let mut path = vec![state.position];
        let mut offset = lateral;
        for segment in &route.segments {
            match *segment {
                RouteSegment::Follow { lane, from_s, to_s } => {
                    self.follow_chain(map, lane, from_s, to_s - from_s, offset, &mut path)?;
                }
                RouteSegment::ChangeLane { from_lane, to_lane, from_s, length } => {
                    self.blend(map, from_lane, to_lane, from_s, length, offset, &mut path)?;
                }
            }
            offset = 0.0;
        }
        self.time_path(&path, state, None)
    }

    fn expand_stop(&self, map: &RoadMap, state: &AgentState, duration: f64) -> Trajectory {
        let mut trajectory = Trajectory::at_rest(state);
        let mut rest = *state;
        if !state.is_stopped() {
            // 10 % slack so the sampled profile always reaches zero.
            let distance = self.smoother.stopping_distance(state.speed()) * 1.1 + self.config.sample_spacing;
            let mut path = vec![state.position];
            let on_lane = self
                .current_lane(map, state)
                .and_then(|(lane, s0, lateral)| self.follow_chain(map, lane, s0, distance, lateral, &mut path));
            if !matches!(on_lane, Ok(covered) if covered + 1e-6 >= distance) {
                path.truncate(1);
                straight_path(state, distance, self.config.sample_spacing, &mut path);
            }
            let braking = self
                .time_path(&path, state, Some(0.0))
                .unwrap_or_else(|_| Trajectory::at_rest(state));
            if let Some(end) = braking.final_state() {
                rest = AgentState { velocity: Vec2::ZERO, ..end };
            }
            trajectory.append(&braking);
        }
        trajectory.append(&Trajectory::hold(&rest, duration.max(0.0), self.dt));
        trajectory
    }

    // ── Path helpers ──────────────────────────────────────────────────────

    /// Append midline samples along the lane chain from `s0` for up to
    /// `length` metres.  Returns the length actually covered.
    fn follow_chain(
        &self,
        map:     &RoadMap,
        lane:    LaneId,
        s0:      f64,
        length:  f64,
        lateral: f64,
        path:    &mut Vec<Vec2>,
    ) -> MotionResult<f64> {
        let step = self.config.sample_spacing;
        let decay = self.config.min_length.max(step);
        let mut covered = 0.0;
        let mut lane = lane;
        let mut s = s0;
        loop {
            let l = map.lane(lane)?;
            let take = (l.length() - s).max(0.0).min(length - covered);
            let n = (take / step).ceil() as usize;
            for k in 1..=n {
                let ds = take * k as f64 / n as f64;
                let offset = lateral * (1.0 - (covered + ds) / decay).max(0.0);
                let normal = Vec2::from_heading(l.heading_at(s + ds)).perp();
                path.push(l.point_at(s + ds) + normal * offset);
            }
            covered += take;
            s += take;
            if length - covered <= 1e-9 {
                break;
            }
            match map.next_lane(lane) {
                Some(next) => {
                    lane = next;
                    s = 0.0;
                }
                None => break,
            }
        }
        Ok(covered)
    }

    /// Append samples blending from `from` to `to` over `length` metres.
    #[allow(clippy::too_many_arguments)]
    fn blend(
        &self,
        map:     &RoadMap,
        from:    LaneId,
        to:      LaneId,
        s0:      f64,
        length:  f64,
        lateral: f64,
        path:    &mut Vec<Vec2>,
    ) -> MotionResult<()> {
        let a = map.lane(from)?;
        let b = map.lane(to)?;
        let (b_s0, _) = b.project(a.point_at(s0));
        let n = (length / self.config.sample_spacing).ceil().max(1.0) as usize;
        for k in 1..=n {
            let u = k as f64 / n as f64;
            let d = length * u;
            let w = u * u * (3.0 - 2.0 * u);
            let normal = Vec2::from_heading(a.heading_at(s0 + d)).perp();
            let pa = a.point_at(s0 + d) + normal * (lateral * (1.0 - w));
            let pb = b.point_at(b_s0 + d);
            path.push(pa.lerp(pb, w));
        }
        Ok(())
    }

    fn time_path(&self, path: &[Vec2], state: &AgentState, v_end: Option<f64>) -> MotionResult<Trajectory> {
        let mut s = Vec::with_capacity(path.len());
        let mut acc = 0.0;
        s.push(0.0);
        for w in path.windows(2) {
            acc += w[0].distance(w[1]);
            s.push(acc);
        }
        let speeds = self.smoother.smooth(&s, state.speed(), self.max_speed, v_end)?;
        Ok(Trajectory::from_path(path, &speeds, state.heading))
    }
}

fn straight_path(state: &AgentState, distance: f64, step: f64, path: &mut Vec<Vec2>) {
    let dir = Vec2::from_heading(state.heading);
    let n = (distance / step).ceil().max(1.0) as usize;
    for k in 1..=n {
        path.push(state.position + dir * (distance * k as f64 / n as f64));
    }
}
