//! Time-stamped kinematic trajectories.
//!
//! Times are seconds relative to the first point, which is always at
//! `time = 0.0`.  Samples are strictly ordered by time; consecutive samples
//! may share a position (a hold).

use serde::{Deserialize, Serialize};

use gofi_core::{AgentState, Vec2, wrap_angle};

/// One sample of a trajectory.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub position: Vec2,
    pub heading:  f64,
    pub speed:    f64,
    pub time:     f64,
}

impl TrajectoryPoint {
    pub fn to_state(&self) -> AgentState {
        AgentState::new(self.position, self.heading, self.speed)
    }
}

/// An ordered sequence of [`TrajectoryPoint`]s.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn new(points: Vec<TrajectoryPoint>) -> Self {
        Self { points }
    }

    /// A single-sample trajectory at `state`.
    pub fn at_rest(state: &AgentState) -> Self {
        Self::new(vec![TrajectoryPoint {
            position: state.position,
            heading:  state.heading,
            speed:    state.speed(),
            time:     0.0,
        }])
    }

    /// Zero-displacement segment at `state`'s pose lasting `duration`
    /// seconds, sampled every `dt`.
    pub fn hold(state: &AgentState, duration: f64, dt: f64) -> Self {
        let steps = (duration / dt).ceil().max(1.0) as usize;
        let points = (0..=steps)
            .map(|k| TrajectoryPoint {
                position: state.position,
                heading:  state.heading,
                speed:    0.0,
                time:     (k as f64 * dt).min(duration),
            })
            .collect();
        Self::new(points)
    }

    /// Build from a spatial path and a speed per path point.  Times follow
    /// from the average speed over each segment; headings from the path.
    pub fn from_path(path: &[Vec2], speeds: &[f64], start_heading: f64) -> Self {
        debug_assert_eq!(path.len(), speeds.len());
        let mut points = Vec::with_capacity(path.len());
        let mut time = 0.0;
        let mut heading = start_heading;
        for i in 0..path.len() {
            if i > 0 {
                let ds = path[i].distance(path[i - 1]);
                let avg = 0.5 * (speeds[i] + speeds[i - 1]);
                time += ds / avg.max(1e-6);
                if ds > 1e-9 {
                    heading = (path[i] - path[i - 1]).angle();
                }
            }
            points.push(TrajectoryPoint { position: path[i], heading, speed: speeds[i], time });
        }
        Self::new(points)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Time of the last sample.
    pub fn duration(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time)
    }

    /// Travelled path length.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].position.distance(w[1].position)).sum()
    }

    pub fn first(&self) -> Option<&TrajectoryPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    /// State at the final sample, if any.
    pub fn final_state(&self) -> Option<AgentState> {
        self.points.last().map(TrajectoryPoint::to_state)
    }

    /// Linearly interpolated state at time `t` (clamped to the trajectory).
    pub fn state_at(&self, t: f64) -> Option<AgentState> {
        let first = self.points.first()?;
        if t <= first.time {
            return Some(first.to_state());
        }
        let i = self.points.partition_point(|p| p.time <= t);
        if i >= self.points.len() {
            return self.final_state();
        }
        let (a, b) = (&self.points[i - 1], &self.points[i]);
        let span = b.time - a.time;
        let u = if span > 0.0 { (t - a.time) / span } else { 1.0 };
        let position = a.position.lerp(b.position, u);
        let heading = a.heading + wrap_angle(b.heading - a.heading) * u;
        let speed = a.speed + (b.speed - a.speed) * u;
        Some(AgentState::new(position, wrap_angle(heading), speed))
    }

    /// Resample at fixed time step `dt`, always including the final sample.
    pub fn resample(&self, dt: f64) -> Trajectory {
        let duration = self.duration();
        let steps = (duration / dt).floor() as usize;
        let mut points: Vec<TrajectoryPoint> = (0..=steps)
            .filter_map(|k| {
                let t = k as f64 * dt;
                self.state_at(t).map(|s| TrajectoryPoint {
                    position: s.position,
                    heading:  s.heading,
                    speed:    s.speed(),
                    time:     t,
                })
            })
            .collect();
        if let Some(last) = self.points.last() {
            if points.last().is_some_and(|p| duration - p.time > 1e-9) {
                points.push(*last);
            }
        }
        Trajectory::new(points)
    }

    /// Append `next`, which must start where `self` ends.  Its first sample
    /// is dropped and its times are shifted by `self.duration()`.
    pub fn append(&mut self, next: &Trajectory) {
        if self.points.is_empty() {
            self.points.extend_from_slice(&next.points);
            return;
        }
        let offset = self.duration();
        self.points.extend(next.points.iter().skip(1).map(|p| TrajectoryPoint {
            time: p.time + offset,
            ..*p
        }));
    }

    /// The part of the trajectory up to time `t`.
    pub fn truncate_at(&self, t: f64) -> Trajectory {
        let Some(end) = self.state_at(t) else {
            return Trajectory::default();
        };
        let t = t.clamp(0.0, self.duration());
        let mut points: Vec<TrajectoryPoint> =
            self.points.iter().take_while(|p| p.time < t - 1e-9).copied().collect();
        points.push(TrajectoryPoint { position: end.position, heading: end.heading, speed: end.speed(), time: t });
        Trajectory::new(points)
    }

    /// The part of the trajectory from time `t` on, re-based to start at 0.
    pub fn slice_from(&self, t: f64) -> Trajectory {
        let Some(start) = self.state_at(t) else {
            return Trajectory::default();
        };
        let mut points = vec![TrajectoryPoint {
            position: start.position,
            heading:  start.heading,
            speed:    start.speed(),
            time:     0.0,
        }];
        points.extend(
            self.points
                .iter()
                .filter(|p| p.time > t + 1e-9)
                .map(|p| TrajectoryPoint { time: p.time - t, ..*p }),
        );
        Trajectory::new(points)
    }
}
