//! Trajectory cost evaluator.
//!
//! # Metrics
//!
//! All metrics are non-negative and grow with the quantity they measure, so
//! the weighted sum is monotone in every factor for non-negative weights.
//! Each is computed on the trajectory resampled at the simulation step `dt`.
//!
//! | Factor                 | Metric                                               |
//! |------------------------|------------------------------------------------------|
//! | `time`                 | duration (s)                                         |
//! | `velocity`             | distance travelled (m)                               |
//! | `acceleration`         | ∫ \|a\| dt                                           |
//! | `jerk`                 | ∫ \|j\| dt                                           |
//! | `heading`              | \|net heading change\| (rad)                         |
//! | `angular_velocity`     | ∫ \|ω\| dt                                           |
//! | `angular_acceleration` | ∫ \|α\| dt                                           |
//! | `curvature`            | ∫ \|κ\| dt                                           |
//! | `safety`               | ∫ max(0, d_safe − d_other) dt over other agents      |

use serde::{Deserialize, Serialize};

use gofi_core::wrap_angle;

use crate::Trajectory;

// ── CostFactors ───────────────────────────────────────────────────────────────

/// Named non-negative weights, one per metric.  Keys missing from a
/// scenario file take the [`Default`] values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostFactors {
    pub time:                 f64,
    pub velocity:             f64,
    pub acceleration:         f64,
    pub jerk:                 f64,
    pub heading:              f64,
    pub angular_velocity:     f64,
    pub angular_acceleration: f64,
    pub curvature:            f64,
    pub safety:               f64,
}

impl Default for CostFactors {
    fn default() -> Self {
        Self {
            time:                 1.0,
            velocity:             0.0,
            acceleration:         0.0,
            jerk:                 1.0,
            heading:              0.0,
            angular_velocity:     1.0,
            angular_acceleration: 0.0,
            curvature:            0.0,
            safety:               0.0,
        }
    }
}

impl CostFactors {
    /// All weights zero.
    pub fn zero() -> Self {
        Self {
            time:                 0.0,
            velocity:             0.0,
            acceleration:         0.0,
            jerk:                 0.0,
            heading:              0.0,
            angular_velocity:     0.0,
            angular_acceleration: 0.0,
            curvature:            0.0,
            safety:               0.0,
        }
    }

    /// Set the weight called `name`.  Returns `false` for an unknown name.
    pub fn set(&mut self, name: &str, weight: f64) -> bool {
        let slot = match name {
            "time" => &mut self.time,
            "velocity" => &mut self.velocity,
            "acceleration" => &mut self.acceleration,
            "jerk" => &mut self.jerk,
            "heading" => &mut self.heading,
            "angular_velocity" => &mut self.angular_velocity,
            "angular_acceleration" => &mut self.angular_acceleration,
            "curvature" => &mut self.curvature,
            "safety" => &mut self.safety,
            _ => return false,
        };
        *slot = weight;
        true
    }

    /// `(name, weight)` pairs in canonical order.
    pub fn entries(&self) -> [(&'static str, f64); 9] {
        [
            ("time", self.time),
            ("velocity", self.velocity),
            ("acceleration", self.acceleration),
            ("jerk", self.jerk),
            ("heading", self.heading),
            ("angular_velocity", self.angular_velocity),
            ("angular_acceleration", self.angular_acceleration),
            ("curvature", self.curvature),
            ("safety", self.safety),
        ]
    }

    /// First factor with a negative or non-finite weight, if any.
    pub fn invalid_weight(&self) -> Option<&'static str> {
        self.entries().into_iter().find(|(_, w)| !(w.is_finite() && *w >= 0.0)).map(|(n, _)| n)
    }
}

// ── TrajectoryMetrics ─────────────────────────────────────────────────────────

/// Raw per-factor metrics of one trajectory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryMetrics {
    pub time:                 f64,
    pub velocity:             f64,
    pub acceleration:         f64,
    pub jerk:                 f64,
    pub heading:              f64,
    pub angular_velocity:     f64,
    pub angular_acceleration: f64,
    pub curvature:            f64,
    pub safety:               f64,
}

impl TrajectoryMetrics {
    /// Weighted sum with signed or unsigned `weights`.
    pub fn weighted(&self, w: &CostFactors) -> f64 {
        self.time * w.time
            + self.velocity * w.velocity
            + self.acceleration * w.acceleration
            + self.jerk * w.jerk
            + self.heading * w.heading
            + self.angular_velocity * w.angular_velocity
            + self.angular_acceleration * w.angular_acceleration
            + self.curvature * w.curvature
            + self.safety * w.safety
    }
}

// ── CostEvaluator ─────────────────────────────────────────────────────────────

/// Computes [`TrajectoryMetrics`] at a fixed time step.
#[derive(Clone, Debug)]
pub struct CostEvaluator {
    pub dt:              f64,
    /// Distance below which another agent contributes to `safety` (m).
    pub safety_distance: f64,
}

impl CostEvaluator {
    pub fn new(fps: u32) -> Self {
        Self { dt: 1.0 / fps.max(1) as f64, safety_distance: 5.0 }
    }

    /// Metrics of `trajectory` alone (safety is 0).
    pub fn metrics(&self, trajectory: &Trajectory) -> TrajectoryMetrics {
        self.metrics_against(trajectory, &[])
    }

    /// Metrics of `trajectory`, with `safety` measured against `others`
    /// (trajectories of other agents on the same time base).
    pub fn metrics_against(&self, trajectory: &Trajectory, others: &[&Trajectory]) -> TrajectoryMetrics {
        let pts = trajectory.resample(self.dt).points;
        let mut m = TrajectoryMetrics { time: trajectory.duration(), ..Default::default() };
        if pts.len() < 2 {
            return m;
        }

        let steps: Vec<f64> = pts.windows(2).map(|w| (w[1].time - w[0].time).max(1e-9)).collect();
        let accel: Vec<f64> = pts.windows(2).zip(&steps).map(|(w, h)| (w[1].speed - w[0].speed) / h).collect();
        let omega: Vec<f64> = pts
            .windows(2)
            .zip(&steps)
            .map(|(w, h)| wrap_angle(w[1].heading - w[0].heading) / h)
            .collect();

        for (i, w) in pts.windows(2).enumerate() {
            let h = steps[i];
            let ds = w[0].position.distance(w[1].position);
            m.velocity += ds;
            m.acceleration += accel[i].abs() * h;
            m.angular_velocity += omega[i].abs() * h;
            if ds > 1e-6 {
                m.curvature += (wrap_angle(w[1].heading - w[0].heading) / ds).abs() * h;
            }
        }
        // ∫|Δa / h| h = Σ|Δa|
        for i in 1..accel.len() {
            m.jerk += (accel[i] - accel[i - 1]).abs();
            m.angular_acceleration += (omega[i] - omega[i - 1]).abs();
        }
        if let (Some(first), Some(last)) = (pts.first(), pts.last()) {
            m.heading = wrap_angle(last.heading - first.heading).abs();
        }

        for other in others {
            for (i, p) in pts.iter().enumerate() {
                let Some(o) = other.state_at(p.time) else { continue };
                let h = if i + 1 < pts.len() { steps[i] } else { 0.0 };
                m.safety += (self.safety_distance - p.position.distance(o.position)).max(0.0) * h;
            }
        }
        m
    }

    /// Non-negative weighted cost of `trajectory`.
    pub fn cost(&self, trajectory: &Trajectory, factors: &CostFactors) -> f64 {
        self.metrics(trajectory).weighted(factors)
    }
}
