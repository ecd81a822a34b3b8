//! Velocity smoother: turns a raw path into a dynamically feasible speed
//! profile.
//!
//! # Algorithm
//!
//! Speeds live on the path samples.  Starting from the target speed
//! everywhere (with the start and optional end speed pinned):
//!
//! 1. **forward pass** — cap `v[i]` by what `amax` allows from `v[i-1]`;
//! 2. **backward pass** — cap `v[i]` by what `dmax` allows to reach `v[i+1]`;
//! 3. if the backward pass pulled the start below its pinned value, no
//!    bounded profile exists: [`MotionError::InfeasibleProfile`];
//! 4. **smoothing** — blend interior samples toward their neighbours' mean
//!    by `lambda_acc`, then repeat both passes to restore the bounds.

use serde::{Deserialize, Serialize};

use crate::{MotionError, MotionResult};

/// Acceleration bounds and smoothing weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    /// Lowest speed the smoothing pass may pull a sample down to (m/s),
    /// capped at the cruise speed.
    pub vmin_m_s:   f64,
    /// Maximum acceleration (m/s²).
    pub amax_m_s2:  f64,
    /// Maximum comfortable deceleration (m/s²).
    pub dmax_m_s2:  f64,
    /// Neighbour-averaging weight in `[0, 1]`; 0 disables smoothing.
    pub lambda_acc: f64,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self { vmin_m_s: 1.0, amax_m_s2: 3.0, dmax_m_s2: 4.0, lambda_acc: 0.5 }
    }
}

/// Stateless speed-profile generator.  Cheap to clone and `Sync`, so one
/// instance is shared by every rollout.
#[derive(Clone, Debug, Default)]
pub struct VelocitySmoother {
    pub config: SmootherConfig,
}

impl VelocitySmoother {
    pub fn new(config: SmootherConfig) -> Self {
        Self { config }
    }

    /// Distance needed to brake from `speed` to standstill.
    pub fn stopping_distance(&self, speed: f64) -> f64 {
        speed * speed / (2.0 * self.config.dmax_m_s2)
    }

    /// Speed profile over the cumulative arc lengths `s` (ascending, `s[0]`
    /// = 0).  `v0` is the current speed, `v_max` the cruise cap, and `v_end`
    /// an optional required final speed.
    pub fn smooth(&self, s: &[f64], v0: f64, v_max: f64, v_end: Option<f64>) -> MotionResult<Vec<f64>> {
        let n = s.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        let cruise = v_max.max(0.0);
        let v0 = v0.clamp(0.0, cruise);
        let mut v = vec![cruise; n];
        v[0] = v0;
        if n == 1 {
            return Ok(v);
        }
        if let Some(end) = v_end {
            v[n - 1] = end.clamp(0.0, cruise);
        }

        self.clamp_passes(s, &mut v);
        if v[0] < v0 - 1e-6 {
            return Err(MotionError::InfeasibleProfile {
                v0,
                v_end: v_end.unwrap_or(cruise),
                length: s[n - 1],
            });
        }
        v[0] = v0;

        let lambda = self.config.lambda_acc.clamp(0.0, 1.0);
        if lambda > 0.0 && n > 2 {
            let floor = self.config.vmin_m_s.min(cruise);
            let prev = v.clone();
            for i in 1..n - 1 {
                let blended = (1.0 - lambda) * prev[i] + lambda * 0.5 * (prev[i - 1] + prev[i + 1]);
                v[i] = blended.max(floor.min(prev[i]));
            }
            self.clamp_passes(s, &mut v);
            v[0] = v0;
        }
        Ok(v)
    }

    fn clamp_passes(&self, s: &[f64], v: &mut [f64]) {
        let n = v.len();
        for i in 1..n {
            let ds = (s[i] - s[i - 1]).max(0.0);
            let reach = (v[i - 1] * v[i - 1] + 2.0 * self.config.amax_m_s2 * ds).sqrt();
            v[i] = v[i].min(reach);
        }
        for i in (0..n - 1).rev() {
            let ds = (s[i + 1] - s[i]).max(0.0);
            let reach = (v[i + 1] * v[i + 1] + 2.0 * self.config.dmax_m_s2 * ds).sqrt();
            v[i] = v[i].min(reach);
        }
    }
}
