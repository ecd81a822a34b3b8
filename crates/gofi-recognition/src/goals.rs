//! Candidate goals and probability distributions over them.

use serde::{Deserialize, Serialize};

use gofi_core::{BoundingBox, GoalId, Vec2};

/// A candidate destination region.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id:     GoalId,
    pub region: BoundingBox,
}

impl Goal {
    pub fn new(id: GoalId, region: BoundingBox) -> Self {
        Self { id, region }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.region.center
    }

    #[inline]
    pub fn reached(&self, position: Vec2) -> bool {
        self.region.contains(position)
    }
}

/// `λ(τ) = 1 − exp(−rate · τ)`: how far an occluded belief has relaxed toward
/// uniform after `tau` seconds.  0 at onset, → 1 as `tau` grows.
pub fn inflation_weight(rate: f64, tau: f64) -> f64 {
    1.0 - (-rate.max(0.0) * tau.max(0.0)).exp()
}

/// A probability vector indexed by `GoalId`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalDistribution {
    probs: Vec<f64>,
}

impl GoalDistribution {
    pub fn uniform(n: usize) -> Self {
        let p = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        Self { probs: vec![p; n] }
    }

    /// Normalise `weights`; falls back to uniform when they do not sum to a
    /// positive finite value.
    pub fn normalized(weights: Vec<f64>) -> Self {
        let total: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
        if !(total > 0.0 && total.is_finite()) {
            return Self::uniform(weights.len());
        }
        let probs = weights
            .into_iter()
            .map(|w| if w.is_finite() && w > 0.0 { w / total } else { 0.0 })
            .collect();
        Self { probs }
    }

    /// Priors for `n` goals: the configured weights if their length matches,
    /// otherwise uniform.
    pub fn priors(configured: Option<&[f64]>, n: usize) -> Self {
        match configured {
            Some(w) if w.len() == n => Self::normalized(w.to_vec()),
            _ => Self::uniform(n),
        }
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    pub fn get(&self, goal: GoalId) -> f64 {
        self.probs.get(goal.index()).copied().unwrap_or(0.0)
    }

    /// Shannon entropy in nats.
    pub fn entropy(&self) -> f64 {
        self.probs.iter().filter(|&&p| p > 0.0).map(|&p| -p * p.ln()).sum()
    }

    /// Maximum-a-posteriori goal; ties go to the lowest id.
    pub fn map_goal(&self) -> Option<(GoalId, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &p) in self.probs.iter().enumerate() {
            if best.is_none_or(|(_, b)| p > b) {
                best = Some((i, p));
            }
        }
        best.map(|(i, p)| (GoalId(i as u16), p))
    }

    /// Mix toward uniform: `(1 − λ) p + λ u`.
    pub fn inflate(&self, lambda: f64) -> Self {
        let lambda = lambda.clamp(0.0, 1.0);
        let u = if self.probs.is_empty() { 0.0 } else { 1.0 / self.probs.len() as f64 };
        Self { probs: self.probs.iter().map(|&p| (1.0 - lambda) * p + lambda * u).collect() }
    }
}
