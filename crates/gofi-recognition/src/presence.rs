//! Joint presence belief over agents that are hypothesised but have never
//! been seen.
//!
//! With `n` such agents there are `2ⁿ` presence factors, one per
//! present/absent assignment.  Observed agents are evidence: an agent that
//! swerves around an empty stretch of road makes a hidden obstacle there
//! more likely.
//!
//! ```text
//! P(g, z | o) ∝ P(o | g, z) · P(g) · P(z)
//! P(z | o)    = Σ_g P(g, z | o)
//! P(g | z, o) = P(g, z | o) / P(z | o)        (P(g) when P(z | o) = 0)
//! ```
//!
//! Observed agents are folded in one at a time in increasing id order; the
//! factor posterior after one agent is the factor prior of the next.  The
//! posterior after the last agent is the belief every agent shares.

use gofi_core::AgentId;

use crate::GoalDistribution;

/// One present/absent assignment, indexed like [`PresenceBelief::agents`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PresenceFactor {
    present: Vec<bool>,
}

impl PresenceFactor {
    pub fn is_present(&self, k: usize) -> bool {
        self.present.get(k).copied().unwrap_or(false)
    }

    /// Indices of the agents this factor puts on the road.
    pub fn present(&self) -> impl Iterator<Item = usize> + '_ {
        self.present.iter().enumerate().filter(|(_, p)| **p).map(|(k, _)| k)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.present
    }
}

/// Distribution over every [`PresenceFactor`] of a set of agents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PresenceBelief {
    agents:  Vec<AgentId>,
    factors: Vec<PresenceFactor>,
    probs:   Vec<f64>,
}

impl PresenceBelief {
    /// Independent per-agent priors.  Factors are ordered like a binary
    /// counter with "present" first, so factor 0 has everyone present and
    /// the last factor nobody.
    pub fn new(priors: &[(AgentId, f64)]) -> Self {
        let n = priors.len();
        let factors: Vec<PresenceFactor> = (0..1usize << n)
            .map(|i| PresenceFactor { present: (0..n).map(|k| (i >> (n - 1 - k)) & 1 == 0).collect() })
            .collect();
        let probs = factors
            .iter()
            .map(|f| {
                priors
                    .iter()
                    .zip(&f.present)
                    .map(|(&(_, p), &on)| {
                        let p = p.clamp(0.0, 1.0);
                        if on { p } else { 1.0 - p }
                    })
                    .product()
            })
            .collect();
        Self { agents: priors.iter().map(|&(a, _)| a).collect(), factors, probs }
    }

    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    pub fn factors(&self) -> &[PresenceFactor] {
        &self.factors
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Marginal probability that `agent` is present.
    pub fn existence(&self, agent: AgentId) -> Option<f64> {
        let k = self.agents.iter().position(|&a| a == agent)?;
        Some(
            self.factors
                .iter()
                .zip(&self.probs)
                .filter(|(f, _)| f.is_present(k))
                .map(|(_, p)| p)
                .sum(),
        )
    }

    /// Fold in one observed agent.  `weights[z][g]` is the unnormalised
    /// `P(o | g, z) · P(g)`.  Returns `P(g | z, o)` per factor, or `None`
    /// (belief unchanged) when every factor has zero mass.
    pub fn update(&mut self, weights: &[Vec<f64>], goal_priors: &GoalDistribution) -> Option<Vec<GoalDistribution>> {
        if weights.len() != self.probs.len() {
            return None;
        }
        let joint: Vec<Vec<f64>> = weights
            .iter()
            .zip(&self.probs)
            .map(|(row, pz)| row.iter().map(|w| w * pz).collect())
            .collect();
        let mass: Vec<f64> = joint.iter().map(|row| row.iter().sum()).collect();
        let total: f64 = mass.iter().sum();
        if !(total > 0.0 && total.is_finite()) {
            return None;
        }

        self.probs = mass.iter().map(|m| m / total).collect();
        Some(
            joint
                .into_iter()
                .zip(&mass)
                .map(|(row, &m)| if m > 0.0 { GoalDistribution::normalized(row) } else { goal_priors.clone() })
                .collect(),
        )
    }

    /// `Σ_z P(z) · P(g | z)`.
    pub fn goal_marginal(&self, conditionals: &[GoalDistribution]) -> GoalDistribution {
        let n = conditionals.iter().map(GoalDistribution::len).max().unwrap_or(0);
        let mut weights = vec![0.0; n];
        for (d, pz) in conditionals.iter().zip(&self.probs) {
            for (w, p) in weights.iter_mut().zip(d.as_slice()) {
                *w += pz * p;
            }
        }
        GoalDistribution::normalized(weights)
    }

    /// The factor at cumulative probability `u ∈ [0, 1)`.  Zero-probability
    /// factors are never returned.
    pub fn sample(&self, u: f64) -> Option<&PresenceFactor> {
        let mut acc = 0.0;
        let mut last = None;
        for (f, &p) in self.factors.iter().zip(&self.probs) {
            if p <= 0.0 {
                continue;
            }
            acc += p;
            last = Some(f);
            if u < acc {
                return Some(f);
            }
        }
        last
    }
}
