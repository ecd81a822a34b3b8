//! Search and reward settings, deserialised from the `mcts` block of the ego
//! agent in a scenario file.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use gofi_motion::CostFactors;

/// How much of each search to keep for offline inspection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreResults {
    #[default]
    None,
    /// Root child statistics.
    Final,
    /// Root child statistics and one record per rollout.
    All,
}

/// MCTS budget, cadence and policy constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Replanning interval (s).  Also the duration of the ego's `Stop`.
    pub t_update:      f64,
    pub n_simulations: usize,
    /// Macro-actions per simulation; 0 behaves as 1.
    pub max_depth:     usize,
    pub reward:        RewardConfig,
    /// UCB1 exploration constant.
    pub exploration:   f64,
    /// Leaves selected per batch before their rollouts run.
    pub rollout_batch: usize,
    pub store_results: StoreResults,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            t_update:      2.0,
            n_simulations: 30,
            max_depth:     5,
            reward:        RewardConfig::default(),
            exploration:   std::f64::consts::SQRT_2,
            rollout_batch: 1,
            store_results: StoreResults::None,
        }
    }
}

impl MctsConfig {
    /// First field with an unusable value, if any.
    pub fn invalid_field(&self) -> Option<&'static str> {
        if !(self.t_update.is_finite() && self.t_update > 0.0) {
            return Some("t_update");
        }
        if self.n_simulations == 0 {
            return Some("n_simulations");
        }
        if self.max_depth == 0 {
            return Some("max_depth");
        }
        if self.rollout_batch == 0 {
            return Some("rollout_batch");
        }
        if !(self.exploration.is_finite() && self.exploration >= 0.0) {
            return Some("exploration");
        }
        self.reward.factors.entries().into_iter().find(|(_, w)| !w.is_finite()).map(|(n, _)| n)
    }

    /// Effective depth cap.
    pub fn depth(&self) -> usize {
        self.max_depth.max(1)
    }
}

/// Rollout reward model.  `factors` are signed: a negative weight
/// penalises its metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Per-metric weights.  Keys absent from a scenario's block are 0.
    #[serde(deserialize_with = "signed_factors")]
    pub factors:   CostFactors,
    /// Reward for colliding, scaled by the other agent's existence
    /// probability.
    pub collision: f64,
    /// Reward for reaching a state with no feasible macro-action.
    pub dead_end:  f64,
    /// Reward for reaching the goal box.
    pub goal:      f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        let mut factors = CostFactors::zero();
        factors.time = -1.0;
        factors.jerk = -0.1;
        factors.angular_velocity = -0.1;
        factors.curvature = -0.1;
        Self { factors, collision: -100.0, dead_end: -20.0, goal: 50.0 }
    }
}

fn signed_factors<'de, D: Deserializer<'de>>(d: D) -> Result<CostFactors, D::Error> {
    let raw = BTreeMap::<String, f64>::deserialize(d)?;
    let mut factors = CostFactors::zero();
    for (name, weight) in raw {
        if !factors.set(&name, weight) {
            return Err(serde::de::Error::custom(format!("unknown reward factor `{name}`")));
        }
    }
    Ok(factors)
}
