//! Recognition settings, deserialised from the `goal_recognition` block of a
//! scenario agent.

use serde::{Deserialize, Serialize};

/// Inverse-planning settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalRecognitionConfig {
    /// Rationality coefficient: higher values concentrate probability on the
    /// goal whose optimal cost best explains the observations.
    pub beta: f64,
    /// Optional prior per candidate goal (normalised on use).  Uniform when
    /// absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_priors: Option<Vec<f64>>,
    /// Observations needed before a distribution is estimated.
    pub min_observations: usize,
    pub occlusion: OcclusionConfig,
}

impl Default for GoalRecognitionConfig {
    fn default() -> Self {
        Self { beta: 1.0, goal_priors: None, min_observations: 2, occlusion: OcclusionConfig::default() }
    }
}

/// Occlusion belief tracking settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionConfig {
    /// Rate (1/s) at which a frozen distribution relaxes toward uniform.
    pub inflation_rate:      f64,
    /// Distance (m) between extrapolated and re-observed position within
    /// which the pre-occlusion belief is kept.
    pub reconcile_tolerance: f64,
    /// Existence probability of an agent hypothesised from its spawn pose
    /// before it was ever observed.
    pub occluded_prior:      f64,
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self { inflation_rate: 0.2, reconcile_tolerance: 2.0, occluded_prior: 0.1 }
    }
}
