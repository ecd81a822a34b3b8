//! Load-time checks.  Every failure is fatal and names the offending agent
//! and field.

use std::collections::BTreeSet;

use gofi_core::AgentId;

use crate::{AgentDescriptor, ScenarioError, ScenarioFile, ScenarioResult};

fn invalid(msg: impl Into<String>) -> ScenarioError {
    ScenarioError::InvalidConfiguration(msg.into())
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Check a parsed scenario.  Called by every loader.
pub fn validate(file: &ScenarioFile) -> ScenarioResult<()> {
    let s = &file.scenario;
    if s.fps == 0 {
        return Err(invalid("scenario.fps must be positive"));
    }
    if !positive(s.max_speed) {
        return Err(invalid("scenario.max_speed must be positive"));
    }

    let mut ids = BTreeSet::new();
    for a in &file.agents {
        if !ids.insert(a.id) {
            return Err(invalid(format!("duplicate agent id {}", a.id.0)));
        }
    }
    match file.agents.iter().filter(|a| a.role.is_ego()).count() {
        0 => return Err(invalid("scenario has no Ego agent")),
        1 => {}
        n => return Err(invalid(format!("scenario has {n} Ego agents, expected one"))),
    }

    for a in &file.agents {
        validate_agent(a, &ids, s.max_speed)?;
    }
    Ok(())
}

fn validate_agent(a: &AgentDescriptor, ids: &BTreeSet<AgentId>, max_speed: f64) -> ScenarioResult<()> {
    let id = a.id.0;
    if a.goals.is_empty() {
        return Err(invalid(format!("agent {id} has no goals")));
    }
    if !(positive(a.length()) && positive(a.width())) {
        return Err(invalid(format!("agent {id}: spawn box must have positive length and width")));
    }
    if let Some(name) = a.cost_factors.invalid_weight() {
        return Err(invalid(format!("agent {id}: cost_factors.{name} must be non-negative")));
    }
    if let Some(name) = a.mcts.invalid_field() {
        return Err(invalid(format!("agent {id}: mcts.{name} is out of range")));
    }
    if !positive(a.view_radius) {
        return Err(invalid(format!("agent {id}: view_radius must be positive")));
    }

    let gr = &a.goal_recognition;
    if !positive(gr.beta) {
        return Err(invalid(format!("agent {id}: goal_recognition.beta must be positive")));
    }
    if let Some(priors) = &gr.goal_priors {
        if priors.len() != a.goals.len() {
            return Err(invalid(format!(
                "agent {id}: {} goal_priors for {} goals",
                priors.len(),
                a.goals.len()
            )));
        }
        if priors.iter().any(|p| !(p.is_finite() && *p >= 0.0)) || priors.iter().sum::<f64>() <= 0.0 {
            return Err(invalid(format!("agent {id}: goal_priors must be non-negative with a positive sum")));
        }
    }
    let occ = &gr.occlusion;
    if !(occ.inflation_rate.is_finite() && occ.inflation_rate >= 0.0) {
        return Err(invalid(format!("agent {id}: occlusion.inflation_rate must be non-negative")));
    }
    if !positive(occ.reconcile_tolerance) {
        return Err(invalid(format!("agent {id}: occlusion.reconcile_tolerance must be positive")));
    }
    if !(0.0..=1.0).contains(&occ.occluded_prior) {
        return Err(invalid(format!("agent {id}: occlusion.occluded_prior must lie in [0, 1]")));
    }

    let vs = &a.velocity_smoother;
    if !(vs.vmin_m_s.is_finite() && vs.vmin_m_s >= 0.0) {
        return Err(invalid(format!("agent {id}: velocity_smoother.vmin_m_s must be non-negative")));
    }
    if vs.vmin_m_s > max_speed {
        return Err(invalid(format!(
            "agent {id}: velocity_smoother.vmin_m_s {} exceeds scenario.max_speed {max_speed}",
            vs.vmin_m_s
        )));
    }
    if !(positive(vs.amax_m_s2) && positive(vs.dmax_m_s2)) {
        return Err(invalid(format!("agent {id}: velocity_smoother acceleration bounds must be positive")));
    }
    if !(0.0..=1.0).contains(&vs.lambda_acc) {
        return Err(invalid(format!("agent {id}: velocity_smoother.lambda_acc must lie in [0, 1]")));
    }

    validate_occlusions(a, ids)
}

fn validate_occlusions(a: &AgentDescriptor, ids: &BTreeSet<AgentId>) -> ScenarioResult<()> {
    let id = a.id.0;
    if a.role.is_ego() && !a.occlusions.is_empty() {
        return Err(invalid(format!("agent {id}: the Ego cannot carry occlusion records")));
    }
    let mut previous_end = None;
    for r in &a.occlusions {
        if r.start_frame >= r.end_frame {
            return Err(invalid(format!(
                "agent {id}: occlusion [{}, {}) is empty or reversed",
                r.start_frame.0, r.end_frame.0
            )));
        }
        if let Some(end) = previous_end {
            if r.start_frame < end {
                return Err(invalid(format!(
                    "agent {id}: occlusion starting at frame {} overlaps or precedes the previous one",
                    r.start_frame.0
                )));
            }
        }
        previous_end = Some(r.end_frame);

        if r.by_agent == a.id {
            return Err(invalid(format!("agent {id}: occlusion names the agent as its own occluder")));
        }
        if !ids.contains(&r.by_agent) {
            return Err(invalid(format!("agent {id}: occluding agent {} does not exist", r.by_agent.0)));
        }
    }
    Ok(())
}

