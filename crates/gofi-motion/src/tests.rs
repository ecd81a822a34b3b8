//! Unit tests for gofi-motion.

#[cfg(test)]
mod helpers {
    use gofi_core::{AgentState, Vec2};
    use gofi_map::{RoadMap, RoadMapBuilder};

    use crate::{MacroActionConfig, MacroActionLibrary, SmootherConfig};

    /// Two parallel eastbound lanes from x = -60 to x = 100.
    pub fn two_lane_road() -> RoadMap {
        let mut b = RoadMapBuilder::new();
        let right = b.add_lane(vec![Vec2::new(-60.0, -1.75), Vec2::new(100.0, -1.75)], 3.5);
        let left  = b.add_lane(vec![Vec2::new(-60.0, 1.75), Vec2::new(100.0, 1.75)], 3.5);
        b.link_adjacent(left, right);
        b.build().unwrap()
    }

    pub fn library() -> MacroActionLibrary {
        MacroActionLibrary::new(MacroActionConfig::default(), SmootherConfig::default(), 10.0, 20)
    }

    pub fn eastbound(x: f64, y: f64, speed: f64) -> AgentState {
        AgentState::new(Vec2::new(x, y), 0.0, speed)
    }
}

// ── Macro-action expansion ────────────────────────────────────────────────────

#[cfg(test)]
mod expansion {
    use gofi_core::Vec2;

    use super::helpers::{eastbound, library, two_lane_road};
    use crate::{LaneDirection, MacroAction, MotionError};

    #[test]
    fn continue_follows_lane() {
        let map = two_lane_road();
        let t = library().expand(&map, &eastbound(-31.0, -1.75, 8.0), &MacroAction::Continue).unwrap();
        let end = t.last().unwrap();
        assert!((t.length() - 50.0).abs() < 0.1, "length {}", t.length());
        assert!((end.position.y + 1.75).abs() < 1e-6);
        assert!(t.points.iter().all(|p| p.speed <= 10.0 + 1e-9));
    }

    #[test]
    fn continue_at_lane_end_is_infeasible() {
        let map = two_lane_road();
        let err = library()
            .expand(&map, &eastbound(99.5, -1.75, 8.0), &MacroAction::Continue)
            .unwrap_err();
        assert!(matches!(err, MotionError::InfeasibleAction { action: MacroAction::Continue, .. }));
    }

    #[test]
    fn change_lane_left_ends_in_neighbour() {
        let map = two_lane_road();
        let action = MacroAction::ChangeLane { direction: LaneDirection::Left };
        let t = library().expand(&map, &eastbound(-31.0, -1.75, 8.0), &action).unwrap();
        let end = t.last().unwrap();
        assert!((end.position.y - 1.75).abs() < 1e-6);
        assert!((end.position.x - (-7.0)).abs() < 1e-6);
    }

    #[test]
    fn change_lane_without_neighbour_is_infeasible() {
        let map = two_lane_road();
        let action = MacroAction::ChangeLane { direction: LaneDirection::Right };
        let err = library().expand(&map, &eastbound(-31.0, -1.75, 8.0), &action).unwrap_err();
        assert!(err.is_infeasible());
    }

    #[test]
    fn exit_reaches_target_across_lanes() {
        let map = two_lane_road();
        let target = Vec2::new(59.0, -1.75);
        let t = library()
            .expand(&map, &eastbound(-15.0, 1.75, 10.0), &MacroAction::Exit { turn_target: target })
            .unwrap();
        assert!(t.last().unwrap().position.distance(target) < 1e-6);
    }

    #[test]
    fn exit_outside_map_is_infeasible() {
        let map = two_lane_road();
        let action = MacroAction::Exit { turn_target: Vec2::new(500.0, 0.0) };
        let err = library().expand(&map, &eastbound(0.0, -1.75, 5.0), &action).unwrap_err();
        assert!(matches!(err, MotionError::InfeasibleAction { .. }));
    }

    #[test]
    fn exit_behind_agent_is_infeasible() {
        let map = two_lane_road();
        let action = MacroAction::Exit { turn_target: Vec2::new(-40.0, -1.75) };
        assert!(library().expand(&map, &eastbound(0.0, -1.75, 5.0), &action).is_err());
    }

    #[test]
    fn stop_brakes_then_holds() {
        let map = two_lane_road();
        let t = library()
            .expand(&map, &eastbound(0.0, -1.75, 8.0), &MacroAction::Stop { duration: 2.0 })
            .unwrap();
        let end = t.last().unwrap();
        assert_eq!(end.speed, 0.0);
        let hold_start = t.state_at(t.duration() - 2.0).unwrap();
        assert!(hold_start.position.distance(end.position) < 1e-9);
        assert!(t.length() < 10.0);
    }

    #[test]
    fn stop_when_stationary_has_no_displacement() {
        let map = two_lane_road();
        let t = library()
            .expand(&map, &eastbound(5.0, -1.75, 0.0), &MacroAction::Stop { duration: 100.0 })
            .unwrap();
        assert_eq!(t.length(), 0.0);
        assert!((t.duration() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stop_is_feasible_off_map() {
        let map = two_lane_road();
        let t = library().expand(&map, &eastbound(300.0, 40.0, 6.0), &MacroAction::Stop { duration: 1.0 });
        assert!(t.is_ok());
    }

    #[test]
    fn plan_chains_final_states() {
        let map = two_lane_road();
        let lib = library();
        let start = eastbound(-31.0, -1.75, 8.0);
        let plan = [MacroAction::ChangeLane { direction: LaneDirection::Left }, MacroAction::Continue];
        let chained = lib.expand_plan(&map, &start, &plan).unwrap();
        let first = lib.expand(&map, &start, &plan[0]).unwrap();
        let second = lib.expand(&map, &first.final_state().unwrap(), &plan[1]).unwrap();
        assert!((chained.duration() - (first.duration() + second.duration())).abs() < 1e-9);
        assert!((chained.last().unwrap().position.y - 1.75).abs() < 1e-6);
    }

    #[test]
    fn applicable_filters_infeasible() {
        let map = two_lane_road();
        let candidates = [
            MacroAction::Continue,
            MacroAction::ChangeLane { direction: LaneDirection::Left },
            MacroAction::ChangeLane { direction: LaneDirection::Right },
        ];
        let ok = library().applicable(&map, &eastbound(-31.0, -1.75, 8.0), &candidates);
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[1].0, &candidates[1]);
    }
}

// ── Velocity smoother ─────────────────────────────────────────────────────────

#[cfg(test)]
mod smoother {
    use crate::{MotionError, SmootherConfig, VelocitySmoother};

    fn grid(len: f64, step: f64) -> Vec<f64> {
        let n = (len / step).round() as usize;
        (0..=n).map(|i| i as f64 * step).collect()
    }

    #[test]
    fn respects_acceleration_bound() {
        let cfg = SmootherConfig::default();
        let sm = VelocitySmoother::new(cfg.clone());
        let s = grid(40.0, 0.5);
        let v = sm.smooth(&s, 0.0, 12.0, None).unwrap();
        for i in 1..v.len() {
            assert!(v[i] * v[i] - v[i - 1] * v[i - 1] <= 2.0 * cfg.amax_m_s2 * 0.5 + 1e-6);
            assert!(v[i] <= 12.0 + 1e-9);
        }
        assert_eq!(v[0], 0.0);
    }

    #[test]
    fn reaches_required_end_speed() {
        let sm = VelocitySmoother::default();
        let v = sm.smooth(&grid(30.0, 0.5), 8.0, 10.0, Some(0.0)).unwrap();
        assert_eq!(*v.last().unwrap(), 0.0);
        assert_eq!(v[0], 8.0);
    }

    #[test]
    fn too_short_to_stop_is_infeasible() {
        let sm = VelocitySmoother::default();
        let err = sm.smooth(&grid(5.0, 0.5), 10.0, 10.0, Some(0.0)).unwrap_err();
        assert!(matches!(err, MotionError::InfeasibleProfile { .. }));
    }

    #[test]
    fn vmin_above_cap_never_exceeds_cap() {
        let sm = VelocitySmoother::new(SmootherConfig { vmin_m_s: 2.0, ..Default::default() });
        let v = sm.smooth(&grid(50.0, 0.5), 2.0, 0.5, None).unwrap();
        assert_eq!(v[0], 0.5);
        assert!(v.iter().all(|&x| x <= 0.5 + 1e-9));
    }

    #[test]
    fn smoothing_keeps_samples_above_vmin() {
        let s = grid(30.0, 0.5);
        let raw = VelocitySmoother::new(SmootherConfig { vmin_m_s: 6.0, lambda_acc: 0.0, ..Default::default() });
        let floored = VelocitySmoother::new(SmootherConfig { vmin_m_s: 6.0, lambda_acc: 0.8, ..Default::default() });
        let r = raw.smooth(&s, 8.0, 8.0, Some(0.0)).unwrap();
        let v = floored.smooth(&s, 8.0, 8.0, Some(0.0)).unwrap();
        for (x, y) in r.iter().zip(&v) {
            assert!(*y >= x.min(6.0) - 1e-9);
            assert!(*y <= 8.0 + 1e-9);
        }
    }
}

// ── Trajectory ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod trajectory {
    use gofi_core::{AgentState, Vec2};

    use crate::Trajectory;

    #[test]
    fn state_at_interpolates() {
        let path = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)];
        let t = Trajectory::from_path(&path, &[10.0, 10.0], 0.0);
        assert!((t.duration() - 1.0).abs() < 1e-12);
        let mid = t.state_at(0.5).unwrap();
        assert!(mid.position.distance(Vec2::new(5.0, 0.0)) < 1e-9);
        assert!(t.state_at(5.0).unwrap().position.distance(Vec2::new(10.0, 0.0)) < 1e-9);
    }

    #[test]
    fn slice_rebases_time() {
        let path = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)];
        let t = Trajectory::from_path(&path, &[10.0, 10.0, 10.0], 0.0);
        let rest = t.slice_from(0.5);
        assert_eq!(rest.first().unwrap().time, 0.0);
        assert!((rest.duration() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn hold_keeps_position() {
        let s = AgentState::new(Vec2::new(3.0, 4.0), 1.0, 0.0);
        let h = Trajectory::hold(&s, 1.0, 0.05);
        assert_eq!(h.length(), 0.0);
        assert!((h.duration() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn truncate_ends_at_cut() {
        let path = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)];
        let t = Trajectory::from_path(&path, &[10.0, 10.0, 10.0], 0.0);
        let head = t.truncate_at(1.5);
        assert!((head.duration() - 1.5).abs() < 1e-9);
        assert!(head.last().unwrap().position.distance(Vec2::new(15.0, 0.0)) < 1e-9);
        assert_eq!(t.truncate_at(10.0).duration(), t.duration());
    }
}

// ── Cost evaluator ────────────────────────────────────────────────────────────

#[cfg(test)]
mod cost {
    use gofi_core::{AgentState, Vec2};

    use super::helpers::{eastbound, library, two_lane_road};
    use crate::{CostEvaluator, CostFactors, LaneDirection, MacroAction, Trajectory};

    #[test]
    fn hold_costs_only_time() {
        let eval = CostEvaluator::new(20);
        let h = Trajectory::hold(&AgentState::new(Vec2::ZERO, 0.0, 0.0), 2.0, 0.05);
        let m = eval.metrics(&h);
        assert!((m.time - 2.0).abs() < 1e-9);
        assert_eq!(m.velocity, 0.0);
        assert_eq!(m.jerk, 0.0);
        assert_eq!(m.angular_velocity, 0.0);
    }

    #[test]
    fn lane_change_turns_more_than_continue() {
        let map = two_lane_road();
        let lib = library();
        let start = eastbound(-31.0, -1.75, 8.0);
        let eval = CostEvaluator::new(20);
        let keep = eval.metrics(&lib.expand(&map, &start, &MacroAction::Continue).unwrap());
        let change = eval.metrics(
            &lib.expand(&map, &start, &MacroAction::ChangeLane { direction: LaneDirection::Left }).unwrap(),
        );
        assert!(change.angular_velocity > keep.angular_velocity);
        assert!(change.curvature > keep.curvature);
    }

    #[test]
    fn cost_is_monotone_in_weights() {
        let map = two_lane_road();
        let t = library()
            .expand(&map, &eastbound(-31.0, -1.75, 8.0), &MacroAction::ChangeLane { direction: LaneDirection::Left })
            .unwrap();
        let eval = CostEvaluator::new(20);
        let base = CostFactors::default();
        let heavier = CostFactors { jerk: base.jerk * 3.0, angular_velocity: base.angular_velocity + 1.0, ..base.clone() };
        let c0 = eval.cost(&t, &base);
        assert!(c0 >= 0.0);
        assert!(eval.cost(&t, &heavier) >= c0);
    }

    #[test]
    fn safety_counts_close_agents() {
        let eval = CostEvaluator::new(20);
        let path = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)];
        let ego = Trajectory::from_path(&path, &[5.0, 5.0], 0.0);
        let near = Trajectory::hold(&AgentState::new(Vec2::new(5.0, 1.0), 0.0, 0.0), 3.0, 0.05);
        let far = Trajectory::hold(&AgentState::new(Vec2::new(5.0, 50.0), 0.0, 0.0), 3.0, 0.05);
        assert!(eval.metrics_against(&ego, &[&near]).safety > 0.0);
        assert_eq!(eval.metrics_against(&ego, &[&far]).safety, 0.0);
    }

    #[test]
    fn negative_weight_detected() {
        let bad = CostFactors { curvature: -1.0, ..Default::default() };
        assert_eq!(bad.invalid_weight(), Some("curvature"));
        assert_eq!(CostFactors::default().invalid_weight(), None);
    }

    #[test]
    fn set_by_name() {
        let mut w = CostFactors::zero();
        assert!(w.set("jerk", -0.5));
        assert!(!w.set("comfort", 1.0));
        assert_eq!(w.jerk, -0.5);
        assert_eq!(w.time, 0.0);
    }
}

#[cfg(test)]
mod serde_format {
    use gofi_core::Vec2;

    use crate::{LaneDirection, MacroAction};

    #[test]
    fn macro_action_tagged_by_type() {
        let json = serde_json::to_string(&MacroAction::ChangeLane { direction: LaneDirection::Left }).unwrap();
        assert_eq!(json, r#"{"type":"ChangeLane","direction":"Left"}"#);
        let exit: MacroAction = serde_json::from_str(r#"{"type":"Exit","turn_target":[59.0,-1.75]}"#).unwrap();
        assert_eq!(exit, MacroAction::Exit { turn_target: Vec2::new(59.0, -1.75) });
        let cont: MacroAction = serde_json::from_str(r#"{"type":"Continue"}"#).unwrap();
        assert_eq!(cont, MacroAction::Continue);
    }
}
