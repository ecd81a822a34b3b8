//! Unit tests for gofi-recognition.

#[cfg(test)]
mod helpers {
    use gofi_core::{AgentId, AgentState, BoundingBox, GoalId, Vec2};
    use gofi_map::{RoadMap, RoadMapBuilder};
    use gofi_motion::{
        CostEvaluator, CostFactors, MacroActionConfig, MacroActionLibrary, SmootherConfig, Trajectory,
        TrajectoryPoint,
    };

    use crate::{Goal, GoalRecognitionConfig, RecognitionContext, TrackedAgent};

    pub const FPS: u32 = 20;
    pub const DT: f64 = 1.0 / FPS as f64;

    /// Everything a `RecognitionContext` borrows.
    pub struct Fixture {
        pub map:       RoadMap,
        pub library:   MacroActionLibrary,
        pub evaluator: CostEvaluator,
        pub factors:   CostFactors,
        pub config:    GoalRecognitionConfig,
    }

    impl Fixture {
        pub fn new() -> Self {
            let mut b = RoadMapBuilder::new();
            let right = b.add_lane(vec![Vec2::new(-60.0, -1.75), Vec2::new(100.0, -1.75)], 3.5);
            let left  = b.add_lane(vec![Vec2::new(-60.0, 1.75), Vec2::new(100.0, 1.75)], 3.5);
            b.link_adjacent(left, right);
            Self {
                map:       b.build().unwrap(),
                library:   MacroActionLibrary::new(MacroActionConfig::default(), SmootherConfig::default(), 10.0, FPS),
                evaluator: CostEvaluator::new(FPS),
                factors:   CostFactors::default(),
                config:    GoalRecognitionConfig::default(),
            }
        }

        pub fn ctx(&self) -> RecognitionContext<'_> {
            RecognitionContext {
                map:          &self.map,
                library:      &self.library,
                evaluator:    &self.evaluator,
                cost_factors: &self.factors,
                config:       &self.config,
            }
        }
    }

    pub fn goal(id: u16, x: f64, y: f64) -> Goal {
        Goal::new(GoalId(id), BoundingBox::new(Vec2::new(x, y), 10.0, 3.5, 0.0))
    }

    /// Goal 0 ahead on the right lane, goal 1 behind the agent.
    pub fn ahead_and_behind() -> Vec<Goal> {
        vec![goal(0, 90.0, -1.75), goal(1, -50.0, -1.75)]
    }

    /// Eastbound at 10 m/s on the right lane, at `frame` frames after x = -30.
    pub fn cruising(frame: u64) -> AgentState {
        AgentState::new(Vec2::new(-30.0 + 10.0 * DT * frame as f64, -1.75), 0.0, 10.0)
    }

    pub fn observed(frames: u64) -> Trajectory {
        Trajectory::new(
            (0..frames)
                .map(|k| {
                    let s = cruising(k);
                    TrajectoryPoint { position: s.position, heading: 0.0, speed: 10.0, time: k as f64 * DT }
                })
                .collect(),
        )
    }

    pub fn tracked(id: u32, spawn: AgentState) -> TrackedAgent {
        TrackedAgent { id: AgentId(id), goals: ahead_and_behind(), spawn, length: 4.5, width: 1.8 }
    }
}

// ── Posterior ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod posterior {
    use crate::{GoalDistribution, inflation_weight, softmax_posterior};

    #[test]
    fn sums_to_one() {
        let priors = GoalDistribution::uniform(3);
        let d = softmax_posterior(&[Some(0.3), Some(2.0), Some(7.5)], &priors, 1.5).unwrap();
        assert!((d.as_slice().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn equal_costs_split_evenly() {
        let priors = GoalDistribution::uniform(4);
        let d = softmax_posterior(&[Some(2.0); 4], &priors, 3.0).unwrap();
        assert!(d.as_slice().iter().all(|p| (p - 0.25).abs() < 1e-12));
    }

    #[test]
    fn higher_beta_never_narrows_the_gap() {
        let priors = GoalDistribution::uniform(3);
        let diffs = [Some(1.0), Some(2.0), Some(4.0)];
        let mut last_gap = 0.0;
        for beta in [0.1, 0.5, 1.0, 2.0, 8.0] {
            let d = softmax_posterior(&diffs, &priors, beta).unwrap();
            let gap = d.as_slice()[0] - d.as_slice()[1];
            assert!(gap >= last_gap, "beta {beta}: gap {gap} < {last_gap}");
            last_gap = gap;
        }
    }

    #[test]
    fn cost_rescaling_matches_beta_rescaling() {
        let priors = GoalDistribution::uniform(3);
        let a = softmax_posterior(&[Some(1.0), Some(2.0), Some(5.0)], &priors, 2.0).unwrap();
        let b = softmax_posterior(&[Some(4.0), Some(8.0), Some(20.0)], &priors, 0.5).unwrap();
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn priors_weight_the_likelihood() {
        let priors = GoalDistribution::priors(Some(&[3.0, 1.0][..]), 2);
        let d = softmax_posterior(&[Some(1.0), Some(1.0)], &priors, 1.0).unwrap();
        assert!((d.as_slice()[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn mismatched_priors_fall_back_to_uniform() {
        let priors = GoalDistribution::priors(Some(&[3.0, 1.0, 1.0][..]), 2);
        assert_eq!(priors.as_slice(), &[0.5, 0.5]);
    }

    #[test]
    fn unreachable_goals_get_zero() {
        let priors = GoalDistribution::uniform(2);
        let d = softmax_posterior(&[None, Some(3.0)], &priors, 1.0).unwrap();
        assert_eq!(d.as_slice(), &[0.0, 1.0]);
        assert!(softmax_posterior(&[None, None], &priors, 1.0).is_none());
    }

    #[test]
    fn map_goal_ties_to_lowest_id() {
        let d = GoalDistribution::uniform(3);
        assert_eq!(d.map_goal().unwrap().0.0, 0);
    }

    #[test]
    fn inflation_relaxes_toward_uniform() {
        let d = GoalDistribution::normalized(vec![1.0, 0.0]);
        assert_eq!(inflation_weight(0.2, 0.0), 0.0);
        let half = d.inflate(0.5);
        assert!((half.as_slice()[0] - 0.75).abs() < 1e-12);
        let full = d.inflate(inflation_weight(0.2, 1e6));
        assert!((full.as_slice()[0] - 0.5).abs() < 1e-9);
    }
}

// ── Inverse planning ──────────────────────────────────────────────────────────

#[cfg(test)]
mod recognizer {
    use gofi_core::AgentId;

    use super::helpers::{Fixture, ahead_and_behind, goal, observed};
    use crate::{CostCache, GoalDistribution, GoalRecognizer, RecognitionError};

    #[test]
    fn goal_behind_is_unreachable() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let goals = ahead_and_behind();
        let mut cache = CostCache::default();
        let d = GoalRecognizer::new(&ctx)
            .recognize(AgentId(1), &goals, &GoalDistribution::uniform(2), &observed(10), &mut cache)
            .unwrap();
        assert!((d.as_slice()[0] - 1.0).abs() < 1e-12);
        assert_eq!(d.as_slice()[1], 0.0);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&goals[1].id), Some(&None));
    }

    #[test]
    fn goal_around_start_gets_zero() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let goals = vec![goal(0, -30.0, -1.75), goal(1, 90.0, -1.75)];
        let mut cache = CostCache::default();
        let d = GoalRecognizer::new(&ctx)
            .recognize(AgentId(1), &goals, &GoalDistribution::uniform(2), &observed(10), &mut cache)
            .unwrap();
        assert_eq!(d.as_slice()[0], 0.0);
    }

    #[test]
    fn no_reachable_goal_is_an_error() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let goals = vec![goal(0, -50.0, -1.75), goal(1, 500.0, 0.0)];
        let err = GoalRecognizer::new(&ctx)
            .recognize(AgentId(7), &goals, &GoalDistribution::uniform(2), &observed(10), &mut CostCache::default())
            .unwrap_err();
        assert!(matches!(err, RecognitionError::UnreachableGoal { agent: AgentId(7) }));
    }

    #[test]
    fn optimal_costs_are_cached() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let goals = ahead_and_behind();
        let mut cache = CostCache::default();
        let recognizer = GoalRecognizer::new(&ctx);
        let priors = GoalDistribution::uniform(2);
        recognizer.recognize(AgentId(1), &goals, &priors, &observed(5), &mut cache).unwrap();
        let first = cache.get(&goals[0].id).copied().flatten().unwrap();
        recognizer.recognize(AgentId(1), &goals, &priors, &observed(15), &mut cache).unwrap();
        assert_eq!(cache.get(&goals[0].id).copied().flatten(), Some(first));
    }
}

// ── Occlusion tracking ────────────────────────────────────────────────────────

#[cfg(test)]
mod occlusion {
    use gofi_core::{AgentId, AgentState, Frame, Vec2};

    use super::helpers::{Fixture, cruising, tracked};
    use crate::{BeliefTable, Observation, ReconcileOutcome, TrackingState};

    const AGENT: AgentId = AgentId(1);

    fn table(fx: &Fixture) -> BeliefTable {
        BeliefTable::new(AgentId(0), vec![tracked(1, cruising(0))], &fx.config)
    }

    fn seen(frame: u64, state: AgentState) -> Observation {
        let mut obs = Observation::new(Frame(frame));
        obs.visible.insert(AGENT, state);
        obs
    }

    fn hidden(frame: u64) -> Observation {
        let mut obs = Observation::new(Frame(frame));
        obs.occluded.insert(AGENT);
        obs
    }

    /// Observe frames 0..=4, occlude 5..=9.
    fn observed_then_hidden(fx: &Fixture) -> BeliefTable {
        let ctx = fx.ctx();
        let mut t = table(fx);
        for f in 0..5 {
            t.update(&ctx, &seen(f, cruising(f)));
        }
        for f in 5..10 {
            t.update(&ctx, &hidden(f));
        }
        t
    }

    #[test]
    fn ego_is_not_tracked() {
        let fx = Fixture::new();
        let t = BeliefTable::new(AgentId(0), vec![tracked(0, cruising(0)), tracked(1, cruising(0))], &fx.config);
        assert_eq!(t.len(), 1);
        assert!(t.get(AgentId(0)).is_none());
    }

    #[test]
    fn first_sighting_is_fresh_then_estimated() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let mut t = table(&fx);
        let out = t.update(&ctx, &seen(0, cruising(0)));
        assert_eq!(out, vec![(AGENT, ReconcileOutcome::Fresh)]);
        assert_eq!(t.get(AGENT).unwrap().state(), TrackingState::Observing);
        assert!(t.update(&ctx, &seen(1, cruising(1))).is_empty());
        let b = t.get(AGENT).unwrap();
        assert_eq!(b.state(), TrackingState::GoalEstimated);
        assert!(b.distribution().as_slice()[0] > 0.99);
    }

    #[test]
    fn prediction_has_no_goal_until_estimated() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let mut t = table(&fx);
        t.update(&ctx, &seen(0, cruising(0)));
        let p = t.predictions();
        assert_eq!(p[0].tracking, TrackingState::Observing);
        assert!(p[0].map_goal.is_none());
        assert_eq!(p[0].map_probability, 0.0);

        t.update(&ctx, &seen(1, cruising(1)));
        let p = t.predictions();
        assert_eq!(p[0].map_goal.map(|g| g.id.0), Some(0));
        assert!(p[0].map_probability > 0.99);
    }

    #[test]
    fn occluded_belief_extrapolates_and_keeps_existence() {
        let fx = Fixture::new();
        let t = observed_then_hidden(&fx);
        let b = t.get(AGENT).unwrap();
        assert_eq!(b.state(), TrackingState::Occluded);
        assert_eq!(b.existence(), 1.0);
        let x = b.current_state().unwrap().position.x;
        assert!((x - cruising(9).position.x).abs() < 1e-9);
        let p = t.predictions();
        assert_eq!(p.len(), 1);
        assert!(p[0].is_occluded());
    }

    #[test]
    fn entropy_never_decreases_while_occluded() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let mut t = table(&fx);
        for f in 0..5 {
            t.update(&ctx, &seen(f, cruising(f)));
        }
        let mut last = t.get(AGENT).unwrap().distribution().entropy();
        for f in 5..200 {
            t.update(&ctx, &hidden(f));
            let h = t.get(AGENT).unwrap().distribution().entropy();
            assert!(h + 1e-12 >= last, "frame {f}: {h} < {last}");
            last = h;
        }
        assert!(last > 0.6, "belief should approach uniform, entropy {last}");
    }

    #[test]
    fn consistent_reobservation_fills_the_gap() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let mut t = observed_then_hidden(&fx);
        let out = t.update(&ctx, &seen(10, cruising(10)));
        assert!(matches!(out[..], [(AGENT, ReconcileOutcome::Consistent { error })] if error < 1e-9));
        let b = t.get(AGENT).unwrap();
        assert_eq!(b.history_len(), 11);
        assert_eq!(b.state(), TrackingState::GoalEstimated);
        assert!(b.distribution().as_slice()[0] > 0.99);
    }

    #[test]
    fn diverged_reobservation_restarts() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let mut t = observed_then_hidden(&fx);
        let jumped = AgentState::new(Vec2::new(-15.0, -1.75), 0.0, 10.0);
        let out = t.update(&ctx, &seen(10, jumped));
        assert!(matches!(out[..], [(AGENT, ReconcileOutcome::Diverged { error })] if (error - 10.0).abs() < 1e-9));
        let b = t.get(AGENT).unwrap();
        assert_eq!(b.history_len(), 1);
        assert_eq!(b.cached_goals(), 0);
        assert_eq!(b.state(), TrackingState::Observing);
        assert_eq!(b.distribution().as_slice(), &[0.5, 0.5]);
    }

    #[test]
    fn never_seen_agent_is_a_spawn_hypothesis() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let spawn = AgentState::new(Vec2::new(5.0, -1.75), 0.0, 0.0);
        let mut t = BeliefTable::new(AgentId(0), vec![tracked(1, spawn)], &fx.config);
        t.update(&ctx, &hidden(0));
        let b = t.get(AGENT).unwrap();
        assert_eq!(b.state(), TrackingState::Occluded);
        assert!((b.existence() - 0.1).abs() < 1e-12);
        assert_eq!(b.current_state().unwrap().position, spawn.position);

        for f in 1..60 {
            t.update(&ctx, &hidden(f));
        }
        let out = t.update(&ctx, &seen(60, spawn));
        assert!(matches!(out[..], [(AGENT, ReconcileOutcome::Consistent { .. })]));
        let b = t.get(AGENT).unwrap();
        assert_eq!(b.existence(), 1.0);
        assert_eq!(b.history_len(), 1);
    }

    #[test]
    fn out_of_view_forgets_history() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let mut t = table(&fx);
        for f in 0..3 {
            t.update(&ctx, &seen(f, cruising(f)));
        }
        t.update(&ctx, &Observation::new(Frame(3)));
        let b = t.get(AGENT).unwrap();
        assert_eq!(b.state(), TrackingState::Unobserved);
        assert_eq!(b.history_len(), 0);
        assert!(t.predictions().is_empty());

        let out = t.update(&ctx, &seen(4, cruising(4)));
        assert_eq!(out, vec![(AGENT, ReconcileOutcome::Fresh)]);
    }

    #[test]
    fn history_records_every_update() {
        let fx = Fixture::new();
        let t = observed_then_hidden(&fx);
        assert_eq!(t.history().len(), 10);
        let row = t.records_at(Frame(0)).next().unwrap();
        assert_eq!(row.reconcile, Some(ReconcileOutcome::Fresh));
        let row = t.records_at(Frame(9)).next().unwrap();
        assert_eq!(row.state, TrackingState::Occluded);
    }
}

// ── Presence factors ──────────────────────────────────────────────────────────

#[cfg(test)]
mod presence {
    use gofi_core::{AgentId, AgentState, BoundingBox, Frame, Vec2};

    use super::helpers::{DT, Fixture, cruising, goal, tracked};
    use crate::{
        BeliefTable, GoalDistribution, Observation, PresenceBelief, TrackingState, detour_plans, drives_through,
        goal_plan,
    };

    const A: AgentId = AgentId(1);
    const B: AgentId = AgentId(2);

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn factors_start_with_everyone_present() {
        let p = PresenceBelief::new(&[(A, 0.25), (B, 0.5)]);
        assert_eq!(p.len(), 4);
        assert_eq!(p.factors()[0].as_slice(), &[true, true]);
        assert_eq!(p.factors()[1].as_slice(), &[true, false]);
        assert_eq!(p.factors()[2].as_slice(), &[false, true]);
        assert_eq!(p.factors()[3].as_slice(), &[false, false]);
        let expected = [0.125, 0.125, 0.375, 0.375];
        assert!(p.probabilities().iter().zip(expected).all(|(a, b)| close(*a, b)));
        assert!(close(p.existence(A).unwrap(), 0.25));
        assert!(close(p.existence(B).unwrap(), 0.5));
        assert_eq!(p.existence(AgentId(9)), None);
    }

    #[test]
    fn no_hypotheses_is_a_single_certain_factor() {
        let p = PresenceBelief::new(&[]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.probabilities(), &[1.0]);
        assert!(PresenceBelief::default().is_empty());
    }

    #[test]
    fn update_weighs_factors_by_evidence() {
        let mut p = PresenceBelief::new(&[(A, 0.1)]);
        let priors = GoalDistribution::uniform(2);
        let conditionals = p.update(&[vec![0.5, 0.5], vec![0.05, 0.0]], &priors).unwrap();
        let present = 0.1 / 0.145;
        assert!(close(p.existence(A).unwrap(), present));
        assert!(close(conditionals[0].as_slice()[0], 0.5));
        assert!(close(conditionals[1].as_slice()[0], 1.0));

        let marginal = p.goal_marginal(&conditionals);
        assert!(close(marginal.as_slice()[0], present * 0.5 + (1.0 - present)));
        assert!(close(marginal.as_slice().iter().sum::<f64>(), 1.0));
    }

    #[test]
    fn impossible_factor_falls_back_to_goal_priors() {
        let mut p = PresenceBelief::new(&[(A, 0.1)]);
        let priors = GoalDistribution::normalized(vec![0.2, 0.8]);
        let conditionals = p.update(&[vec![1.0, 1.0], vec![0.0, 0.0]], &priors).unwrap();
        assert!(close(p.existence(A).unwrap(), 1.0));
        assert_eq!(conditionals[1].as_slice(), priors.as_slice());
    }

    #[test]
    fn evidence_without_mass_leaves_the_belief_alone() {
        let mut p = PresenceBelief::new(&[(A, 0.1)]);
        let before = p.clone();
        let priors = GoalDistribution::uniform(1);
        assert!(p.update(&[vec![0.0], vec![0.0]], &priors).is_none());
        assert!(p.update(&[vec![1.0]], &priors).is_none());
        assert_eq!(p, before);
    }

    #[test]
    fn sampling_walks_the_cumulative_distribution() {
        let p = PresenceBelief::new(&[(A, 0.25)]);
        assert!(p.sample(0.1).unwrap().is_present(0));
        assert!(!p.sample(0.3).unwrap().is_present(0));
        assert!(!p.sample(0.9999).unwrap().is_present(0));

        let certain = PresenceBelief::new(&[(A, 1.0)]);
        assert!(certain.sample(0.999).unwrap().is_present(0));
        assert!(certain.sample(1.0).unwrap().is_present(0));
        assert_eq!(PresenceBelief::default().sample(0.5), None);
    }

    #[test]
    fn stopped_car_in_lane_forces_a_detour() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let target = goal(0, 90.0, -1.75);
        let parked = [BoundingBox::new(Vec2::new(0.0, -1.75), 4.5, 1.8, 0.0)];
        let start = cruising(0);

        let direct = fx.library.expand_plan(&fx.map, &start, &goal_plan(&target)).unwrap();
        assert!(drives_through(&direct, &parked));
        let [left, right] = detour_plans(&target);
        let around = fx.library.expand_plan(&fx.map, &start, &left).unwrap();
        assert!(!drives_through(&around, &parked));
        assert!(fx.library.expand_plan(&fx.map, &start, &right).is_err());

        let clear = ctx.optimal_cost(&start, &target).unwrap();
        let blocked = ctx.optimal_cost_avoiding(&start, &target, &parked).unwrap();
        assert!(blocked > clear);
        assert_eq!(ctx.optimal_cost_avoiding(&start, &target, &[]), Some(clear));
    }

    #[test]
    fn swerving_agent_makes_the_hidden_car_likelier() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let parked = AgentState::new(Vec2::new(5.0, -1.75), 0.0, 0.0);
        let mut t = BeliefTable::new(AgentId(0), vec![tracked(1, cruising(0)), tracked(2, parked)], &fx.config);
        let swerve = fx.library.expand_plan(&fx.map, &cruising(0), &detour_plans(&goal(0, 90.0, -1.75))[0]).unwrap().resample(DT);

        for (f, point) in swerve.points.iter().take(70).enumerate() {
            let mut obs = Observation::new(Frame(f as u64));
            obs.visible.insert(A, point.to_state());
            obs.occluded.insert(B);
            t.update(&ctx, &obs);
        }

        let hidden = t.get(B).unwrap();
        assert_eq!(hidden.state(), TrackingState::Occluded);
        assert!(hidden.existence() > 0.1, "existence {}", hidden.existence());
        assert!(close(t.presence().unwrap().existence(B).unwrap(), hidden.existence()));
        let visible = t.get(A).unwrap();
        assert_eq!(visible.state(), TrackingState::GoalEstimated);
        assert!(close(visible.distribution().as_slice().iter().sum::<f64>(), 1.0));
    }

    #[test]
    fn no_hypothesis_means_no_presence_belief() {
        let fx = Fixture::new();
        let ctx = fx.ctx();
        let mut t = BeliefTable::new(AgentId(0), vec![tracked(1, cruising(0))], &fx.config);
        let mut obs = Observation::new(Frame(0));
        obs.visible.insert(A, cruising(0));
        t.update(&ctx, &obs);
        assert!(t.presence().is_none());
    }
}
