//! Unit tests for gofi-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AgentId, GoalId, LaneId, NodeId};

    #[test]
    fn index_roundtrip() {
        let id = AgentId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(AgentId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn goal_id_rejects_overflow() {
        assert!(GoalId::try_from(70_000usize).is_err());
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(AgentId::INVALID.0, u32::MAX);
        assert_eq!(LaneId::INVALID.0, u32::MAX);
        assert_eq!(NodeId::default(), NodeId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(LaneId(3).to_string(), "LaneId(3)");
    }
}

#[cfg(test)]
mod geom {
    use std::f64::consts::{FRAC_PI_2, PI};

    use crate::{BoundingBox, Vec2, wrap_angle};

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI) - (-PI)).abs() < 1e-9);
        assert!((wrap_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-9);
        assert!((wrap_angle(2.0 * PI + 0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rotation_and_perp() {
        let v = Vec2::new(1.0, 0.0).rotated(FRAC_PI_2);
        assert!(v.distance(Vec2::new(0.0, 1.0)) < 1e-9);
        assert_eq!(Vec2::new(1.0, 0.0).perp(), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn box_contains_respects_heading() {
        let b = BoundingBox::new(Vec2::ZERO, 10.0, 2.0, FRAC_PI_2);
        assert!(b.contains(Vec2::new(0.0, 4.5)));
        assert!(!b.contains(Vec2::new(4.5, 0.0)));
    }

    #[test]
    fn box_overlap() {
        let a = BoundingBox::new(Vec2::ZERO, 4.0, 2.0, 0.0);
        let b = BoundingBox::new(Vec2::new(3.5, 0.0), 4.0, 2.0, 0.0);
        let c = BoundingBox::new(Vec2::new(10.0, 0.0), 4.0, 2.0, 0.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}

#[cfg(test)]
mod time {
    use crate::{Frame, SimClock};

    #[test]
    fn clock_advance_and_secs() {
        let mut clock = SimClock::new(20);
        for _ in 0..40 {
            clock.advance();
        }
        assert_eq!(clock.current_frame, Frame(40));
        assert!((clock.elapsed_secs() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn frames_for_secs_rounds() {
        let clock = SimClock::new(20);
        assert_eq!(clock.frames_for_secs(2.0), 40);
        assert_eq!(clock.frames_for_secs(0.01), 1);
        assert_eq!(clock.frames_for_secs(0.0), 0);
    }

    #[test]
    fn frame_arithmetic() {
        assert_eq!(Frame(5) + 3, Frame(8));
        assert_eq!(Frame(8) - Frame(5), 3);
        assert_eq!(Frame(2).since(Frame(5)), 0);
    }
}

#[cfg(test)]
mod rng {
    use crate::{Frame, RolloutRng};

    #[test]
    fn same_triple_same_stream() {
        let mut a = RolloutRng::new(21, Frame(40), 3);
        let mut b = RolloutRng::new(21, Frame(40), 3);
        for _ in 0..16 {
            assert_eq!(a.random::<u64>(), b.random::<u64>());
        }
    }

    #[test]
    fn different_index_different_stream() {
        let mut a = RolloutRng::new(21, Frame(40), 3);
        let mut b = RolloutRng::new(21, Frame(40), 4);
        let xs: Vec<u64> = (0..4).map(|_| a.random()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.random()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn gen_range_stays_in_bounds() {
        let mut rng = RolloutRng::new(7, Frame(0), 0);
        for _ in 0..64 {
            let k = rng.gen_range(0..5usize);
            assert!(k < 5);
            let u: f64 = rng.random();
            assert!((0.0..1.0).contains(&u));
        }
    }
}

#[cfg(test)]
mod state {
    use crate::{AgentId, AgentMetadata, AgentRole, AgentState, CoreError, Frame, Vec2, WorldState};

    #[test]
    fn speed_and_stop() {
        let s = AgentState::new(Vec2::ZERO, 0.0, 5.0);
        assert!((s.speed() - 5.0).abs() < 1e-12);
        assert!(!s.is_stopped());
        assert!(AgentState::new(Vec2::ZERO, 0.0, 0.05).is_stopped());
    }

    #[test]
    fn extrapolate_constant_velocity() {
        let s = AgentState::new(Vec2::new(1.0, 2.0), 0.0, 4.0);
        let e = s.extrapolate(0.5);
        assert!(e.position.distance(Vec2::new(3.0, 2.0)) < 1e-12);
    }

    #[test]
    fn require_missing_agent() {
        let mut world = WorldState::new(Frame(0), 0.0);
        world.insert(
            AgentId(0),
            AgentState::new(Vec2::ZERO, 0.0, 1.0),
            AgentMetadata::new(4.5, 1.8, AgentRole::Ego),
        );
        assert!(world.require(AgentId(0)).is_ok());
        assert!(matches!(world.require(AgentId(9)), Err(CoreError::AgentNotFound(AgentId(9)))));
        assert_eq!(world.others(AgentId(0)).count(), 0);
        assert!(world.footprint(AgentId(0)).is_some());
    }
}
