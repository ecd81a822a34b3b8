//! Lane-graph routing trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! The macro-action library calls routing via the [`LaneRouter`] trait, so
//! callers can swap in custom implementations without touching the motion
//! code.  The default [`DijkstraLaneRouter`] is sufficient for small maps.
//!
//! # Graph
//!
//! Nodes are lanes entered at some arc length.  Two kinds of edge leave a
//! lane entered at `s`:
//!
//! - **successor**: drive to the lane end, enter the successor at 0;
//! - **lane change**: blend into the left or right neighbour over
//!   `change_length` metres starting at `s`, entering the neighbour where the
//!   blend ends.
//!
//! # Cost units
//!
//! All costs are integer **centimetres** of travelled arc length, plus a fixed
//! penalty per lane change so a route only changes lane when it has to.
//! Integer costs with a `LaneId` secondary heap key keep tie-breaking
//! deterministic.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use gofi_core::{LaneId, Vec2};

use crate::{MapError, MapResult, RoadMap};

/// Extra cost charged per lane change, in centimetres.
pub const LANE_CHANGE_PENALTY_CM: u32 = 500;

#[inline]
fn to_cm(m: f64) -> u32 {
    (m.max(0.0) * 100.0).round() as u32
}

// ── LaneRoute ─────────────────────────────────────────────────────────────────

/// One piece of a lane route.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RouteSegment {
    /// Drive along `lane` from `from_s` to `to_s`.
    Follow { lane: LaneId, from_s: f64, to_s: f64 },
    /// Blend from `from_lane` (starting at `from_s`) into `to_lane` over
    /// `length` metres of `from_lane` arc length.
    ChangeLane { from_lane: LaneId, to_lane: LaneId, from_s: f64, length: f64 },
}

impl RouteSegment {
    pub fn length(&self) -> f64 {
        match *self {
            RouteSegment::Follow { from_s, to_s, .. } => to_s - from_s,
            RouteSegment::ChangeLane { length, .. } => length,
        }
    }
}

/// The result of a routing query.
#[derive(Debug, Clone)]
pub struct LaneRoute {
    pub segments: Vec<RouteSegment>,
    /// Travelled arc length in metres (lane-change penalties excluded).
    pub length_m: f64,
}

impl LaneRoute {
    pub fn lane_changes(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, RouteSegment::ChangeLane { .. }))
            .count()
    }

    pub fn is_trivial(&self) -> bool {
        self.segments.is_empty()
    }
}

// ── LaneRouter trait ──────────────────────────────────────────────────────────

/// Pluggable lane routing engine.
///
/// Implementations must be `Send + Sync` so they can be shared across Rayon
/// workers during parallel rollouts.
pub trait LaneRouter: Send + Sync {
    /// Route from arc length `from_s` on `from_lane` to the lane point
    /// nearest `target`, changing lanes over `change_length` metres.
    fn route(
        &self,
        map: &RoadMap,
        from_lane: LaneId,
        from_s: f64,
        target: Vec2,
        change_length: f64,
    ) -> MapResult<LaneRoute>;
}

// ── DijkstraLaneRouter ────────────────────────────────────────────────────────

/// Dijkstra's algorithm over the lane graph.
pub struct DijkstraLaneRouter;

#[derive(Copy, Clone)]
enum Step {
    Successor,
    Change,
}

impl LaneRouter for DijkstraLaneRouter {
    fn route(
        &self,
        map: &RoadMap,
        from_lane: LaneId,
        from_s: f64,
        target: Vec2,
        change_length: f64,
    ) -> MapResult<LaneRoute> {
        let start = map.lane(from_lane)?;
        let target_lane = map.lane_at(target).ok_or(MapError::OffLane(target))?;
        let (target_s, _) = map.project(target_lane, target)?;
        let from_s = from_s.clamp(0.0, start.length());

        let n = map.lane_count();
        // Index `n` is the virtual goal node.
        let goal = LaneId(n as u32);
        let mut dist    = vec![u32::MAX; n + 1];
        let mut entry_s = vec![0.0f64; n];
        let mut prev: Vec<Option<(LaneId, Step)>> = vec![None; n];

        dist[from_lane.index()] = 0;
        entry_s[from_lane.index()] = from_s;

        let mut heap: BinaryHeap<Reverse<(u32, LaneId)>> = BinaryHeap::new();
        heap.push(Reverse((0, from_lane)));

        while let Some(Reverse((cost, id))) = heap.pop() {
            if id == goal {
                return Ok(reconstruct(map, &entry_s, &prev, target_lane, target_s, change_length));
            }
            if cost > dist[id.index()] {
                continue;
            }
            let lane = map.lane(id)?;
            let s = entry_s[id.index()];

            if id == target_lane && s <= target_s + 1e-6 {
                let c = cost.saturating_add(to_cm(target_s - s));
                if c < dist[goal.index()] {
                    dist[goal.index()] = c;
                    heap.push(Reverse((c, goal)));
                }
            }

            let mut succ = lane.successors.clone();
            succ.sort_unstable();
            for next in succ {
                let c = cost.saturating_add(to_cm(lane.length() - s));
                if c < dist[next.index()] {
                    dist[next.index()] = c;
                    entry_s[next.index()] = 0.0;
                    prev[next.index()] = Some((id, Step::Successor));
                    heap.push(Reverse((c, next)));
                }
            }

            if s + change_length > lane.length() {
                continue;
            }
            let blend_end = lane.point_at(s + change_length);
            for nb in [lane.left, lane.right].into_iter().flatten() {
                let (nb_s, _) = map.project(nb, blend_end)?;
                let c = cost
                    .saturating_add(to_cm(change_length))
                    .saturating_add(LANE_CHANGE_PENALTY_CM);
                if c < dist[nb.index()] {
                    dist[nb.index()] = c;
                    entry_s[nb.index()] = nb_s;
                    prev[nb.index()] = Some((id, Step::Change));
                    heap.push(Reverse((c, nb)));
                }
            }
        }

        Err(MapError::NoRoute { from: from_lane, target })
    }
}

fn reconstruct(
    map: &RoadMap,
    entry_s: &[f64],
    prev: &[Option<(LaneId, Step)>],
    target_lane: LaneId,
    target_s: f64,
    change_length: f64,
) -> LaneRoute {
    let mut segments = Vec::new();
    let push_follow = |segments: &mut Vec<RouteSegment>, lane: LaneId, from_s: f64, to_s: f64| {
        if to_s - from_s > 1e-6 {
            segments.push(RouteSegment::Follow { lane, from_s, to_s });
        }
    };

    push_follow(&mut segments, target_lane, entry_s[target_lane.index()], target_s);
    let mut cur = target_lane;
    while let Some((p, step)) = prev[cur.index()] {
        let ps = entry_s[p.index()];
        match step {
            Step::Successor => {
                let len = map.lanes()[p.index()].length();
                push_follow(&mut segments, p, ps, len);
            }
            Step::Change => segments.push(RouteSegment::ChangeLane {
                from_lane: p,
                to_lane:   cur,
                from_s:    ps,
                length:    change_length,
            }),
        }
        cur = p;
    }
    segments.reverse();
    let length_m = segments.iter().map(RouteSegment::length).sum();
    LaneRoute { segments, length_m }
}
