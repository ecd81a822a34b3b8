//! Lane map representation and builder.
//!
//! # Data layout
//!
//! Each [`Lane`] is a directed polyline midline with a constant width.
//! Arc length `s` runs from 0 at the first vertex to `lane.length()` at the
//! last; `cum_s[i]` is the arc length at vertex `i`, so locating the segment
//! containing a given `s` is a binary search.
//!
//! Lateral neighbours (`left`, `right`) share the driving direction and are
//! the targets of lane changes.  `successors` are lanes whose first vertex
//! continues the last vertex of this one.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over midline samples taken every
//! [`SAMPLE_SPACING_M`] metres maps a position to the lanes that pass near it.
//! Candidate lanes are then checked exactly by projection.

use std::f64::consts::FRAC_PI_2;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use gofi_core::{LaneId, Vec2, wrap_angle};

use crate::{MapError, MapResult};

/// Spacing of midline samples inserted into the R-tree.
pub const SAMPLE_SPACING_M: f64 = 1.0;

/// Slack added to the half lane width when deciding whether a point is on a
/// lane.
pub const LANE_TOLERANCE_M: f64 = 0.5;

// ── R-tree sample entry ───────────────────────────────────────────────────────

#[derive(Clone)]
struct SampleEntry {
    point: [f64; 2],
    lane:  LaneId,
}

impl RTreeObject for SampleEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for SampleEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── Lane ──────────────────────────────────────────────────────────────────────

/// One directed lane.
#[derive(Clone, Debug)]
pub struct Lane {
    pub id:         LaneId,
    pub midline:    Vec<Vec2>,
    pub width:      f64,
    pub left:       Option<LaneId>,
    pub right:      Option<LaneId>,
    pub successors: Vec<LaneId>,
    cum_s:          Vec<f64>,
}

impl Lane {
    fn new(id: LaneId, midline: Vec<Vec2>, width: f64) -> Self {
        let mut cum_s = Vec::with_capacity(midline.len());
        let mut acc = 0.0;
        cum_s.push(0.0);
        for w in midline.windows(2) {
            acc += w[0].distance(w[1]);
            cum_s.push(acc);
        }
        Self { id, midline, width, left: None, right: None, successors: Vec::new(), cum_s }
    }

    /// Total arc length in metres.
    #[inline]
    pub fn length(&self) -> f64 {
        self.cum_s.last().copied().unwrap_or(0.0)
    }

    /// Index of the segment containing arc length `s` (clamped).
    fn segment_at(&self, s: f64) -> usize {
        let last = self.midline.len().saturating_sub(2);
        self.cum_s.partition_point(|&c| c <= s).saturating_sub(1).min(last)
    }

    /// Point on the midline at arc length `s`, clamped to the lane.
    pub fn point_at(&self, s: f64) -> Vec2 {
        let s = s.clamp(0.0, self.length());
        let i = self.segment_at(s);
        let seg = self.cum_s[i + 1] - self.cum_s[i];
        if seg <= 0.0 {
            return self.midline[i];
        }
        self.midline[i].lerp(self.midline[i + 1], (s - self.cum_s[i]) / seg)
    }

    /// Direction of travel at arc length `s`.
    pub fn heading_at(&self, s: f64) -> f64 {
        let i = self.segment_at(s.clamp(0.0, self.length()));
        (self.midline[i + 1] - self.midline[i]).angle()
    }

    /// Closest-point projection: `(s, lateral)`, lateral positive to the left.
    pub fn project(&self, point: Vec2) -> (f64, f64) {
        let (s, lateral, _) = self.closest(point);
        (s, lateral)
    }

    /// `(s, lateral, distance)` of the closest midline point to `point`.
    fn closest(&self, point: Vec2) -> (f64, f64, f64) {
        let mut best = (0.0, 0.0, f64::INFINITY);
        for (i, w) in self.midline.windows(2).enumerate() {
            let seg = w[1] - w[0];
            let len2 = seg.dot(seg);
            let t = if len2 > 0.0 { ((point - w[0]).dot(seg) / len2).clamp(0.0, 1.0) } else { 0.0 };
            let foot = w[0] + seg * t;
            let d = foot.distance(point);
            if d < best.2 {
                let lateral = seg.normalized().cross(point - foot);
                best = (self.cum_s[i] + t * len2.sqrt(), lateral, d);
            }
        }
        best
    }

    /// `true` if `point` is within half the lane width (plus tolerance) of
    /// the midline.
    pub fn contains(&self, point: Vec2) -> bool {
        self.closest(point).2 <= self.width * 0.5 + LANE_TOLERANCE_M
    }
}

// ── MapBounds ─────────────────────────────────────────────────────────────────

/// Axis-aligned extent of all lane geometry, padded by half the widest lane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl MapBounds {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

// ── RoadMap ───────────────────────────────────────────────────────────────────

/// Immutable lane map shared read-only by every planner and rollout.
///
/// Do not construct directly; use [`RoadMapBuilder`].
pub struct RoadMap {
    lanes:       Vec<Lane>,
    bounds:      MapBounds,
    spatial_idx: RTree<SampleEntry>,
    max_width:   f64,
}

impl RoadMap {
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, id: LaneId) -> MapResult<&Lane> {
        self.lanes.get(id.index()).ok_or(MapError::LaneNotFound(id))
    }

    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    /// `true` if `point` lies within the map's extent.
    pub fn contains(&self, point: Vec2) -> bool {
        self.bounds.contains(point)
    }

    pub fn project(&self, lane: LaneId, point: Vec2) -> MapResult<(f64, f64)> {
        Ok(self.lane(lane)?.project(point))
    }

    pub fn point_at(&self, lane: LaneId, s: f64) -> MapResult<Vec2> {
        Ok(self.lane(lane)?.point_at(s))
    }

    pub fn heading_at(&self, lane: LaneId, s: f64) -> MapResult<f64> {
        Ok(self.lane(lane)?.heading_at(s))
    }

    /// Lowest-id successor, the lane `Continue` follows.
    pub fn next_lane(&self, lane: LaneId) -> Option<LaneId> {
        self.lanes.get(lane.index())?.successors.iter().copied().min()
    }

    /// Lanes whose midline passes within reach of `point`, ascending by id.
    fn candidate_lanes(&self, point: Vec2) -> Vec<LaneId> {
        let reach = self.max_width * 0.5 + LANE_TOLERANCE_M + SAMPLE_SPACING_M;
        let mut ids: Vec<LaneId> = self
            .spatial_idx
            .locate_within_distance([point.x, point.y], reach * reach)
            .map(|e| e.lane)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// The lane containing `point` whose midline is closest, ignoring heading.
    pub fn lane_at(&self, point: Vec2) -> Option<LaneId> {
        self.closest_containing(point, |_| true)
    }

    /// The lane containing `point` whose direction agrees with `heading`
    /// (within ±90°).  Ties go to the lowest lane id.
    pub fn best_lane_at(&self, point: Vec2, heading: f64) -> Option<LaneId> {
        self.closest_containing(point, |lane| {
            let (s, _) = lane.project(point);
            wrap_angle(lane.heading_at(s) - heading).abs() < FRAC_PI_2
        })
    }

    fn closest_containing(&self, point: Vec2, accept: impl Fn(&Lane) -> bool) -> Option<LaneId> {
        let mut best: Option<(f64, LaneId)> = None;
        for id in self.candidate_lanes(point) {
            let lane = &self.lanes[id.index()];
            if !lane.contains(point) || !accept(lane) {
                continue;
            }
            let (_, lateral) = lane.project(point);
            if best.is_none_or(|(d, _)| lateral.abs() < d - 1e-9) {
                best = Some((lateral.abs(), id));
            }
        }
        best.map(|(_, id)| id)
    }
}

// ── RoadMapBuilder ────────────────────────────────────────────────────────────

/// Construct a [`RoadMap`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use gofi_core::Vec2;
/// use gofi_map::RoadMapBuilder;
///
/// let mut b = RoadMapBuilder::new();
/// let right = b.add_lane(vec![Vec2::new(0.0, -1.75), Vec2::new(100.0, -1.75)], 3.5);
/// let left  = b.add_lane(vec![Vec2::new(0.0,  1.75), Vec2::new(100.0,  1.75)], 3.5);
/// b.link_adjacent(left, right);
/// let map = b.build().unwrap();
/// assert_eq!(map.lane_count(), 2);
/// ```
#[derive(Default)]
pub struct RoadMapBuilder {
    lanes: Vec<Lane>,
    links: Vec<Link>,
}

enum Link {
    Adjacent { left: LaneId, right: LaneId },
    Successor { from: LaneId, to: LaneId },
}

impl RoadMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lane and return its `LaneId` (sequential from 0).
    pub fn add_lane(&mut self, midline: Vec<Vec2>, width: f64) -> LaneId {
        let id = LaneId(self.lanes.len() as u32);
        self.lanes.push(Lane::new(id, midline, width));
        id
    }

    /// Declare `left` and `right` as lateral neighbours in the same direction.
    pub fn link_adjacent(&mut self, left: LaneId, right: LaneId) {
        self.links.push(Link::Adjacent { left, right });
    }

    /// Declare that `to` continues `from`.
    pub fn add_successor(&mut self, from: LaneId, to: LaneId) {
        self.links.push(Link::Successor { from, to });
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Validate geometry and links, then bulk-load the spatial index.
    pub fn build(self) -> MapResult<RoadMap> {
        let mut lanes = self.lanes;
        let n = lanes.len();
        let check = |id: LaneId| if id.index() < n { Ok(id) } else { Err(MapError::LaneNotFound(id)) };

        for lane in &lanes {
            if lane.midline.len() < 2 {
                return Err(MapError::InvalidLane { lane: lane.id, reason: "midline needs two points".into() });
            }
            if !(lane.width > 0.0) {
                return Err(MapError::InvalidLane { lane: lane.id, reason: "width must be positive".into() });
            }
            if lane.length() <= 0.0 {
                return Err(MapError::InvalidLane { lane: lane.id, reason: "zero-length midline".into() });
            }
        }

        for link in self.links {
            match link {
                Link::Adjacent { left, right } => {
                    lanes[check(left)?.index()].right = Some(check(right)?);
                    lanes[right.index()].left = Some(left);
                }
                Link::Successor { from, to } => {
                    let to = check(to)?;
                    lanes[check(from)?.index()].successors.push(to);
                }
            }
        }

        let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut max_width: f64 = 0.0;
        let mut entries = Vec::new();
        for lane in &lanes {
            max_width = max_width.max(lane.width);
            let pad = lane.width * 0.5;
            for p in &lane.midline {
                min = Vec2::new(min.x.min(p.x - pad), min.y.min(p.y - pad));
                max = Vec2::new(max.x.max(p.x + pad), max.y.max(p.y + pad));
            }
            let samples = (lane.length() / SAMPLE_SPACING_M).ceil() as usize;
            for k in 0..=samples {
                let p = lane.point_at(k as f64 * SAMPLE_SPACING_M);
                entries.push(SampleEntry { point: [p.x, p.y], lane: lane.id });
            }
        }
        if lanes.is_empty() {
            min = Vec2::ZERO;
            max = Vec2::ZERO;
        }

        tracing::debug!(lanes = n, samples = entries.len(), "road map built");

        Ok(RoadMap {
            lanes,
            bounds: MapBounds { min, max },
            spatial_idx: RTree::bulk_load(entries),
            max_width,
        })
    }
}
