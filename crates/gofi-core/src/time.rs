//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing `Frame` counter.  The
//! mapping to simulated seconds is held in `SimClock`:
//!
//!   seconds = frame / fps
//!
//! Using an integer frame as the canonical time unit keeps occlusion windows
//! and replanning cadence exact (no floating-point drift).  Continuous
//! quantities inside trajectories use `f64` seconds relative to the frame
//! the trajectory was produced at.

use std::fmt;

// ── Frame ─────────────────────────────────────────────────────────────────────

/// An absolute simulation frame counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Frame(pub u64);

impl Frame {
    pub const ZERO: Frame = Frame(0);

    /// Return the frame `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Frame {
        Frame(self.0 + n)
    }

    /// Frames elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub fn since(self, earlier: Frame) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Frame {
    type Output = Frame;
    #[inline]
    fn add(self, rhs: u64) -> Frame {
        Frame(self.0 + rhs)
    }
}

impl std::ops::Sub for Frame {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Frame) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Converts between frame counts and simulated seconds.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Frames per simulated second.
    pub fps: u32,
    /// The current frame — advanced by `SimClock::advance()` each step.
    pub current_frame: Frame,
}

impl SimClock {
    pub fn new(fps: u32) -> Self {
        Self { fps, current_frame: Frame::ZERO }
    }

    /// Advance the clock by one frame.
    #[inline]
    pub fn advance(&mut self) {
        self.current_frame = Frame(self.current_frame.0 + 1);
    }

    /// Seconds per frame.
    #[inline]
    pub fn dt(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Elapsed simulated seconds since frame 0.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.secs_at(self.current_frame)
    }

    /// Simulated seconds at an arbitrary frame.
    #[inline]
    pub fn secs_at(&self, frame: Frame) -> f64 {
        frame.0 as f64 / self.fps as f64
    }

    /// How many whole frames span `secs` seconds (rounded to nearest, at
    /// least one for any positive duration).
    #[inline]
    pub fn frames_for_secs(&self, secs: f64) -> u64 {
        if secs <= 0.0 {
            return 0;
        }
        ((secs * self.fps as f64).round() as u64).max(1)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2} s)", self.current_frame, self.elapsed_secs())
    }
}

// ── ScenarioConfig ────────────────────────────────────────────────────────────

/// Scenario-wide settings.  Created once at scenario load; read-only for the
/// lifetime of a run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioConfig {
    /// Path of the road-network description.  Opaque to this crate.
    pub map_path: String,

    /// Global speed cap in m/s applied to every generated trajectory.
    pub max_speed: f64,

    /// Simulation frames per second.
    pub fps: u32,

    /// Master RNG seed for search and smoothing.
    pub seed: u64,

    /// Number of frames the stepping driver runs for.
    pub max_steps: u64,
}

impl ScenarioConfig {
    /// The frame at which the simulation ends (exclusive upper bound).
    #[inline]
    pub fn end_frame(&self) -> Frame {
        Frame(self.max_steps)
    }

    /// Seconds per frame.
    #[inline]
    pub fn dt(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.fps)
    }
}
