//! Simulation observer trait for progress reporting and data collection.

use gofi_core::{AgentId, Frame, WorldState};
use gofi_recognition::{GoalProbabilityRecord, ReconcileOutcome};

use crate::Decision;

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] at key points of each
/// frame.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — decision printer
///
/// ```rust,ignore
/// struct Printer;
///
/// impl SimObserver for Printer {
///     fn on_decision(&mut self, d: &Decision) {
///         println!("{}: {}", d.frame, d.action);
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the start of each frame with the world the ego perceives.
    fn on_frame_start(&mut self, _frame: Frame, _world: &WorldState) {}

    /// Called after the ego's beliefs were updated.  `records` holds one row
    /// per tracked agent; `reconciled` lists agents that (re)entered view.
    fn on_beliefs(
        &mut self,
        _frame:      Frame,
        _records:    &[GoalProbabilityRecord],
        _reconciled: &[(AgentId, ReconcileOutcome)],
    ) {}

    /// Called when the ego commits to a new macro-action.
    fn on_decision(&mut self, _decision: &Decision) {}

    /// Called at the end of each frame, before agents advance.
    fn on_frame_end(&mut self, _frame: Frame, _world: &WorldState) {}

    /// Called once after the final frame.
    fn on_sim_end(&mut self, _final_frame: Frame) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
