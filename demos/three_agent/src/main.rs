//! three_agent — end-to-end run of the gofi planner.
//!
//! An ego vehicle follows a traffic car that changes lane, overtakes a car
//! parked in the ego's lane and exits back in front of it.  The parked car is
//! hidden behind the traffic car for the first 60 frames, so the ego has to
//! plan around a hypothesised agent it cannot see yet.
//!
//! ```text
//! cargo run -p three_agent                       # bundled scenario
//! cargo run -p three_agent -- path/to/scenario.json out/dir
//! RUST_LOG=gofi_sim=debug GOFI_LOG_FORMAT=json cargo run -p three_agent
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gofi_core::{AgentId, Frame, WorldState};
use gofi_output::{CsvWriter, OutputWriter, SimOutputObserver};
use gofi_recognition::{GoalProbabilityRecord, ReconcileOutcome};
use gofi_scenario::load_scenario_with_map;
use gofi_sim::{Decision, SimBuilder, SimObserver};

// ── Constants ─────────────────────────────────────────────────────────────────

const DEFAULT_SCENARIO: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/scenario.json");
const DEFAULT_OUTPUT:   &str = "output/three_agent";

// ── Observer wrapper ──────────────────────────────────────────────────────────

/// Forwards to the output observer and keeps a few counts for the summary.
struct SummaryObserver<W: OutputWriter> {
    inner:        SimOutputObserver<W>,
    frames:       u64,
    decisions:    usize,
    fallbacks:    usize,
    belief_rows:  usize,
    reconciled:   Vec<(Frame, AgentId, ReconcileOutcome)>,
}

impl<W: OutputWriter> SummaryObserver<W> {
    fn new(inner: SimOutputObserver<W>) -> Self {
        Self { inner, frames: 0, decisions: 0, fallbacks: 0, belief_rows: 0, reconciled: Vec::new() }
    }
}

impl<W: OutputWriter> SimObserver for SummaryObserver<W> {
    fn on_frame_start(&mut self, frame: Frame, world: &WorldState) {
        self.frames += 1;
        self.inner.on_frame_start(frame, world);
    }

    fn on_beliefs(
        &mut self,
        frame:      Frame,
        records:    &[GoalProbabilityRecord],
        reconciled: &[(AgentId, ReconcileOutcome)],
    ) {
        self.belief_rows += records.len();
        self.reconciled.extend(reconciled.iter().map(|&(a, o)| (frame, a, o)));
        self.inner.on_beliefs(frame, records, reconciled);
    }

    fn on_decision(&mut self, decision: &Decision) {
        self.decisions += 1;
        if decision.fallback {
            self.fallbacks += 1;
        }
        self.inner.on_decision(decision);
    }

    fn on_frame_end(&mut self, frame: Frame, world: &WorldState) {
        self.inner.on_frame_end(frame, world);
    }

    fn on_sim_end(&mut self, final_frame: Frame) {
        self.inner.on_sim_end(final_frame);
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("GOFI_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let scenario_path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_SCENARIO));
    let output_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    // 1. Scenario and map.
    let (scenario, map) = load_scenario_with_map(&scenario_path)
        .with_context(|| format!("loading {}", scenario_path.display()))?;
    let config = scenario.scenario.clone();
    info!(
        agents = scenario.agents.len(),
        lanes = map.lane_count(),
        fps = config.fps,
        max_steps = config.max_steps,
        "scenario loaded"
    );

    // 2. Sim.
    let mut sim = SimBuilder::new(scenario, map).build()?;

    // 3. Output.
    let writer = CsvWriter::new(Path::new(&output_dir))?;
    let mut obs = SummaryObserver::new(SimOutputObserver::new(writer, &config));

    // 4. Run.
    let t0 = Instant::now();
    sim.run(&mut obs)?;
    let elapsed = t0.elapsed();

    if let Some(e) = obs.inner.take_error() {
        warn!(error = %e, "output incomplete");
    }

    // 5. Summary.
    println!("Simulation complete in {:.3} s ({} frames)", elapsed.as_secs_f64(), obs.frames);
    println!("  decisions.csv          : {} rows ({} fallback)", obs.decisions, obs.fallbacks);
    println!("  goal_probabilities.csv : {} records", obs.belief_rows);
    println!("  agent_states.csv       : {} rows", obs.frames as usize * sim.world.agents.len());
    println!("  written to {}", output_dir.display());
    println!();

    for (frame, agent, outcome) in &obs.reconciled {
        match outcome {
            ReconcileOutcome::Fresh => println!("{frame}: {agent} first observed"),
            ReconcileOutcome::Consistent { error } => {
                println!("{frame}: {agent} re-observed, prediction held (error {error:.2} m)")
            }
            ReconcileOutcome::Diverged { error } => {
                println!("{frame}: {agent} re-observed, prediction discarded (error {error:.2} m)")
            }
        }
    }
    println!();

    // 6. Final beliefs.
    println!("{:<14} {:<16} {:<10} {:<16}", "Agent", "Tracking", "Exists", "Likeliest goal");
    println!("{}", "-".repeat(58));
    for (id, belief) in sim.ego.beliefs().iter() {
        let goal = belief
            .map_goal()
            .map(|(g, p)| format!("({:.0}, {:.2}) p={p:.2}", g.center().x, g.center().y))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<14} {:<16} {:<10.2} {:<16}",
            id.to_string(),
            belief.state().as_str(),
            belief.existence(),
            goal
        );
    }

    let ego = sim.world.require(sim.ego.id)?;
    println!();
    println!(
        "Ego finished at ({:.1}, {:.1}), {:?}",
        ego.position.x,
        ego.position.y,
        sim.ego.status()
    );

    Ok(())
}
