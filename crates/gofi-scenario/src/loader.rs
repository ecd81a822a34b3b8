//! JSON scenario and map I/O.
//!
//! A scenario's `map_path` is resolved relative to the directory of the
//! scenario file unless it is absolute.  Maps are stored as a serialised
//! [`MapDescriptor`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use gofi_map::{MapDescriptor, RoadMap};

use crate::{ScenarioError, ScenarioFile, ScenarioResult, validate};

// ── Scenarios ─────────────────────────────────────────────────────────────────

/// Load and validate a scenario file.
pub fn load_scenario(path: &Path) -> ScenarioResult<ScenarioFile> {
    let file = File::open(path)?;
    load_scenario_reader(BufReader::new(file))
}

/// Like [`load_scenario`] but accepts any `Read` source.
pub fn load_scenario_reader<R: Read>(reader: R) -> ScenarioResult<ScenarioFile> {
    let scenario: ScenarioFile =
        serde_json::from_reader(reader).map_err(|e| ScenarioError::Parse(e.to_string()))?;
    validate(&scenario)?;
    info!(
        agents = scenario.agents.len(),
        fps = scenario.scenario.fps,
        max_steps = scenario.scenario.max_steps,
        "scenario loaded"
    );
    Ok(scenario)
}

/// Write `scenario` as pretty-printed JSON.
pub fn write_scenario<W: Write>(scenario: &ScenarioFile, writer: W) -> ScenarioResult<()> {
    serde_json::to_writer_pretty(writer, scenario).map_err(|e| ScenarioError::Parse(e.to_string()))
}

pub fn save_scenario(scenario: &ScenarioFile, path: &Path) -> ScenarioResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_scenario(scenario, &mut out)?;
    out.flush()?;
    Ok(())
}

// ── Maps ──────────────────────────────────────────────────────────────────────

pub fn load_map(path: &Path) -> ScenarioResult<RoadMap> {
    let file = File::open(path)?;
    load_map_reader(BufReader::new(file))
}

pub fn load_map_reader<R: Read>(reader: R) -> ScenarioResult<RoadMap> {
    let descriptor: MapDescriptor =
        serde_json::from_reader(reader).map_err(|e| ScenarioError::Parse(e.to_string()))?;
    Ok(descriptor.build()?)
}

/// Where the map of the scenario at `scenario_path` lives.
pub fn resolve_map_path(scenario_path: &Path, map_path: &str) -> PathBuf {
    let map = Path::new(map_path);
    if map.is_absolute() {
        return map.to_path_buf();
    }
    scenario_path.parent().map(|dir| dir.join(map)).unwrap_or_else(|| map.to_path_buf())
}

/// Load a scenario together with the map it names.
pub fn load_scenario_with_map(path: &Path) -> ScenarioResult<(ScenarioFile, RoadMap)> {
    let scenario = load_scenario(path)?;
    let map = load_map(&resolve_map_path(path, &scenario.scenario.map_path))?;
    Ok((scenario, map))
}
