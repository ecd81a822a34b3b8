//! Integration tests for gofi-output.

#[cfg(test)]
mod helpers {
    use std::io::Cursor;

    use gofi_core::Vec2;
    use gofi_map::{RoadMap, RoadMapBuilder};
    use gofi_scenario::{ScenarioFile, load_scenario_reader};

    use crate::row::{AgentStateRow, DecisionRow, GoalProbabilityRow};

    pub const SCENARIO: &str = r#"{
      "scenario": { "map_path": "map.json", "max_speed": 10.0, "fps": 20, "seed": 3, "max_steps": 10 },
      "agents": [
        { "id": 0, "type": "Ego",
          "spawn": { "box": { "center": [-31.0, -1.75], "length": 4.5, "width": 1.8 }, "velocity": [8.0, 0.0] },
          "goals": [ { "box": { "center": [90.0, -1.75], "length": 10.0, "width": 3.5 } } ],
          "mcts": { "t_update": 0.25, "n_simulations": 6, "max_depth": 1 } },
        { "id": 1, "type": "Traffic",
          "spawn": { "box": { "center": [-15.0, -1.75], "length": 4.5, "width": 1.8 }, "velocity": [10.0, 0.0] },
          "goals": [ { "box": { "center": [90.0, -1.75], "length": 10.0, "width": 3.5 } } ] },
        { "id": 2, "type": "Occluded",
          "spawn": { "box": { "center": [5.0, -1.75], "length": 4.5, "width": 1.8 }, "velocity": [0.0, 0.0] },
          "goals": [ { "box": { "center": [90.0, -1.75], "length": 10.0, "width": 3.5 } } ],
          "macro_actions": [ { "type": "Stop", "duration": 100.0 } ],
          "occlusions": [ { "start_frame": 0, "end_frame": 60, "by_agent": 1 } ] }
      ]
    }"#;

    pub fn scenario() -> ScenarioFile {
        load_scenario_reader(Cursor::new(SCENARIO)).unwrap()
    }

    pub fn road() -> RoadMap {
        let mut b = RoadMapBuilder::new();
        let right = b.add_lane(vec![Vec2::new(-60.0, -1.75), Vec2::new(100.0, -1.75)], 3.5);
        let left = b.add_lane(vec![Vec2::new(-60.0, 1.75), Vec2::new(100.0, 1.75)], 3.5);
        b.link_adjacent(left, right);
        b.build().unwrap()
    }

    pub fn decision(frame: u64, fallback: bool) -> DecisionRow {
        DecisionRow {
            frame,
            time_secs:        frame as f64 / 20.0,
            agent_id:         0,
            action:           "Continue".into(),
            mean_reward:      -12.5,
            visits:           30,
            fallback,
            simulated_agents: 2,
        }
    }

    pub fn goal(frame: u64, agent_id: u32, goal_index: u32, reconcile: Option<&'static str>) -> GoalProbabilityRow {
        GoalProbabilityRow {
            frame,
            agent_id,
            goal_index,
            probability: 0.5,
            existence:   1.0,
            tracking:    "goal_estimated",
            reconcile,
        }
    }

    pub fn state(frame: u64, agent_id: u32) -> AgentStateRow {
        AgentStateRow {
            frame,
            time_secs: frame as f64 / 20.0,
            agent_id,
            x:         agent_id as f64 * 10.0,
            y:         -1.75,
            vx:        8.0,
            vy:        0.0,
            heading:   0.0,
        }
    }
}

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use super::helpers::{decision, goal, state};
    use crate::csv::{AGENT_STATE_HEADER, CsvWriter, DECISION_HEADER, GOAL_PROBABILITY_HEADER};
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn headers(dir: &TempDir, file: &str) -> Vec<String> {
        let mut rdr = csv::Reader::from_path(dir.path().join(file)).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    fn records(dir: &TempDir, file: &str) -> Vec<csv::StringRecord> {
        let mut rdr = csv::Reader::from_path(dir.path().join(file)).unwrap();
        rdr.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn files_created_with_headers() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        assert_eq!(headers(&dir, "decisions.csv"), DECISION_HEADER);
        assert_eq!(headers(&dir, "goal_probabilities.csv"), GOAL_PROBABILITY_HEADER);
        assert_eq!(headers(&dir, "agent_states.csv"), AGENT_STATE_HEADER);
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tmp();
        let nested = dir.path().join("run").join("01");
        let mut w = CsvWriter::new(&nested).unwrap();
        w.finish().unwrap();
        assert!(nested.join("decisions.csv").exists());
    }

    #[test]
    fn decision_columns() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_decision(&decision(20, false)).unwrap();
        w.write_decision(&decision(40, true)).unwrap();
        w.finish().unwrap();

        let rows = records(&dir, "decisions.csv");
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "20");
        assert_eq!(&rows[0][1], "1");
        assert_eq!(&rows[0][3], "Continue");
        assert_eq!(&rows[0][4], "-12.5");
        assert_eq!(&rows[0][6], "0");
        assert_eq!(&rows[1][6], "1");
        assert_eq!(&rows[1][7], "2");
    }

    #[test]
    fn missing_reconcile_is_an_empty_cell() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_goal_probabilities(&[goal(3, 1, 0, None), goal(3, 2, 1, Some("consistent"))]).unwrap();
        w.finish().unwrap();

        let rows = records(&dir, "goal_probabilities.csv");
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][6], "");
        assert_eq!(&rows[1][1], "2");
        assert_eq!(&rows[1][2], "1");
        assert_eq!(&rows[1][5], "goal_estimated");
        assert_eq!(&rows[1][6], "consistent");
    }

    #[test]
    fn agent_state_batch() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_agent_states(&[state(0, 0), state(0, 1), state(0, 2)]).unwrap();
        w.write_agent_states(&[]).unwrap();
        w.finish().unwrap();

        let rows = records(&dir, "agent_states.csv");
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[2][2], "2");
        assert_eq!(&rows[2][3], "20");
        assert_eq!(&rows[2][4], "-1.75");
    }

    #[test]
    fn finish_idempotent() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use rusqlite::Connection;
    use tempfile::TempDir;

    use super::helpers::{decision, goal, state};
    use crate::sqlite::SqliteWriter;
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn count(dir: &TempDir, table: &str) -> i64 {
        let conn = Connection::open(dir.path().join("output.db")).unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn db_created() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        assert!(dir.path().join("output.db").exists());
        assert_eq!(count(&dir, "decisions"), 0);
    }

    #[test]
    fn row_counts() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_decision(&decision(0, false)).unwrap();
        w.write_goal_probabilities(&[goal(0, 1, 0, None), goal(0, 1, 1, None)]).unwrap();
        w.write_agent_states(&[state(0, 0), state(0, 1)]).unwrap();
        w.finish().unwrap();
        assert_eq!(count(&dir, "decisions"), 1);
        assert_eq!(count(&dir, "goal_probabilities"), 2);
        assert_eq!(count(&dir, "agent_states"), 2);
    }

    #[test]
    fn fallback_and_reconcile_columns() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_decision(&decision(5, true)).unwrap();
        w.write_goal_probabilities(&[goal(5, 2, 0, Some("diverged")), goal(5, 1, 0, None)]).unwrap();
        w.finish().unwrap();

        let conn = Connection::open(dir.path().join("output.db")).unwrap();
        let fallback: i64 = conn.query_row("SELECT fallback FROM decisions", [], |r| r.get(0)).unwrap();
        assert_eq!(fallback, 1);
        let reconcile: Option<String> = conn
            .query_row("SELECT reconcile FROM goal_probabilities WHERE agent_id = 2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(reconcile.as_deref(), Some("diverged"));
        let none: Option<String> = conn
            .query_row("SELECT reconcile FROM goal_probabilities WHERE agent_id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn duplicate_agent_state_rejected() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_agent_states(&[state(1, 0)]).unwrap();
        assert!(w.write_agent_states(&[state(1, 0)]).is_err());
    }
}

#[cfg(test)]
mod observer_tests {
    use gofi_core::{AgentId, Frame};
    use gofi_recognition::{GoalProbabilityRecord, ReconcileOutcome, TrackingState};
    use gofi_sim::SimBuilder;

    use super::helpers::{road, scenario};
    use crate::error::OutputResult;
    use crate::observer::{SimOutputObserver, goal_rows};
    use crate::row::{AgentStateRow, DecisionRow, GoalProbabilityRow};
    use crate::writer::OutputWriter;
    use crate::{CsvWriter, OutputError};

    #[test]
    fn goal_rows_expand_per_goal() {
        let record = GoalProbabilityRecord {
            frame:         Frame(7),
            agent:         AgentId(2),
            state:         TrackingState::Occluded,
            probabilities: vec![0.25, 0.75],
            existence:     0.4,
            reconcile:     Some(ReconcileOutcome::Consistent { error: 0.1 }),
        };
        let rows: Vec<_> = goal_rows(&record).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].goal_index, 1);
        assert_eq!(rows[1].probability, 0.75);
        assert!(rows.iter().all(|r| r.frame == 7 && r.agent_id == 2 && r.existence == 0.4));
        assert!(rows.iter().all(|r| r.tracking == "occluded" && r.reconcile == Some("consistent")));
    }

    /// Writer that fails every call after the first `ok` calls.
    struct Failing {
        ok:    usize,
        calls: usize,
    }

    impl Failing {
        fn tick(&mut self) -> OutputResult<()> {
            self.calls += 1;
            if self.calls > self.ok {
                Err(OutputError::Io(std::io::Error::other(format!("call {}", self.calls))))
            } else {
                Ok(())
            }
        }
    }

    impl OutputWriter for Failing {
        fn write_decision(&mut self, _row: &DecisionRow) -> OutputResult<()> {
            self.tick()
        }
        fn write_goal_probabilities(&mut self, _rows: &[GoalProbabilityRow]) -> OutputResult<()> {
            self.tick()
        }
        fn write_agent_states(&mut self, _rows: &[AgentStateRow]) -> OutputResult<()> {
            self.tick()
        }
        fn finish(&mut self) -> OutputResult<()> {
            self.tick()
        }
    }

    #[test]
    fn keeps_only_the_first_error() {
        let s = scenario();
        let cfg = s.scenario.clone();
        let mut sim = SimBuilder::new(s, road()).build().unwrap();
        let mut obs = SimOutputObserver::new(Failing { ok: 2, calls: 0 }, &cfg);
        sim.run(&mut obs).unwrap();
        let err = obs.take_error().expect("writer failed");
        assert_eq!(err.to_string(), "I/O error: call 3");
        assert!(obs.take_error().is_none());
    }

    #[test]
    fn integration_csv() {
        let dir = tempfile::tempdir().unwrap();
        let s = scenario();
        let cfg = s.scenario.clone();
        let mut sim = SimBuilder::new(s, road()).build().unwrap();

        let writer = CsvWriter::new(dir.path()).unwrap();
        let mut obs = SimOutputObserver::new(writer, &cfg);
        sim.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        let count = |file: &str| {
            csv::Reader::from_path(dir.path().join(file)).unwrap().records().count()
        };
        // 10 frames, three agents, two tracked agents with one goal each.
        assert_eq!(count("agent_states.csv"), 30);
        assert_eq!(count("goal_probabilities.csv"), 20);

        let mut rdr = csv::Reader::from_path(dir.path().join("decisions.csv")).unwrap();
        let frames: Vec<u64> = rdr.records().map(|r| r.unwrap()[0].parse().unwrap()).collect();
        assert_eq!(frames.first(), Some(&0));
        assert!(frames.windows(2).all(|w| w[0] < w[1]));
    }
}
