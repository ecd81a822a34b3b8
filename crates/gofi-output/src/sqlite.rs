//! SQLite output backend (feature `sqlite`).
//!
//! Creates `output.db` in the output directory with three tables:
//! `decisions`, `goal_probabilities` and `agent_states`.

use std::fs;
use std::path::Path;

use rusqlite::{Connection, params};

use crate::writer::OutputWriter;
use crate::{AgentStateRow, DecisionRow, GoalProbabilityRow, OutputResult};

/// Writes run output to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS decisions (
                 frame            INTEGER NOT NULL,
                 time_secs        REAL    NOT NULL,
                 agent_id         INTEGER NOT NULL,
                 action           TEXT    NOT NULL,
                 mean_reward      REAL    NOT NULL,
                 visits           INTEGER NOT NULL,
                 fallback         INTEGER NOT NULL,
                 simulated_agents INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS goal_probabilities (
                 frame       INTEGER NOT NULL,
                 agent_id    INTEGER NOT NULL,
                 goal_index  INTEGER NOT NULL,
                 probability REAL    NOT NULL,
                 existence   REAL    NOT NULL,
                 tracking    TEXT    NOT NULL,
                 reconcile   TEXT
             );
             CREATE TABLE IF NOT EXISTS agent_states (
                 frame     INTEGER NOT NULL,
                 time_secs REAL    NOT NULL,
                 agent_id  INTEGER NOT NULL,
                 x         REAL    NOT NULL,
                 y         REAL    NOT NULL,
                 vx        REAL    NOT NULL,
                 vy        REAL    NOT NULL,
                 heading   REAL    NOT NULL,
                 PRIMARY KEY (frame, agent_id)
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_decision(&mut self, row: &DecisionRow) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO decisions \
             (frame, time_secs, agent_id, action, mean_reward, visits, fallback, simulated_agents) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.frame as i64,
                row.time_secs,
                row.agent_id,
                row.action,
                row.mean_reward,
                row.visits,
                row.fallback as i64,
                row.simulated_agents,
            ],
        )?;
        Ok(())
    }

    fn write_goal_probabilities(&mut self, rows: &[GoalProbabilityRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO goal_probabilities \
                 (frame, agent_id, goal_index, probability, existence, tracking, reconcile) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.frame as i64,
                    row.agent_id,
                    row.goal_index,
                    row.probability,
                    row.existence,
                    row.tracking,
                    row.reconcile,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_agent_states(&mut self, rows: &[AgentStateRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO agent_states \
                 (frame, time_secs, agent_id, x, y, vx, vy, heading) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.frame as i64,
                    row.time_secs,
                    row.agent_id,
                    row.x,
                    row.y,
                    row.vx,
                    row.vy,
                    row.heading,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
