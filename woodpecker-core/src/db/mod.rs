//! SQLite persistence for tactics and trials.

mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::models::*;

pub use schema::SCHEMA;

/// Format SQLite's `CURRENT_TIMESTAMP` produces.
const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

const TACTIC_COLUMNS: &str =
    "id, catalogue, player_side, difficulty, days_since_last_trial, n_success, n_attempts";

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database file, creating its parent directory.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Location of the database file; `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run `f` inside a transaction. Rolled back if `f` fails.
    ///
    /// Must not be nested.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // ── Tactics ─────────────────────────────────────────────────────────────

    /// Insert a tactic and return its newly assigned id.
    pub fn insert_tactic(&self, input: &CreateTacticInput) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO tactics (catalogue, player_side) VALUES (?1, ?2)",
            params![input.catalogue, input.player_side.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_tactic(&self, id: i64) -> Result<Option<Tactic>> {
        let sql = format!("SELECT {TACTIC_COLUMNS} FROM tactics WHERE id = ?1");
        let tactic = self
            .conn
            .query_row(&sql, params![id], tactic_from_row)
            .optional()?;
        Ok(tactic)
    }

    pub fn list_tactic_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM tactics ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub fn list_tactics(&self) -> Result<Vec<Tactic>> {
        let sql = format!("SELECT {TACTIC_COLUMNS} FROM tactics ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let tactics = stmt
            .query_map([], tactic_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tactics)
    }

    /// Overwrite the derived scheduling fields. Returns false if no such tactic.
    pub fn update_scheduling(&self, id: i64, scheduling: &Scheduling) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tactics
             SET difficulty = ?1, days_since_last_trial = ?2, n_success = ?3, n_attempts = ?4
             WHERE id = ?5",
            params![
                scheduling.difficulty,
                scheduling.days_since_last_trial,
                scheduling.n_success,
                scheduling.n_attempts,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn count_tactics(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tactics", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Tactics with fewer than `mastery_threshold` successes.
    pub fn count_unmastered(&self, mastery_threshold: u32) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tactics WHERE n_success < ?1",
            params![mastery_threshold],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    pub fn pool_stats(&self, mastery_threshold: u32) -> Result<PoolStats> {
        Ok(PoolStats {
            current: self.count_unmastered(mastery_threshold)?,
            total: self.count_tactics()?,
        })
    }

    // ── Trials ──────────────────────────────────────────────────────────────

    /// Store a finished attempt. The timestamp is assigned by the database.
    pub fn insert_trial(&self, trial: &NewTrial) -> Result<Trial> {
        self.conn.execute(
            "INSERT INTO trials (tactic_id, outcome, duration) VALUES (?1, ?2, ?3)",
            params![trial.tactic_id, trial.outcome, trial.duration],
        )?;
        let id = self.conn.last_insert_rowid();
        let stored = self.conn.query_row(
            "SELECT id, tactic_id, timestamp, outcome, duration FROM trials WHERE id = ?1",
            params![id],
            trial_from_row,
        )?;
        Ok(stored)
    }

    /// All trials of a tactic, oldest first.
    pub fn trials_for(&self, tactic_id: i64) -> Result<Vec<Trial>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tactic_id, timestamp, outcome, duration
             FROM trials
             WHERE tactic_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;
        let trials = stmt
            .query_map(params![tactic_id], trial_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trials)
    }

    pub fn count_trials(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trials", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

fn tactic_from_row(row: &Row<'_>) -> rusqlite::Result<Tactic> {
    let side: String = row.get(2)?;
    let player_side = PlayerSide::from_str(&side).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown player side {:?}", side).into(),
        )
    })?;

    Ok(Tactic {
        id: row.get(0)?,
        catalogue: row.get(1)?,
        player_side,
        scheduling: Scheduling {
            difficulty: row.get(3)?,
            days_since_last_trial: row.get(4)?,
            n_success: row.get(5)?,
            n_attempts: row.get(6)?,
        },
    })
}

fn trial_from_row(row: &Row<'_>) -> rusqlite::Result<Trial> {
    let raw: String = row.get(2)?;
    let timestamp = parse_timestamp(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
    })?;

    Ok(Trial {
        id: row.get(0)?,
        tactic_id: row.get(1)?,
        timestamp,
        outcome: row.get(3)?,
        duration: row.get(4)?,
    })
}

/// Parse a stored timestamp. SQLite writes UTC without a zone suffix.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, SQLITE_TIMESTAMP) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::Timestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn tactic(db: &Database, side: PlayerSide) -> i64 {
        db.insert_tactic(&CreateTacticInput {
            catalogue: "lichess".into(),
            player_side: side,
        })
        .unwrap()
    }

    #[test]
    fn migrate_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("woodpecker.sqlite");

        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        assert_eq!(db.count_tactics().unwrap(), 0);
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn new_tactic_has_default_scheduling() {
        let db = test_db();
        let id = tactic(&db, PlayerSide::Black);

        let stored = db.get_tactic(id).unwrap().unwrap();
        assert_eq!(stored.catalogue, "lichess");
        assert_eq!(stored.player_side, PlayerSide::Black);
        assert_eq!(stored.scheduling, Scheduling::default());
    }

    #[test]
    fn ids_increase() {
        let db = test_db();
        let a = tactic(&db, PlayerSide::White);
        let b = tactic(&db, PlayerSide::White);
        assert!(b > a);
        assert_eq!(db.list_tactic_ids().unwrap(), vec![a, b]);
    }

    #[test]
    fn insert_trial_assigns_timestamp() {
        let db = test_db();
        let id = tactic(&db, PlayerSide::White);
        let before = Utc::now() - chrono::Duration::seconds(2);

        let trial = db
            .insert_trial(&NewTrial {
                tactic_id: id,
                outcome: true,
                duration: 4.5,
            })
            .unwrap();

        assert_eq!(trial.tactic_id, id);
        assert!(trial.outcome);
        assert_eq!(trial.duration, 4.5);
        assert!(trial.timestamp >= before);
        assert_eq!(db.trials_for(id).unwrap(), vec![trial]);
    }

    #[test]
    fn trial_requires_existing_tactic() {
        let db = test_db();
        let result = db.insert_trial(&NewTrial {
            tactic_id: 42,
            outcome: false,
            duration: 0.0,
        });
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn update_scheduling_rejects_more_successes_than_attempts() {
        let db = test_db();
        let id = tactic(&db, PlayerSide::White);
        let result = db.update_scheduling(
            id,
            &Scheduling {
                difficulty: 1.0,
                days_since_last_trial: Some(0.0),
                n_success: 3,
                n_attempts: 2,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = test_db();
        let result: Result<()> = db.transaction(|db| {
            tactic(db, PlayerSide::White);
            Err(Error::TacticNotFound(7))
        });
        assert!(result.is_err());
        assert_eq!(db.count_tactics().unwrap(), 0);
    }

    #[test]
    fn pool_stats_counts_unmastered() {
        let db = test_db();
        let a = tactic(&db, PlayerSide::White);
        tactic(&db, PlayerSide::White);
        db.update_scheduling(
            a,
            &Scheduling {
                difficulty: 1.0,
                days_since_last_trial: Some(3.0),
                n_success: 5,
                n_attempts: 5,
            },
        )
        .unwrap();

        let stats = db.pool_stats(5).unwrap();
        assert_eq!(stats, PoolStats { current: 1, total: 2 });
    }

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let a = parse_timestamp("2024-03-01 12:30:00").unwrap();
        let b = parse_timestamp("2024-03-01T12:30:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
