//! Training context: the store, the move files and the configuration,
//! passed explicitly to whatever drives a training run.

use std::time::Instant;

use serde::Serialize;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::importer::{ImportReport, Importer};
use crate::lines::LineStore;
use crate::models::{PoolStats, QueueEntry, Scheduling, Trial};
use crate::notation::SolutionLine;
use crate::playback::{MoveResult, PlaybackSession};
use crate::scheduler::{self, Selector};

/// Running totals for the attempts made since the trainer was opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scoreboard {
    pub attempts: u32,
    pub successes: u32,
    /// One `+` or `-` per recorded attempt, oldest first.
    pub stream: String,
}

impl Scoreboard {
    fn record(&mut self, outcome: bool) {
        self.attempts += 1;
        if outcome {
            self.successes += 1;
            self.stream.push('+');
        } else {
            self.stream.push('-');
        }
    }
}

/// The result of one submitted move, plus anything stored because of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub result: MoveResult,
    /// Present when this move ended a non-retry session.
    pub trial: Option<Trial>,
    /// The tactic's refreshed totals after `trial` was stored.
    pub tally: Option<Scheduling>,
}

pub struct Trainer {
    db: Database,
    lines: LineStore,
    config: Config,
    scoreboard: Scoreboard,
}

impl Trainer {
    /// Open the configured database (creating it if needed) and its move
    /// directory.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Database::open(&config.database)?;
        db.migrate()?;
        let lines = LineStore::beside(&config.database);
        Ok(Self::new(db, lines, config))
    }

    pub fn new(db: Database, lines: LineStore, config: Config) -> Self {
        Self {
            db,
            lines,
            config,
            scoreboard: Scoreboard::default(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn lines(&self) -> &LineStore {
        &self.lines
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn selector(&self) -> Selector {
        Selector::from_config(&self.config)
    }

    pub fn stats(&self) -> Result<PoolStats> {
        self.db.pool_stats(self.config.mastery_threshold)
    }

    /// Refresh and rank the pool.
    pub fn queue(&self) -> Result<Vec<QueueEntry>> {
        self.selector().select(&self.db)
    }

    /// Load the highest-priority tactic, or `None` when nothing is due.
    pub fn next_session(&self) -> Result<Option<PlaybackSession>> {
        match self.queue()?.first() {
            Some(entry) => self.load_session(entry.id).map(Some),
            None => Ok(None),
        }
    }

    pub fn load_session(&self, tactic_id: i64) -> Result<PlaybackSession> {
        self.load_session_at(tactic_id, Instant::now())
    }

    pub fn load_session_at(&self, tactic_id: i64, started: Instant) -> Result<PlaybackSession> {
        let tactic = self
            .db
            .get_tactic(tactic_id)?
            .ok_or(Error::TacticNotFound(tactic_id))?;
        let game = self.lines.read(tactic_id)?;
        let line = SolutionLine::from_game(&game).map_err(|e| Error::CorruptLine {
            tactic_id,
            reason: e.to_string(),
        })?;
        PlaybackSession::start_at(tactic_id, line, tactic.player_side, started)
    }

    pub fn submit(&mut self, session: &mut PlaybackSession, input: &str) -> Result<Step> {
        self.submit_at(session, input, Instant::now())
    }

    /// Feed one move to the session and store the trial if it just ended.
    pub fn submit_at(
        &mut self,
        session: &mut PlaybackSession,
        input: &str,
        now: Instant,
    ) -> Result<Step> {
        let result = session.submit_at(input, now);
        let ended = matches!(
            result,
            MoveResult::Incorrect { .. } | MoveResult::Solved { .. }
        );

        let mut step = Step {
            result,
            trial: None,
            tally: None,
        };
        if !ended {
            return Ok(step);
        }

        if let Some(new_trial) = session.trial() {
            let trial = self.db.insert_trial(&new_trial)?;
            self.scoreboard.record(trial.outcome);
            step.tally = Some(scheduler::recompute(&self.db, trial.tactic_id)?);
            step.trial = Some(trial);
        }
        Ok(step)
    }

    /// Drain up to `max_count` candidates from the staging queue.
    pub fn import(&self, max_count: usize) -> Result<ImportReport> {
        self.importer()
            .import_from(&self.config.staging, max_count)
    }

    /// Bring the non-mastered pool up to the configured size.
    pub fn top_up(&self) -> Result<Option<ImportReport>> {
        self.importer().top_up(
            &self.config.staging,
            u64::from(self.config.target_pool_size),
            self.config.mastery_threshold,
        )
    }

    fn importer(&self) -> Importer<'_> {
        Importer::new(&self.db, &self.lines, &self.config.player_names)
    }
}
