//! Importer: moves candidate games from the staging queue into the pool.
//!
//! The staging file is a flat PGN file drained from the front. Each call
//! takes up to `max_count` records, stores the ones whose starting position
//! is new, and writes the untouched remainder back in its original order.
//! Records that fail validation are taken off the queue too and appended to
//! a `.rejected.pgn` file next to it, so one bad record cannot hold up the
//! rest of the queue.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::lines::LineStore;
use crate::models::{CreateTacticInput, PlayerSide};
use crate::notation::{is_canonical, read_games, write_games, Game, SolutionLine};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Candidates taken off the staging queue, imported or not. Less than
    /// the requested count means the queue ran dry.
    pub examined: usize,
    pub imported: usize,
    /// Catalogue entries of candidates skipped as duplicates.
    pub duplicates: Vec<String>,
    /// Candidates that failed validation and were set aside.
    pub rejected: Vec<Rejection>,
    /// Stored positions that already occur more than once in the pool.
    pub repeated_signatures: usize,
    /// Ids assigned to the imported tactics, in queue order.
    pub new_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub catalogue: String,
    pub reason: String,
}

/// Starting positions already in the pool, the standard initial position
/// excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownPositions {
    pub signatures: HashSet<String>,
    /// How many of `signatures` are stored under more than one tactic.
    pub repeated: usize,
}

struct Candidate<'g> {
    game: &'g Game,
    catalogue: String,
    player_side: PlayerSide,
}

pub struct Importer<'a> {
    db: &'a Database,
    lines: &'a LineStore,
    player_names: &'a [String],
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database, lines: &'a LineStore, player_names: &'a [String]) -> Self {
        Self {
            db,
            lines,
            player_names,
        }
    }

    /// Read every stored move file and collect its starting position.
    /// Positions stored more than once are logged but do not stop the import.
    pub fn known_positions(&self) -> Result<KnownPositions> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for id in self.db.list_tactic_ids()? {
            let game = self.lines.read(id)?;
            let signature = game.signature().map_err(|e| Error::CorruptLine {
                tactic_id: id,
                reason: e.to_string(),
            })?;
            if !is_canonical(&signature) {
                *counts.entry(signature).or_default() += 1;
            }
        }

        let mut repeated = 0;
        for (signature, n) in counts.iter().filter(|(_, n)| **n > 1) {
            tracing::warn!("position stored {} times: {}", n, signature);
            repeated += 1;
        }

        Ok(KnownPositions {
            signatures: counts.into_keys().collect(),
            repeated,
        })
    }

    /// Drain up to `max_count` candidates from `staging` into the pool.
    pub fn import_from(&self, staging: &Path, max_count: usize) -> Result<ImportReport> {
        let KnownPositions {
            signatures: mut known,
            repeated,
        } = self.known_positions()?;

        let text = match fs::read_to_string(staging) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("staging queue {} does not exist", staging.display());
                return Ok(ImportReport {
                    repeated_signatures: repeated,
                    ..ImportReport::default()
                });
            }
            Err(e) => return Err(Error::io(staging, e)),
        };
        let games = read_games(&text);
        let take = max_count.min(games.len());
        let (batch, remainder) = games.split_at(take);

        let mut report = ImportReport {
            examined: batch.len(),
            repeated_signatures: repeated,
            ..ImportReport::default()
        };

        let mut accepted = Vec::new();
        let mut refused = Vec::new();
        for game in batch {
            let catalogue = catalogue_of(game);
            let (signature, player_side) = match self.validate(game) {
                Ok(checked) => checked,
                Err(e) => {
                    tracing::warn!("rejecting {:?}: {}", catalogue, e);
                    report.rejected.push(Rejection {
                        catalogue,
                        reason: e.to_string(),
                    });
                    refused.push(game);
                    continue;
                }
            };

            if !is_canonical(&signature) {
                if known.contains(&signature) {
                    tracing::warn!("skipping duplicate position from {:?}", catalogue);
                    report.duplicates.push(catalogue);
                    continue;
                }
                known.insert(signature);
            }
            accepted.push(Candidate {
                game,
                catalogue,
                player_side,
            });
        }

        report.new_ids = self.store(&accepted)?;
        report.imported = report.new_ids.len();

        set_aside(&rejected_path(staging), &refused)?;
        rewrite_queue(staging, remainder)?;

        tracing::info!(
            examined = report.examined,
            imported = report.imported,
            duplicates = report.duplicates.len(),
            rejected = report.rejected.len(),
            remaining = remainder.len(),
            "import finished"
        );
        Ok(report)
    }

    /// Import enough candidates to bring the non-mastered pool up to
    /// `target`. Does not touch the staging queue when the pool is full.
    pub fn top_up(
        &self,
        staging: &Path,
        target: u64,
        mastery_threshold: u32,
    ) -> Result<Option<ImportReport>> {
        let current = self.db.count_unmastered(mastery_threshold)?;
        if current >= target {
            tracing::info!(current, target, "pool is full");
            return Ok(None);
        }
        let missing = (target - current) as usize;
        tracing::info!(current, target, "topping up {} tactics", missing);
        self.import_from(staging, missing).map(Some)
    }

    /// Starting signature and player side of a playable candidate.
    fn validate(&self, game: &Game) -> Result<(String, PlayerSide)> {
        let signature = game.signature()?;
        SolutionLine::from_game(game)?;
        let player_side = PlayerSide::detect(
            game.header("White").unwrap_or_default(),
            game.header("Black").unwrap_or_default(),
            self.player_names,
        )?;
        Ok((signature, player_side))
    }

    /// Insert the batch and write its move files as one unit.
    fn store(&self, candidates: &[Candidate<'_>]) -> Result<Vec<i64>> {
        let mut written = Vec::new();
        let result = self.db.transaction(|db| {
            for candidate in candidates {
                let id = db.insert_tactic(&CreateTacticInput {
                    catalogue: candidate.catalogue.clone(),
                    player_side: candidate.player_side,
                })?;
                self.lines.write(id, candidate.game.raw())?;
                written.push(id);
            }
            Ok(())
        });

        match result {
            Ok(()) => Ok(written),
            Err(e) => {
                for id in written {
                    self.lines.discard(id);
                }
                Err(e)
            }
        }
    }
}

/// Where records refused by the importer end up: `staging.pgn` becomes
/// `staging.rejected.pgn`.
pub fn rejected_path(staging: &Path) -> PathBuf {
    staging.with_extension("rejected.pgn")
}

fn catalogue_of(game: &Game) -> String {
    game.header("Site")
        .or_else(|| game.header("Event"))
        .unwrap_or_default()
        .to_string()
}

fn set_aside(path: &Path, games: &[&Game]) -> Result<()> {
    if games.is_empty() {
        return Ok(());
    }
    let needs_separator = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    let mut text = String::new();
    if needs_separator {
        text.push('\n');
    }
    text.push_str(&write_games(games.iter().copied()));
    file.write_all(text.as_bytes())
        .map_err(|e| Error::io(path, e))
}

/// Replace the staging file with `remainder` through a temp file in the
/// same directory.
fn rewrite_queue(staging: &Path, remainder: &[Game]) -> Result<()> {
    let dir = staging
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(write_games(remainder).as_bytes())
        .map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(staging)
        .map_err(|e| Error::io(staging, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        db: Database,
        lines: LineStore,
        staging: std::path::PathBuf,
        names: Vec<String>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("woodpecker.sqlite")).unwrap();
        db.migrate().unwrap();
        let lines = LineStore::beside(db.path().unwrap());
        let staging = dir.path().join("staging.pgn");
        Fixture {
            dir,
            db,
            lines,
            staging,
            names: vec!["me".into()],
        }
    }

    fn record(site: &str, fen: Option<&str>, moves: &str) -> String {
        let mut text = format!("[Site \"{}\"]\n[White \"me\"]\n[Black \"them\"]\n", site);
        if let Some(fen) = fen {
            text.push_str(&format!("[FEN \"{}\"]\n[SetUp \"1\"]\n", fen));
        }
        text.push_str(&format!("\n{} *\n", moves));
        text
    }

    #[test]
    fn missing_staging_file_imports_nothing() {
        let f = fixture();
        let importer = Importer::new(&f.db, &f.lines, &f.names);
        let report = importer.import_from(&f.staging, 5).unwrap();
        assert_eq!(report, ImportReport::default());
        assert!(!f.staging.exists());
    }

    #[test]
    fn writes_move_file_per_tactic() {
        let f = fixture();
        fs::write(&f.staging, record("a", None, "1. e4 e5")).unwrap();

        let importer = Importer::new(&f.db, &f.lines, &f.names);
        let report = importer.import_from(&f.staging, 5).unwrap();

        assert_eq!(report.imported, 1);
        let id = report.new_ids[0];
        assert!(f.lines.path_for(id).exists());
        let stored = f.db.get_tactic(id).unwrap().unwrap();
        assert_eq!(stored.catalogue, "a");
        assert_eq!(stored.player_side, PlayerSide::White);
    }

    #[test]
    fn unmatched_players_are_set_aside() {
        let f = fixture();
        let text = format!(
            "[Site \"b\"]\n[White \"x\"]\n[Black \"y\"]\n\n1. d4 *\n\n{}",
            record("a", None, "1. e4")
        );
        fs::write(&f.staging, &text).unwrap();

        let importer = Importer::new(&f.db, &f.lines, &f.names);
        let report = importer.import_from(&f.staging, 5).unwrap();

        assert_eq!(report.examined, 2);
        assert_eq!(report.imported, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].catalogue, "b");
        assert!(report.rejected[0].reason.contains("which side"));
        assert_eq!(fs::read_to_string(&f.staging).unwrap(), "");
        let aside = fs::read_to_string(rejected_path(&f.staging)).unwrap();
        assert!(aside.contains("[White \"x\"]"));
    }

    #[test]
    fn rejected_records_accumulate() {
        let f = fixture();
        let importer = Importer::new(&f.db, &f.lines, &f.names);
        for site in ["bad-1", "bad-2"] {
            fs::write(&f.staging, record(site, None, "1. e5")).unwrap();
            importer.import_from(&f.staging, 1).unwrap();
        }

        let aside = read_games(&fs::read_to_string(rejected_path(&f.staging)).unwrap());
        assert_eq!(aside.len(), 2);
        assert_eq!(aside[1].header("Site"), Some("bad-2"));
    }

    #[test]
    fn duplicates_within_one_batch_are_skipped() {
        let f = fixture();
        let fen = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1";
        let text = format!(
            "{}\n{}",
            record("a", Some(fen), "1. Ra8"),
            record("b", Some(fen), "1. Ra8")
        );
        fs::write(&f.staging, text).unwrap();

        let importer = Importer::new(&f.db, &f.lines, &f.names);
        let report = importer.import_from(&f.staging, 5).unwrap();

        assert_eq!(report.examined, 2);
        assert_eq!(report.imported, 1);
        assert_eq!(report.duplicates, vec!["b".to_string()]);
    }

    #[test]
    fn unreadable_main_line_is_rejected() {
        let f = fixture();
        fs::write(&f.staging, record("bad", None, "1. e5")).unwrap();

        let importer = Importer::new(&f.db, &f.lines, &f.names);
        let report = importer.import_from(&f.staging, 1).unwrap();

        assert_eq!(report.imported, 0);
        assert_eq!(report.rejected[0].catalogue, "bad");
        assert!(report.rejected[0].reason.contains("not legal"));
        assert_eq!(f.db.count_tactics().unwrap(), 0);
    }

    #[test]
    fn staging_rewrite_leaves_no_temp_files() {
        let f = fixture();
        let text = format!("{}\n{}", record("a", None, "1. e4"), record("b", None, "1. d4"));
        fs::write(&f.staging, text).unwrap();

        let importer = Importer::new(&f.db, &f.lines, &f.names);
        importer.import_from(&f.staging, 1).unwrap();

        let staged = read_games(&fs::read_to_string(&f.staging).unwrap());
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].header("Site"), Some("b"));
        let leftovers: Vec<_> = fs::read_dir(f.dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with("woodpecker.sqlite"))
            .filter(|name| name != "staging.pgn" && name != "tactics")
            .collect();
        assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);
    }
}
