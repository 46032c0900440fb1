#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use woodpecker_core::{Config, Trainer};

pub const PLAYER: &str = "me";

/// A trainer whose database, move files and staging queue live in a
/// temporary directory.
pub struct Env {
    pub dir: TempDir,
    pub trainer: Trainer,
}

impl Env {
    pub fn new() -> Self {
        Self::with(|_| {})
    }

    pub fn with(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let mut config = Config {
            database: dir.path().join("woodpecker.sqlite"),
            staging: dir.path().join("staging.pgn"),
            player_names: vec![PLAYER.to_string()],
            ..Config::default()
        };
        adjust(&mut config);
        let trainer = Trainer::open(config).expect("open trainer");
        Self { dir, trainer }
    }

    pub fn staging(&self) -> PathBuf {
        self.trainer.config().staging.clone()
    }

    pub fn stage(&self, records: &[String]) {
        fs::write(self.staging(), records.join("\n")).expect("write staging");
    }

    pub fn staged_text(&self) -> String {
        fs::read_to_string(self.staging()).unwrap_or_default()
    }

    /// Import everything currently staged and return the new ids.
    pub fn import_all(&self) -> Vec<i64> {
        self.trainer.import(usize::MAX).expect("import").new_ids
    }
}

/// A PGN record where the user plays white.
pub fn record(site: &str, fen: Option<&str>, moves: &str) -> String {
    let mut text = format!(
        "[Site \"{}\"]\n[White \"{}\"]\n[Black \"opponent\"]\n",
        site, PLAYER
    );
    if let Some(fen) = fen {
        text.push_str(&format!("[FEN \"{}\"]\n[SetUp \"1\"]\n", fen));
    }
    text.push_str(&format!("\n{} *\n", moves));
    text
}

/// Back-rank mate with the white rook starting on `file` (a to e).
pub fn back_rank(site: &str, file: char) -> String {
    let offset = file as usize - 'a' as usize;
    let rank1 = format!(
        "{}R{}K1",
        if offset > 0 { offset.to_string() } else { String::new() },
        5 - offset
    );
    let fen = format!("6k1/5ppp/8/8/8/8/5PPP/{} w - - 0 1", rank1);
    record(site, Some(&fen), &format!("1. R{}8", file))
}
