//! Move sequences stored beside the database, one PGN file per tactic.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::notation::{read_games, Game};

const DIR_NAME: &str = "tactics";
const EXTENSION: &str = "pgn";

#[derive(Debug, Clone)]
pub struct LineStore {
    dir: PathBuf,
}

impl LineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The `tactics/` directory next to the database file.
    pub fn beside(db_path: &Path) -> Self {
        let parent = db_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(parent.join(DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `00000042.pgn` for tactic 42.
    pub fn path_for(&self, tactic_id: i64) -> PathBuf {
        self.dir.join(format!("{:08}.{}", tactic_id, EXTENSION))
    }

    pub fn write(&self, tactic_id: i64, text: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let path = self.path_for(tactic_id);
        fs::write(&path, text).map_err(|e| Error::io(&path, e))
    }

    /// Read the single game stored for a tactic.
    pub fn read(&self, tactic_id: i64) -> Result<Game> {
        let path = self.path_for(tactic_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::MissingLine { tactic_id, path })
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        let mut games = read_games(&text);
        match games.len() {
            1 => Ok(games.remove(0)),
            0 => Err(Error::CorruptLine {
                tactic_id,
                reason: "file holds no game".into(),
            }),
            n => Err(Error::CorruptLine {
                tactic_id,
                reason: format!("file holds {} games, expected one", n),
            }),
        }
    }

    /// Remove a move file left behind by an import that did not commit.
    pub(crate) fn discard(&self, tactic_id: i64) {
        let path = self.path_for(tactic_id);
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("could not remove {}: {}", path.display(), e);
        }
    }
}
