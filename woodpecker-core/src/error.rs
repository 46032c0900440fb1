use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("notation error: {0}")]
    Notation(String),

    #[error("move file for tactic #{tactic_id} is missing: {path}")]
    MissingLine { tactic_id: i64, path: PathBuf },

    #[error("move file for tactic #{tactic_id} is corrupt: {reason}")]
    CorruptLine { tactic_id: i64, reason: String },

    /// Neither or both players in the game headers match the configured names.
    #[error("cannot tell which side is the player (White: {white:?}, Black: {black:?})")]
    AmbiguousSide { white: String, black: String },

    #[error("tactic #{0} not found")]
    TacticNotFound(i64),

    #[error("bad timestamp {0:?}")]
    Timestamp(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
