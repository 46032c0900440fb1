//! Core library for Woodpecker.
//!
//! Spaced-repetition training on chess tactics: a SQLite pool of tactics and
//! their trial history, a scheduler that serves the weakest tactics first, an
//! importer that tops the pool up from a staging PGN file, and a playback
//! state machine that checks the user's moves against the stored line.
//!
//! # Usage
//!
//! ```no_run
//! use woodpecker_core::{Config, Trainer};
//!
//! let mut trainer = Trainer::open(Config::default())?;
//! trainer.top_up()?;
//!
//! if let Some(mut session) = trainer.next_session()? {
//!     let step = trainer.submit(&mut session, "Qxf7+")?;
//!     println!("{:?}", step.result);
//! }
//! # Ok::<(), woodpecker_core::Error>(())
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod importer;
pub mod lines;
pub mod models;
pub mod notation;
pub mod playback;
pub mod scheduler;
pub mod trainer;

// Re-export commonly used types at crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use importer::{ImportReport, Importer, Rejection};
pub use lines::LineStore;
pub use playback::{Frame, MoveResult, PlaybackSession, PlaybackState};
pub use scheduler::Selector;
pub use trainer::{Scoreboard, Step, Trainer};
