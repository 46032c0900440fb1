use serde::{Deserialize, Serialize};

use super::PlayerSide;

/// A stored position with a known correct continuation.
///
/// The move sequence itself lives in the line store, addressed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tactic {
    pub id: i64,
    pub catalogue: String,
    pub player_side: PlayerSide,
    #[serde(flatten)]
    pub scheduling: Scheduling,
}

/// Fields derived from a tactic's trial history.
///
/// Only the scorer writes these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Scheduling {
    /// `n_success / n_attempts`, or 0 before the first attempt.
    pub difficulty: f64,
    /// `None` until the tactic has been attempted.
    pub days_since_last_trial: Option<f64>,
    pub n_success: u32,
    pub n_attempts: u32,
}

impl Scheduling {
    pub fn is_mastered(&self, mastery_threshold: u32) -> bool {
        self.n_success >= mastery_threshold
    }

    pub fn is_cooling_down(&self, cooldown_days: f64) -> bool {
        match self.days_since_last_trial {
            Some(days) => days <= cooldown_days,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTacticInput {
    pub catalogue: String,
    pub player_side: PlayerSide,
}

/// One slot of the selector's priority queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: i64,
    pub n_success: u32,
    pub n_attempts: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolStats {
    /// Tactics not yet mastered.
    pub current: u64,
    pub total: u64,
}
