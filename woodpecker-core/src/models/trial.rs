use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded attempt at a tactic. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trial {
    pub id: i64,
    pub tactic_id: i64,
    /// Assigned by the store on insert.
    pub timestamp: DateTime<Utc>,
    pub outcome: bool,
    /// Average seconds per player move; 0 for a failed attempt.
    pub duration: f64,
}

/// A finished attempt waiting to be stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NewTrial {
    pub tactic_id: i64,
    pub outcome: bool,
    pub duration: f64,
}
