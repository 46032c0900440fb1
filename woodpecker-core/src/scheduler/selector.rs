//! Tactic selector: filters and orders the pool into a priority queue.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::models::{QueueEntry, Scheduling, Tactic};

use super::scorer::refresh_all_at;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selector {
    pub mastery_threshold: u32,
    pub cooldown_days: f64,
}

impl Selector {
    pub fn new(mastery_threshold: u32, cooldown_days: f64) -> Self {
        Self {
            mastery_threshold,
            cooldown_days,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.mastery_threshold, config.cooldown_days)
    }

    pub fn select(&self, db: &Database) -> Result<Vec<QueueEntry>> {
        self.select_at(db, Utc::now())
    }

    /// Refresh every tactic's scheduling fields, then return the eligible
    /// ones in serving order. An empty queue means nothing is due.
    pub fn select_at(&self, db: &Database, now: DateTime<Utc>) -> Result<Vec<QueueEntry>> {
        refresh_all_at(db, now)?;
        let queue = self.rank(db.list_tactics()?);
        tracing::debug!(eligible = queue.len(), "selected");
        Ok(queue)
    }

    /// Not mastered and not cooling down. Never-attempted tactics are always
    /// past their cooldown.
    pub fn is_eligible(&self, scheduling: &Scheduling) -> bool {
        !scheduling.is_mastered(self.mastery_threshold)
            && !scheduling.is_cooling_down(self.cooldown_days)
    }

    /// Filter and order already-refreshed tactics.
    pub fn rank(&self, tactics: Vec<Tactic>) -> Vec<QueueEntry> {
        let mut eligible: Vec<Tactic> = tactics
            .into_iter()
            .filter(|t| self.is_eligible(&t.scheduling))
            .collect();
        eligible.sort_by(priority);
        eligible
            .into_iter()
            .map(|t| QueueEntry {
                id: t.id,
                n_success: t.scheduling.n_success,
                n_attempts: t.scheduling.n_attempts,
            })
            .collect()
    }
}

/// Weakest first: lowest success ratio, then fewest successes, then most
/// attempts. Ties fall back to the id so the order is reproducible.
fn priority(a: &Tactic, b: &Tactic) -> Ordering {
    let (x, y) = (&a.scheduling, &b.scheduling);
    x.difficulty
        .total_cmp(&y.difficulty)
        .then(x.n_success.cmp(&y.n_success))
        .then(y.n_attempts.cmp(&x.n_attempts))
        .then(a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayerSide;

    fn tactic(id: i64, n_success: u32, n_attempts: u32, days: Option<f64>) -> Tactic {
        let difficulty = if n_attempts == 0 {
            0.0
        } else {
            f64::from(n_success) / f64::from(n_attempts)
        };
        Tactic {
            id,
            catalogue: String::new(),
            player_side: PlayerSide::White,
            scheduling: Scheduling {
                difficulty,
                days_since_last_trial: days,
                n_success,
                n_attempts,
            },
        }
    }

    fn ids(queue: &[QueueEntry]) -> Vec<i64> {
        queue.iter().map(|e| e.id).collect()
    }

    #[test]
    fn mastered_tactics_are_retired() {
        let selector = Selector::new(3, 1.0);
        let queue = selector.rank(vec![
            tactic(1, 3, 3, Some(5.0)),
            tactic(2, 2, 3, Some(5.0)),
        ]);
        assert_eq!(ids(&queue), vec![2]);
    }

    #[test]
    fn cooldown_boundary_is_exclusive() {
        let selector = Selector::new(10, 1.0);
        let queue = selector.rank(vec![
            tactic(1, 0, 1, Some(1.0)),
            tactic(2, 0, 1, Some(1.01)),
            tactic(3, 0, 0, None),
            tactic(4, 0, 1, Some(0.2)),
        ]);
        assert_eq!(ids(&queue), vec![2, 3]);
    }

    #[test]
    fn orders_by_difficulty_then_successes_then_attempts() {
        let selector = Selector::new(10, 0.5);
        let queue = selector.rank(vec![
            tactic(1, 1, 1, Some(2.0)), // 1.0
            tactic(2, 1, 2, Some(2.0)), // 0.5, 1 success
            tactic(3, 2, 4, Some(2.0)), // 0.5, 2 successes
            tactic(4, 0, 1, Some(2.0)), // 0.0, 1 attempt
            tactic(5, 0, 3, Some(2.0)), // 0.0, 3 attempts
            tactic(6, 0, 0, None),      // 0.0, 0 attempts
        ]);
        assert_eq!(ids(&queue), vec![5, 4, 6, 2, 3, 1]);
    }

    #[test]
    fn full_ties_break_on_id() {
        let selector = Selector::new(10, 0.5);
        let queue = selector.rank(vec![
            tactic(9, 0, 0, None),
            tactic(2, 0, 0, None),
            tactic(5, 0, 0, None),
        ]);
        assert_eq!(ids(&queue), vec![2, 5, 9]);
    }

    #[test]
    fn empty_pool_gives_empty_queue() {
        assert!(Selector::new(10, 1.0).rank(Vec::new()).is_empty());
    }
}
