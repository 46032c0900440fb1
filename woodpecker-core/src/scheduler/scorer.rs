//! Difficulty scorer: derives a tactic's scheduling fields from its trials.

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Scheduling, Trial};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Derive scheduling fields from a trial history sorted oldest first.
pub fn score(trials: &[Trial], now: DateTime<Utc>) -> Scheduling {
    let n_attempts = trials.len() as u32;
    let n_success = trials.iter().filter(|t| t.outcome).count() as u32;
    let difficulty = if n_attempts == 0 {
        0.0
    } else {
        f64::from(n_success) / f64::from(n_attempts)
    };
    let days_since_last_trial = trials
        .iter()
        .map(|t| t.timestamp)
        .max()
        .map(|last| days_between(last, now));

    Scheduling {
        difficulty,
        days_since_last_trial,
        n_success,
        n_attempts,
    }
}

/// Clamped at zero so a clock running behind the store never yields a
/// negative recency.
fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let seconds = (later - earlier).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).max(0.0)
}

pub fn recompute(db: &Database, tactic_id: i64) -> Result<Scheduling> {
    recompute_at(db, tactic_id, Utc::now())
}

/// Recompute one tactic and write the result back, atomically.
pub fn recompute_at(db: &Database, tactic_id: i64, now: DateTime<Utc>) -> Result<Scheduling> {
    db.transaction(|db| {
        let trials = db.trials_for(tactic_id)?;
        let scheduling = score(&trials, now);
        if !db.update_scheduling(tactic_id, &scheduling)? {
            return Err(Error::TacticNotFound(tactic_id));
        }
        tracing::debug!(
            tactic_id,
            n_attempts = scheduling.n_attempts,
            n_success = scheduling.n_success,
            difficulty = scheduling.difficulty,
            "recomputed"
        );
        Ok(scheduling)
    })
}

/// Recompute every tactic in the pool. Returns how many were refreshed.
pub fn refresh_all_at(db: &Database, now: DateTime<Utc>) -> Result<usize> {
    let ids = db.list_tactic_ids()?;
    for &id in &ids {
        recompute_at(db, id, now)?;
    }
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn trial(id: i64, outcome: bool, duration: f64, at: DateTime<Utc>) -> Trial {
        Trial {
            id,
            tactic_id: 1,
            timestamp: at,
            outcome,
            duration,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn no_trials_means_unset_recency() {
        let s = score(&[], t0());
        assert_eq!(s, Scheduling::default());
        assert_eq!(s.days_since_last_trial, None);
    }

    #[test]
    fn ratio_of_successes() {
        let trials = [
            trial(1, false, 0.0, t0()),
            trial(2, true, 8.0, t0() + Duration::hours(1)),
            trial(3, true, 10.0, t0() + Duration::hours(2)),
        ];
        let s = score(&trials, t0() + Duration::hours(2));
        assert_eq!(s.n_attempts, 3);
        assert_eq!(s.n_success, 2);
        assert!((s.difficulty - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn recency_is_measured_from_latest_trial() {
        let trials = [
            trial(1, true, 3.0, t0()),
            trial(2, false, 0.0, t0() + Duration::days(1)),
        ];
        let s = score(&trials, t0() + Duration::days(3));
        assert_eq!(s.days_since_last_trial, Some(2.0));
    }

    #[test]
    fn recency_never_negative() {
        let trials = [trial(1, true, 3.0, t0())];
        let s = score(&trials, t0() - Duration::hours(5));
        assert_eq!(s.days_since_last_trial, Some(0.0));
    }
}
