//! Refresh-then-select scheduling.
//!
//! Every selection first recomputes the derived fields of every tactic from
//! its trial history, then filters and orders the pool. The full scan keeps
//! the cached fields from ever going stale; it is linear in the number of
//! trials, which is fine for a personal pool.

pub mod scorer;
pub mod selector;

pub use scorer::{recompute, recompute_at, refresh_all_at, score};
pub use selector::Selector;
