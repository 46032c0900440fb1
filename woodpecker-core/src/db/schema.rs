pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tactics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    catalogue TEXT NOT NULL DEFAULT '',
    player_side TEXT NOT NULL CHECK (player_side IN ('white', 'black')),
    difficulty REAL NOT NULL DEFAULT 0,
    days_since_last_trial REAL,
    n_success INTEGER NOT NULL DEFAULT 0 CHECK (n_success >= 0),
    n_attempts INTEGER NOT NULL DEFAULT 0 CHECK (n_attempts >= n_success)
);

CREATE TABLE IF NOT EXISTS trials (
    id INTEGER PRIMARY KEY,
    tactic_id INTEGER NOT NULL REFERENCES tactics(id),
    timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    outcome INTEGER NOT NULL CHECK (outcome IN (0, 1)),
    duration REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_trials_tactic ON trials(tactic_id, timestamp);
"#;
