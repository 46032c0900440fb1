//! Playback state machine for one walk through a tactic's solution line.
//!
//! The player submits moves; each correct one is answered with the known
//! reply from the line until the line runs out (solved) or the player
//! deviates (failed). Illegal input leaves everything untouched.

use std::time::Instant;

use chess::{Board, ChessMove};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{NewTrial, PlayerSide};
use crate::notation::{parse_move, SolutionLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    AwaitingPlayerTurn,
    /// Transient: the next move in the line belongs to the opponent.
    AwaitingOpponentAdvance,
    Completed,
    Failed,
}

impl PlaybackState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// What the rendering surface needs to draw the current position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub board: Board,
    pub last_move: Option<ChessMove>,
    pub orientation: PlayerSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    /// Not a legal move in the current position; try again.
    Illegal,
    /// Legal but not the solution move. The session has failed.
    Incorrect {
        played: ChessMove,
        expected: ChessMove,
    },
    /// Right move; the opponent has answered with `reply`.
    Correct { reply: ChessMove },
    /// Right move and the line is exhausted, possibly after a final reply.
    Solved { reply: Option<ChessMove> },
    /// The session is already over.
    Closed,
}

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    tactic_id: i64,
    line: SolutionLine,
    player: PlayerSide,
    board: Board,
    cursor: usize,
    last_move: Option<ChessMove>,
    state: PlaybackState,
    started: Instant,
    trial: Option<NewTrial>,
    retry: bool,
}

impl PlaybackSession {
    pub fn start(tactic_id: i64, line: SolutionLine, player: PlayerSide) -> Result<Self> {
        Self::start_at(tactic_id, line, player, Instant::now())
    }

    /// Begin a session. If the line opens with an opponent move, it is
    /// played before the position is shown.
    pub fn start_at(
        tactic_id: i64,
        line: SolutionLine,
        player: PlayerSide,
        started: Instant,
    ) -> Result<Self> {
        if player_move_count(&line, player) == 0 {
            return Err(Error::CorruptLine {
                tactic_id,
                reason: "solution line has no move for the player".into(),
            });
        }

        Ok(Self::begin(tactic_id, line, player, started, false))
    }

    fn begin(
        tactic_id: i64,
        line: SolutionLine,
        player: PlayerSide,
        started: Instant,
        retry: bool,
    ) -> Self {
        let board = *line.start();
        let mut session = Self {
            tactic_id,
            line,
            player,
            board,
            cursor: 0,
            last_move: None,
            state: PlaybackState::AwaitingPlayerTurn,
            started,
            trial: None,
            retry,
        };

        if session.board.side_to_move() != player.color() {
            session.state = PlaybackState::AwaitingOpponentAdvance;
            session.advance();
            session.state = PlaybackState::AwaitingPlayerTurn;
        }

        session
    }

    /// Play the same tactic again from the start. A retry never yields a
    /// trial, so practice runs do not skew the tactic's difficulty.
    pub fn retry(&self) -> Self {
        self.retry_at(Instant::now())
    }

    pub fn retry_at(&self, started: Instant) -> Self {
        Self::begin(self.tactic_id, self.line.clone(), self.player, started, true)
    }

    pub fn submit(&mut self, input: &str) -> MoveResult {
        self.submit_at(input, Instant::now())
    }

    /// Check one player move against the solution line.
    pub fn submit_at(&mut self, input: &str, now: Instant) -> MoveResult {
        if self.state != PlaybackState::AwaitingPlayerTurn {
            return MoveResult::Closed;
        }

        let played = match parse_move(&self.board, input) {
            Some(mv) => mv,
            None => return MoveResult::Illegal,
        };

        let expected = self.line.moves()[self.cursor];
        if played != expected {
            self.finish(false, now);
            return MoveResult::Incorrect { played, expected };
        }

        self.apply(played);
        if self.cursor == self.line.len() {
            self.finish(true, now);
            return MoveResult::Solved { reply: None };
        }

        self.state = PlaybackState::AwaitingOpponentAdvance;
        let reply = self.advance();
        if self.cursor == self.line.len() {
            self.finish(true, now);
            MoveResult::Solved { reply: Some(reply) }
        } else {
            self.state = PlaybackState::AwaitingPlayerTurn;
            MoveResult::Correct { reply }
        }
    }

    /// Play the opponent's move from the line.
    fn advance(&mut self) -> ChessMove {
        debug_assert_eq!(self.state, PlaybackState::AwaitingOpponentAdvance);
        let reply = self.line.moves()[self.cursor];
        self.apply(reply);
        reply
    }

    fn apply(&mut self, mv: ChessMove) {
        self.board = self.board.make_move_new(mv);
        self.last_move = Some(mv);
        self.cursor += 1;
    }

    fn finish(&mut self, success: bool, now: Instant) {
        let duration = if success {
            let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
            elapsed / self.player_move_count() as f64
        } else {
            0.0
        };

        self.state = if success {
            PlaybackState::Completed
        } else {
            PlaybackState::Failed
        };
        self.trial = Some(NewTrial {
            tactic_id: self.tactic_id,
            outcome: success,
            duration,
        });
    }

    pub fn tactic_id(&self) -> i64 {
        self.tactic_id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn player(&self) -> PlayerSide {
        self.player
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_retry(&self) -> bool {
        self.retry
    }

    /// Moves the player has to find in this line.
    pub fn player_move_count(&self) -> usize {
        player_move_count(&self.line, self.player)
    }

    /// The move the line expects next, if any.
    pub fn expected_move(&self) -> Option<ChessMove> {
        self.line.moves().get(self.cursor).copied()
    }

    pub fn frame(&self) -> Frame {
        Frame {
            board: self.board,
            last_move: self.last_move,
            orientation: self.player,
        }
    }

    /// `Some(true)` once solved, `Some(false)` once failed.
    pub fn outcome(&self) -> Option<bool> {
        match self.state {
            PlaybackState::Completed => Some(true),
            PlaybackState::Failed => Some(false),
            _ => None,
        }
    }

    /// The trial to store, once the session has ended. Always `None` for
    /// retries.
    pub fn trial(&self) -> Option<NewTrial> {
        if self.retry {
            None
        } else {
            self.trial
        }
    }
}

/// Plies in the line played by `player`.
fn player_move_count(line: &SolutionLine, player: PlayerSide) -> usize {
    let n = line.len();
    if line.start().side_to_move() == player.color() {
        n.div_ceil(2)
    } else {
        n / 2
    }
}
