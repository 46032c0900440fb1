//! Interactive training loop over a line-based terminal.

use std::io::{BufRead, Write};

use anyhow::Result;
use woodpecker_core::{MoveResult, PlaybackSession, Step, Trainer};

use crate::render::{Surface, TextBoard};

enum Command {
    Next,
    Retry,
    Quit,
    Move(String),
}

fn parse_command(line: &str) -> Command {
    match line.trim() {
        "n" | "next" => Command::Next,
        "r" | "retry" => Command::Retry,
        "q" | "quit" | "exit" => Command::Quit,
        other => Command::Move(other.to_string()),
    }
}

/// Top the pool up, then serve tactics until the user quits, input ends or
/// nothing is due. A failed top-up is logged and the existing pool served.
pub fn run<R: BufRead, W: Write>(trainer: &mut Trainer, input: R, out: W) -> Result<()> {
    let mut board = TextBoard::new(out);
    let mut lines = input.lines();

    if let Err(e) = trainer.top_up() {
        tracing::warn!("could not top up the pool: {}", e);
    }

    let stats = trainer.stats()?;
    writeln!(board.out_mut(), "Pool: {}/{}", stats.current, stats.total)?;

    let mut session = match trainer.next_session()? {
        Some(session) => session,
        None => {
            writeln!(board.out_mut(), "Nothing to practice.")?;
            return Ok(());
        }
    };
    announce(&mut board, &session)?;

    loop {
        write!(board.out_mut(), "Your move: ")?;
        board.out_mut().flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            None => return Ok(()),
        };

        match parse_command(&line) {
            Command::Quit => return Ok(()),
            Command::Next => {
                session = match next_other(trainer, session.tactic_id())? {
                    Some(next) => next,
                    None => {
                        writeln!(board.out_mut(), "Nothing left to practice.")?;
                        return Ok(());
                    }
                };
                announce(&mut board, &session)?;
            }
            Command::Retry if !session.state().is_terminal() => {
                writeln!(board.out_mut(), "Finish this tactic before retrying it.")?;
            }
            Command::Retry => {
                session = session.retry();
                writeln!(board.out_mut(), "Retry (not recorded).")?;
                board.draw(&session.frame())?;
            }
            Command::Move(text) if text.is_empty() => {}
            Command::Move(text) => {
                let step = trainer.submit(&mut session, &text)?;
                report(&mut board, trainer, &session, &text, &step)?;
            }
        }
    }
}

/// The highest-priority tactic other than the one just shown, falling back
/// to it when it is the only one due.
fn next_other(trainer: &Trainer, current: i64) -> Result<Option<PlaybackSession>> {
    let queue = trainer.queue()?;
    let pick = queue
        .iter()
        .find(|entry| entry.id != current)
        .or_else(|| queue.first());
    match pick {
        Some(entry) => Ok(Some(trainer.load_session(entry.id)?)),
        None => Ok(None),
    }
}

fn announce<W: Write>(board: &mut TextBoard<W>, session: &PlaybackSession) -> Result<()> {
    writeln!(
        board.out_mut(),
        "\nTactic #{} ({} to play)",
        session.tactic_id(),
        session.player().as_str()
    )?;
    board.draw(&session.frame())?;
    Ok(())
}

fn report<W: Write>(
    board: &mut TextBoard<W>,
    trainer: &Trainer,
    session: &PlaybackSession,
    text: &str,
    step: &Step,
) -> Result<()> {
    match step.result {
        MoveResult::Illegal => {
            writeln!(board.out_mut(), "Illegal move ({})", text)?;
            return Ok(());
        }
        MoveResult::Closed => {
            writeln!(board.out_mut(), "Finished: type next, retry or quit")?;
            return Ok(());
        }
        MoveResult::Incorrect { expected, .. } => {
            writeln!(board.out_mut(), "Incorrect ({}), the move was {}", text, expected)?;
        }
        MoveResult::Correct { reply } => {
            writeln!(board.out_mut(), "Correct, opponent plays {}", reply)?;
            board.draw(&session.frame())?;
        }
        MoveResult::Solved { .. } => {
            writeln!(board.out_mut(), "Solved!")?;
            board.draw(&session.frame())?;
        }
    }

    if let Some(tally) = step.tally {
        let score = trainer.scoreboard();
        writeln!(
            board.out_mut(),
            "Tactic #{}: {}/{}  Session: {}/{} {}",
            session.tactic_id(),
            tally.n_success,
            tally.n_attempts,
            score.successes,
            score.attempts,
            score.stream
        )?;
    }
    writeln!(board.out_mut(), "Type next, retry or quit")?;
    Ok(())
}
