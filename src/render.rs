//! Text rendering surface.
//!
//! Draws a [`Frame`] as an 8x8 grid seen from the player's side, with the
//! squares of the last move in brackets.

use std::io::{self, Write};

use chess::{Color, File, Piece, Rank, Square};
use woodpecker_core::models::PlayerSide;
use woodpecker_core::Frame;

/// Anything that can be told to draw a position.
pub trait Surface {
    fn draw(&mut self, frame: &Frame) -> io::Result<()>;
}

pub struct TextBoard<W: Write> {
    out: W,
}

impl<W: Write> TextBoard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn out_mut(&mut self) -> &mut W {
        &mut self.out
    }
}

impl<W: Write> Surface for TextBoard<W> {
    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        write!(self.out, "{}", render(frame))
    }
}

pub fn render(frame: &Frame) -> String {
    let (ranks, files): (Vec<usize>, Vec<usize>) = match frame.orientation {
        PlayerSide::White => ((0..8).rev().collect(), (0..8).collect()),
        PlayerSide::Black => ((0..8).collect(), (0..8).rev().collect()),
    };
    let highlighted = |sq: Square| {
        frame
            .last_move
            .is_some_and(|mv| mv.get_source() == sq || mv.get_dest() == sq)
    };

    let mut text = String::new();
    for &r in &ranks {
        text.push_str(&format!("{} ", r + 1));
        for &f in &files {
            let sq = Square::make_square(Rank::from_index(r), File::from_index(f));
            let glyph = glyph(frame, sq);
            if highlighted(sq) {
                text.push_str(&format!("[{}]", glyph));
            } else {
                text.push_str(&format!(" {} ", glyph));
            }
        }
        text.push('\n');
    }

    text.push_str("  ");
    for &f in &files {
        text.push_str(&format!(" {} ", (b'a' + f as u8) as char));
    }
    text.push('\n');

    let to_move = match frame.board.side_to_move() {
        Color::White => "White",
        Color::Black => "Black",
    };
    text.push_str(&format!("{} to move\n", to_move));
    text
}

fn glyph(frame: &Frame, sq: Square) -> char {
    let piece = match frame.board.piece_on(sq) {
        Some(piece) => piece,
        None => return '.',
    };
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    match frame.board.color_on(sq) {
        Some(Color::White) => c.to_ascii_uppercase(),
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{Board, ChessMove};

    fn first_line(text: &str) -> &str {
        text.lines().next().unwrap()
    }

    #[test]
    fn white_sees_black_pieces_on_top() {
        let frame = Frame {
            board: Board::default(),
            last_move: None,
            orientation: PlayerSide::White,
        };
        let text = render(&frame);
        assert_eq!(first_line(&text), "8  r  n  b  q  k  b  n  r ");
        assert!(text.contains("   a  b  c  d  e  f  g  h \n"));
        assert!(text.ends_with("White to move\n"));
    }

    #[test]
    fn black_sees_the_board_flipped() {
        let frame = Frame {
            board: Board::default(),
            last_move: None,
            orientation: PlayerSide::Black,
        };
        let text = render(&frame);
        assert_eq!(first_line(&text), "1  R  N  B  K  Q  B  N  R ");
        assert!(text.contains("   h  g  f  e  d  c  b  a \n"));
    }

    #[test]
    fn last_move_is_bracketed() {
        let mv = ChessMove::new(Square::E2, Square::E4, None);
        let frame = Frame {
            board: Board::default().make_move_new(mv),
            last_move: Some(mv),
            orientation: PlayerSide::White,
        };
        let text = render(&frame);
        assert!(text.contains("[P]"));
        assert!(text.contains("[.]"));
        assert!(text.ends_with("Black to move\n"));
    }
}
