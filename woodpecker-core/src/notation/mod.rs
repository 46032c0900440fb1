//! Game-notation codec.
//!
//! Reads PGN records, resolves SAN tokens into `chess::ChessMove`s and gives
//! each record a position signature for duplicate detection.

mod pgn;

use std::str::FromStr;

use chess::{Board, ChessMove, File, MoveGen, Piece, Rank};

use crate::error::{Error, Result};

pub use pgn::{read_games, write_games};

/// One game record as read from a PGN file.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    headers: Vec<(String, String)>,
    moves: Vec<String>,
    raw: String,
}

impl Game {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Main line in SAN, check and annotation marks removed.
    pub fn san_moves(&self) -> &[String] {
        &self.moves
    }

    /// The record exactly as it appeared in the source file.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Position before the first move: the `FEN` header, or the standard
    /// starting position when there is none.
    pub fn starting_board(&self) -> Result<Board> {
        match self.header("FEN") {
            Some(fen) => Board::from_str(fen)
                .map_err(|e| Error::Notation(format!("bad FEN {:?}: {}", fen, e))),
            None => Ok(Board::default()),
        }
    }

    /// FEN of the starting position.
    pub fn signature(&self) -> Result<String> {
        Ok(self.starting_board()?.to_string())
    }
}

/// FEN of the standard starting position.
pub fn canonical_signature() -> String {
    Board::default().to_string()
}

pub fn is_canonical(signature: &str) -> bool {
    signature == canonical_signature()
}

/// A game's main line resolved into moves from its starting position.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionLine {
    start: Board,
    moves: Vec<ChessMove>,
}

impl SolutionLine {
    pub fn new(start: Board, moves: Vec<ChessMove>) -> Self {
        Self { start, moves }
    }

    pub fn from_game(game: &Game) -> Result<Self> {
        let start = game.starting_board()?;
        let mut board = start;
        let mut moves = Vec::with_capacity(game.san_moves().len());

        for (ply, san) in game.san_moves().iter().enumerate() {
            let mv = resolve_san(&board, san).ok_or_else(|| {
                Error::Notation(format!("move {:?} at ply {} is not legal", san, ply))
            })?;
            board = board.make_move_new(mv);
            moves.push(mv);
        }

        Ok(Self { start, moves })
    }

    pub fn start(&self) -> &Board {
        &self.start
    }

    pub fn moves(&self) -> &[ChessMove] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Parse player input against the live board: SAN first, then UCI
/// coordinates (`e2e4`, `e7e8q`). `None` unless the move is legal here.
pub fn parse_move(board: &Board, input: &str) -> Option<ChessMove> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    resolve_san(board, &pgn::normalize_san(input)).or_else(|| resolve_uci(board, input))
}

fn resolve_uci(board: &Board, input: &str) -> Option<ChessMove> {
    let wanted = input.to_ascii_lowercase();
    MoveGen::new_legal(board).find(|mv| mv.to_string() == wanted)
}

/// Match a normalized SAN token against the legal moves of `board`.
/// Ambiguous or unmatched tokens resolve to `None`.
fn resolve_san(board: &Board, san: &str) -> Option<ChessMove> {
    if san == "O-O" || san == "O-O-O" {
        let dest_file = if san == "O-O" { File::G } else { File::C };
        return unique(MoveGen::new_legal(board).filter(|mv| {
            board.piece_on(mv.get_source()) == Some(Piece::King)
                && mv.get_source().get_file() == File::E
                && mv.get_dest().get_file() == dest_file
        }));
    }

    let (piece, rest) = match san.chars().next()? {
        'N' => (Piece::Knight, &san[1..]),
        'B' => (Piece::Bishop, &san[1..]),
        'R' => (Piece::Rook, &san[1..]),
        'Q' => (Piece::Queen, &san[1..]),
        'K' => (Piece::King, &san[1..]),
        _ => (Piece::Pawn, san),
    };

    let (rest, promotion) = split_promotion(rest, piece)?;
    let rest = rest.replace(|c: char| matches!(c, 'x' | ':' | '-'), "");
    if rest.len() < 2 || !rest.is_ascii() {
        return None;
    }

    let (qualifier, dest) = rest.split_at(rest.len() - 2);
    let mut dest_chars = dest.chars();
    let dest_file = file_from_char(dest_chars.next()?)?;
    let dest_rank = rank_from_char(dest_chars.next()?)?;

    let mut from_file = None;
    let mut from_rank = None;
    for c in qualifier.chars() {
        if let Some(file) = file_from_char(c) {
            from_file = Some(file);
        } else if let Some(rank) = rank_from_char(c) {
            from_rank = Some(rank);
        } else {
            return None;
        }
    }

    unique(MoveGen::new_legal(board).filter(|mv| {
        let source = mv.get_source();
        board.piece_on(source) == Some(piece)
            && mv.get_dest().get_file() == dest_file
            && mv.get_dest().get_rank() == dest_rank
            && mv.get_promotion() == promotion
            && from_file.map_or(true, |f| source.get_file() == f)
            && from_rank.map_or(true, |r| source.get_rank() == r)
    }))
}

/// `e8=Q` and `e8Q` both promote to a queen.
fn split_promotion(rest: &str, piece: Piece) -> Option<(String, Option<Piece>)> {
    if piece != Piece::Pawn {
        return Some((rest.to_string(), None));
    }
    let body = rest.trim_end_matches(|c: char| "NBRQ".contains(c));
    let suffix = &rest[body.len()..];
    let promotion = match suffix {
        "" => None,
        "N" => Some(Piece::Knight),
        "B" => Some(Piece::Bishop),
        "R" => Some(Piece::Rook),
        "Q" => Some(Piece::Queen),
        _ => return None,
    };
    Some((body.trim_end_matches('=').to_string(), promotion))
}

fn file_from_char(c: char) -> Option<File> {
    match c {
        'a'..='h' => Some(File::from_index(c as usize - 'a' as usize)),
        _ => None,
    }
}

fn rank_from_char(c: char) -> Option<Rank> {
    match c {
        '1'..='8' => Some(Rank::from_index(c as usize - '1' as usize)),
        _ => None,
    }
}

fn unique(mut moves: impl Iterator<Item = ChessMove>) -> Option<ChessMove> {
    let first = moves.next()?;
    match moves.next() {
        Some(_) => None,
        None => Some(first),
    }
}
