//! Minimal PGN record reader.
//!
//! Splits a flat file into game records and reduces each record's movetext to
//! its main line of SAN tokens. Comments, variations, NAGs, move numbers and
//! result markers are dropped.

use super::Game;

/// Split `text` into game records, in file order.
pub fn read_games(text: &str) -> Vec<Game> {
    let mut games = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    let mut seen_movetext = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && seen_movetext {
            if let Some(game) = parse_record(&lines) {
                games.push(game);
            }
            lines.clear();
            seen_movetext = false;
        }
        if !trimmed.is_empty() && !trimmed.starts_with('[') && !trimmed.starts_with('%') {
            seen_movetext = true;
        }
        lines.push(line);
    }
    if let Some(game) = parse_record(&lines) {
        games.push(game);
    }

    games
}

/// Write records back out, separated by blank lines.
pub fn write_games<'a>(games: impl IntoIterator<Item = &'a Game>) -> String {
    games
        .into_iter()
        .map(|game| game.raw())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_record(lines: &[&str]) -> Option<Game> {
    let raw = lines.join("\n").trim().to_string();
    if raw.is_empty() {
        return None;
    }

    let mut headers = Vec::new();
    let mut movetext = String::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if let Some(tag) = parse_tag(trimmed) {
                headers.push(tag);
            }
        } else if !trimmed.starts_with('%') {
            movetext.push_str(line);
            movetext.push('\n');
        }
    }

    Some(Game {
        headers,
        moves: san_tokens(&movetext),
        raw: format!("{}\n", raw),
    })
}

/// `[Key "Value"]`
fn parse_tag(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (key, rest) = inner.split_once(char::is_whitespace)?;
    let value = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some((
        key.to_string(),
        value.replace("\\\"", "\"").replace("\\\\", "\\"),
    ))
}

fn san_tokens(movetext: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(movetext.len());
    let mut chars = movetext.chars().peekable();
    let mut variation_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                }
                cleaned.push(' ');
            }
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                cleaned.push(' ');
            }
            '(' => {
                variation_depth += 1;
                cleaned.push(' ');
            }
            ')' => {
                variation_depth = variation_depth.saturating_sub(1);
                cleaned.push(' ');
            }
            '$' => {
                while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    chars.next();
                }
                cleaned.push(' ');
            }
            _ if variation_depth > 0 => {}
            _ => cleaned.push(c),
        }
    }

    cleaned
        .split_whitespace()
        .filter_map(|token| {
            if is_result(token) {
                return None;
            }
            let token = strip_move_number(token);
            if token.is_empty() || is_result(token) || token == "e.p." {
                None
            } else {
                Some(normalize_san(token))
            }
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// `12.` / `12...` prefixes. Leaves `0-0` alone.
fn strip_move_number(token: &str) -> &str {
    let rest = token.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() < token.len() && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else {
        token
    }
}

fn is_result(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*")
}

/// Strip check and annotation suffixes; spell castling with letters.
pub(crate) fn normalize_san(token: &str) -> String {
    let token = token
        .trim()
        .trim_end_matches(|c: char| matches!(c, '+' | '#' | '!' | '?'));
    match token {
        "0-0" => "O-O".to_string(),
        "0-0-0" => "O-O-O".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GAMES: &str = r#"[Event "Casual"]
[Site "https://lichess.org/abc"]
[White "gio"]
[Black "Magnus"]

1. e4 e5 2. Nf3 {a comment} Nc6 (2... d6 3. d4) 3. Bb5 $1 a6 1-0

[Event "Puzzle"]
[Site "https://lichess.org/def"]
[White "Hikaru"]
[Black "gio"]
[FEN "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1"]
[SetUp "1"]

1. Ra8# 1-0
"#;

    #[test]
    fn splits_records() {
        let games = read_games(TWO_GAMES);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].header("Site"), Some("https://lichess.org/abc"));
        assert_eq!(games[1].header("Black"), Some("gio"));
    }

    #[test]
    fn keeps_only_the_main_line() {
        let games = read_games(TWO_GAMES);
        assert_eq!(games[0].san_moves(), ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
        assert_eq!(games[1].san_moves(), ["Ra8"]);
    }

    #[test]
    fn black_move_numbers_and_castling() {
        let games = read_games("1... Kh8 2. 0-0 O-O-O+ *\n");
        assert_eq!(games[0].san_moves(), ["Kh8", "O-O", "O-O-O"]);
    }

    #[test]
    fn raw_text_survives_rewrite() {
        let games = read_games(TWO_GAMES);
        let rewritten = write_games(&games[1..]);
        let again = read_games(&rewritten);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].raw(), games[1].raw());
    }

    #[test]
    fn semicolon_comment_runs_to_end_of_line() {
        let games = read_games("1. e4 ; best by test\ne5 *\n");
        assert_eq!(games[0].san_moves(), ["e4", "e5"]);
    }

    #[test]
    fn empty_input_has_no_games() {
        assert!(read_games("\n\n  \n").is_empty());
    }
}
