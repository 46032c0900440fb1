use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The side whose moves the user must find.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSide {
    White,
    Black,
}

impl PlayerSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "white" => Some(Self::White),
            "black" => Some(Self::Black),
            _ => None,
        }
    }

    pub fn color(&self) -> chess::Color {
        match self {
            Self::White => chess::Color::White,
            Self::Black => chess::Color::Black,
        }
    }

    /// Work out the player's side from a game's `White` and `Black` headers.
    ///
    /// Exactly one of the two names must match one of `player_names`
    /// (case-insensitive, surrounding whitespace ignored).
    pub fn detect(white: &str, black: &str, player_names: &[String]) -> Result<Self> {
        let matches = |header: &str| {
            let header = header.trim();
            player_names
                .iter()
                .any(|name| name.trim().eq_ignore_ascii_case(header))
        };

        match (matches(white), matches(black)) {
            (true, false) => Ok(Self::White),
            (false, true) => Ok(Self::Black),
            _ => Err(Error::AmbiguousSide {
                white: white.to_string(),
                black: black.to_string(),
            }),
        }
    }
}
