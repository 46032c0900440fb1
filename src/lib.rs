//! Command-line front end for Woodpecker: a text board and the interactive
//! training loop. Scheduling and storage live in `woodpecker-core`.

pub mod render;
pub mod train;
