//! Puzzle records and notation helpers shared by the viewer and the server.

pub mod notation;
pub mod pgn;
pub mod record;

pub use pgn::{parse_puzzle, parse_puzzles, PgnError};
pub use record::{PuzzleMetadata, PuzzleRecord};
