use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleMetadata {
    pub event: Option<String>,
    pub site: Option<String>,
    pub puzzle_id: Option<String>,
    /// The first scripted move is the opponent's mistake, auto-played before the solver moves.
    pub first_move_blunder: bool,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleRecord {
    pub metadata: PuzzleMetadata,
    pub fen: String,       // starting position
    pub moves: Vec<String>, // SAN notation
    pub uci: Vec<String>,   // same line in UCI, castling as king-two-squares
    pub pgn: String,
}

impl PuzzleRecord {
    /// Number of half-moves in the solution line.
    pub fn plies(&self) -> usize {
        self.moves.len()
    }
}
