//! Viewer error types

use chess_core::PgnError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Invalid puzzle: {0}")]
    InvalidPuzzle(String),

    #[error(transparent)]
    Pgn(#[from] PgnError),

    #[error("Not the solver's turn")]
    NotSolverTurn,

    #[error("Illegal move: {orig}{dest}")]
    IllegalMove { orig: String, dest: String },

    #[error("A promotion is pending")]
    PromotionPending,

    #[error("No promotion is pending")]
    NoPromotionPending,

    #[error("Cannot promote to {0}")]
    InvalidPromotionRole(String),

    #[error("Puzzle already solved")]
    AlreadySolved,

    #[error("Session closed")]
    SessionClosed,
}
