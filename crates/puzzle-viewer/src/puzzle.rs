use chess_core::notation::position_from_fen;
use chess_core::{parse_puzzle, PuzzleRecord};
use shakmaty::{uci::UciMove, Chess, Color, Move, Position};

use crate::error::ViewerError;

/// A starting position plus the scripted solution line.
#[derive(Debug, Clone)]
pub struct Puzzle {
    id: Option<String>,
    start: Chess,
    solution: Vec<Move>,
    first_move_blunder: bool,
}

impl Puzzle {
    /// Build a puzzle, checking that every move of the line is legal in turn.
    pub fn new(
        start: Chess,
        solution: Vec<Move>,
        first_move_blunder: bool,
    ) -> Result<Self, ViewerError> {
        if solution.is_empty() {
            return Err(ViewerError::InvalidPuzzle("solution is empty".into()));
        }
        if first_move_blunder && solution.len() < 2 {
            return Err(ViewerError::InvalidPuzzle(
                "first move is the opponent's but no solver move follows".into(),
            ));
        }

        let mut pos = start.clone();
        for (ply, mv) in solution.iter().enumerate() {
            if !pos.legal_moves().contains(mv) {
                return Err(ViewerError::InvalidPuzzle(format!(
                    "illegal move at ply {ply}"
                )));
            }
            pos.play_unchecked(mv.clone());
        }

        Ok(Self {
            id: None,
            start,
            solution,
            first_move_blunder,
        })
    }

    pub fn from_record(record: &PuzzleRecord) -> Result<Self, ViewerError> {
        let start = position_from_fen(&record.fen)?;

        let mut pos = start.clone();
        let mut solution = Vec::with_capacity(record.uci.len());
        for (ply, uci_str) in record.uci.iter().enumerate() {
            let uci: UciMove = uci_str.parse().map_err(|_| {
                ViewerError::InvalidPuzzle(format!("bad UCI '{uci_str}' at ply {ply}"))
            })?;
            let mv = uci.to_move(&pos).map_err(|_| {
                ViewerError::InvalidPuzzle(format!("illegal move '{uci_str}' at ply {ply}"))
            })?;
            pos.play_unchecked(mv.clone());
            solution.push(mv);
        }

        let mut puzzle = Self::new(start, solution, record.metadata.first_move_blunder)?;
        puzzle.id = record.metadata.puzzle_id.clone();
        Ok(puzzle)
    }

    /// Parse a game record. `first_move_blunder` is OR-ed with the record's own tag.
    pub fn from_pgn(pgn: &str, first_move_blunder: bool) -> Result<Self, ViewerError> {
        let mut record = parse_puzzle(pgn)?;
        record.metadata.first_move_blunder |= first_move_blunder;
        Self::from_record(&record)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn start(&self) -> &Chess {
        &self.start
    }

    pub fn solution(&self) -> &[Move] {
        &self.solution
    }

    pub fn len(&self) -> usize {
        self.solution.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solution.is_empty()
    }

    pub fn first_move_blunder(&self) -> bool {
        self.first_move_blunder
    }

    /// The side the human plays.
    pub fn solver(&self) -> Color {
        if self.first_move_blunder {
            !self.start.turn()
        } else {
            self.start.turn()
        }
    }

    pub fn expected(&self, ply: usize) -> Option<&Move> {
        self.solution.get(ply)
    }

    pub fn is_solver_ply(&self, ply: usize) -> bool {
        ply % 2 == usize::from(self.first_move_blunder)
    }

    /// Number of plies the solver has to find.
    pub fn solver_plies(&self) -> usize {
        (0..self.len()).filter(|&p| self.is_solver_ply(p)).count()
    }
}
