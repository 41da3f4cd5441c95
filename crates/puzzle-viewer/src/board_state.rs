//! Snapshot of everything the board widget renders.

use std::collections::BTreeMap;

use chess_core::notation::{check_square, chessground_dests, color_name, fen_of};
use serde::Serialize;
use shakmaty::Position;

use crate::promotion::PromotionPrompt;
use crate::viewer::{Feedback, Phase, PuzzleViewer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub solver_moves_played: usize,
    pub solver_moves_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardState {
    pub fen: String,
    pub orientation: &'static str,
    pub turn: &'static str,
    /// Side allowed to drag pieces; `None` while the solver must wait.
    pub movable_color: Option<&'static str>,
    pub dests: BTreeMap<String, Vec<String>>,
    pub last_move: Option<[String; 2]>,
    pub check: Option<String>,
    pub phase: Phase,
    pub feedback: Option<Feedback>,
    pub promotion: Option<PromotionPrompt>,
    /// Dim the board while the promotion overlay is open.
    pub darken: bool,
    pub progress: Progress,
    pub mistakes: u32,
}

impl BoardState {
    pub fn capture(viewer: &PuzzleViewer) -> Self {
        let pos = viewer.position();
        let puzzle = viewer.puzzle();
        let solver_turn = viewer.phase() == Phase::SolverToMove;

        let dests = if solver_turn {
            chessground_dests(pos)
        } else {
            BTreeMap::new()
        };

        let promotion = viewer.promotion_prompt();

        Self {
            fen: fen_of(pos),
            orientation: color_name(viewer.orientation()),
            turn: color_name(pos.turn()),
            movable_color: solver_turn.then(|| color_name(puzzle.solver())),
            dests,
            last_move: viewer
                .last_move()
                .map(|(orig, dest)| [orig.to_string(), dest.to_string()]),
            check: check_square(pos).map(|sq| sq.to_string()),
            phase: viewer.phase(),
            feedback: viewer.feedback(),
            darken: promotion.is_some(),
            promotion,
            progress: Progress {
                solver_moves_played: (0..viewer.ply())
                    .filter(|&p| puzzle.is_solver_ply(p))
                    .count(),
                solver_moves_total: puzzle.solver_plies(),
            },
            mistakes: viewer.mistakes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::Puzzle;
    use shakmaty::Square;

    const MATE_WITH_KNIGHT: &str = "[FEN \"5r2/2R2P1k/7p/4q3/7K/8/6Q1/8 w - - 0 1\"]\n\n1. Qg8+ Rxg8 2. f8=N+ Kh8 3. Rh7#";

    fn viewer() -> PuzzleViewer {
        PuzzleViewer::new(Puzzle::from_pgn(MATE_WITH_KNIGHT, false).unwrap())
    }

    #[test]
    fn test_initial_state_movable_for_solver() {
        let state = viewer().board_state();
        assert_eq!(state.orientation, "white");
        assert_eq!(state.turn, "white");
        assert_eq!(state.movable_color, Some("white"));
        assert!(state.dests.contains_key("g2"));
        assert_eq!(state.last_move, None);
        assert_eq!(state.check, None);
        assert_eq!(
            state.progress,
            Progress {
                solver_moves_played: 0,
                solver_moves_total: 3
            }
        );
        assert!(!state.darken);
    }

    #[test]
    fn test_locked_while_opponent_to_move() {
        let mut v = viewer();
        v.handle_move(Square::G2, Square::G8).unwrap();
        let state = v.board_state();
        assert_eq!(state.movable_color, None);
        assert!(state.dests.is_empty());
        assert_eq!(state.check.as_deref(), Some("h7"));
        assert_eq!(state.last_move, Some(["g2".to_string(), "g8".to_string()]));
        assert_eq!(state.feedback, Some(Feedback::Correct));
        assert_eq!(state.progress.solver_moves_played, 1);
    }

    #[test]
    fn test_promotion_darkens_board() {
        let mut v = viewer();
        v.handle_move(Square::G2, Square::G8).unwrap();
        v.fire(crate::viewer::Timer::OpponentReply);
        v.handle_move(Square::F7, Square::F8).unwrap();

        let state = v.board_state();
        assert!(state.darken);
        assert_eq!(state.phase, Phase::AwaitingPromotion);
        assert_eq!(state.promotion.as_ref().map(|p| p.dest.as_str()), Some("f8"));
        assert!(state.dests.is_empty());

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["phase"], "awaiting_promotion");
        assert_eq!(json["promotion"]["choices"][1]["role"], "knight");
    }
}
