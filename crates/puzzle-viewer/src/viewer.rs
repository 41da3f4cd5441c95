//! The puzzle controller.
//!
//! Tracks the index of the next expected solution ply and whose turn it is,
//! judges the solver's moves, and tells the driver which timer to arm next:
//! the opponent's scripted reply, or the take-back of a blunder move.

use chess_core::notation::{en_passant_capture_square, move_squares, san_with_suffix};
use serde::Serialize;
use shakmaty::{Chess, Color, Move, Position, Role, Square};
use tracing::{debug, info};

use crate::board_state::BoardState;
use crate::error::ViewerError;
use crate::promotion::{PendingPromotion, PromotionHandler, PromotionPrompt};
use crate::puzzle::Puzzle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    OpponentToMove,
    SolverToMove,
    AwaitingPromotion,
    ShowingBlunder,
    Solved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Play the opponent's scripted move.
    OpponentReply,
    /// Undo the blunder move currently on the board.
    TakeBack,
}

/// A move that was put on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedMove {
    pub mv: Move,
    pub orig: Square,
    pub dest: Square,
    pub san: String,
    /// Square of the pawn removed by an en passant capture.
    pub en_passant_capture: Option<Square>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Correct { played: PlayedMove, solved: bool },
    Incorrect { played: PlayedMove },
    PromotionPrompt(PromotionPrompt),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimerOutcome {
    OpponentMoved { played: PlayedMove, solved: bool },
    TookBack,
}

/// Position and last move to restore once a blunder move has been shown.
#[derive(Debug, Clone)]
struct Snapshot {
    pos: Chess,
    last_move: Option<(Square, Square)>,
}

#[derive(Debug)]
pub struct PuzzleViewer {
    puzzle: Puzzle,
    pos: Chess,
    ply: usize,
    phase: Phase,
    feedback: Option<Feedback>,
    last_move: Option<(Square, Square)>,
    promotion: PromotionHandler,
    before_blunder: Option<Snapshot>,
    mistakes: u32,
    hints: u32,
}

impl PuzzleViewer {
    pub fn new(puzzle: Puzzle) -> Self {
        let pos = puzzle.start().clone();
        let phase = initial_phase(&puzzle);
        info!(
            id = puzzle.id().unwrap_or("-"),
            plies = puzzle.len(),
            solver = ?puzzle.solver(),
            "Puzzle loaded"
        );
        Self {
            puzzle,
            pos,
            ply: 0,
            phase,
            feedback: None,
            last_move: None,
            promotion: PromotionHandler::new(),
            before_blunder: None,
            mistakes: 0,
            hints: 0,
        }
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn position(&self) -> &Chess {
        &self.pos
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the next expected solution ply.
    pub fn ply(&self) -> usize {
        self.ply
    }

    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn hints(&self) -> u32 {
        self.hints
    }

    pub fn is_solved(&self) -> bool {
        self.phase == Phase::Solved
    }

    /// Board orientation: always from the solver's side.
    pub fn orientation(&self) -> Color {
        self.puzzle.solver()
    }

    pub fn pending_promotion(&self) -> Option<&PendingPromotion> {
        self.promotion.pending()
    }

    pub fn is_promotion_prompt_open(&self) -> bool {
        self.promotion.is_open()
    }

    pub fn promotion_prompt(&self) -> Option<PromotionPrompt> {
        self.promotion.pending().map(|p| p.prompt(self.orientation()))
    }

    pub fn board_state(&self) -> BoardState {
        BoardState::capture(self)
    }

    /// Solver moved a piece from `orig` to `dest` on the board.
    pub fn handle_move(&mut self, orig: Square, dest: Square) -> Result<MoveOutcome, ViewerError> {
        self.ensure_solver_turn()?;

        if PromotionHandler::is_promotion(&self.pos, orig, dest) {
            let pending = self.promotion.open(orig, dest, self.pos.turn())?;
            self.phase = Phase::AwaitingPromotion;
            debug!(%orig, %dest, "Promotion prompt opened");
            return Ok(MoveOutcome::PromotionPrompt(pending.prompt(self.orientation())));
        }

        let mv = self.find_move(orig, dest, None)?;
        Ok(self.judge(mv))
    }

    pub fn resolve_promotion(&mut self, role: Role) -> Result<MoveOutcome, ViewerError> {
        if self.phase != Phase::AwaitingPromotion {
            return Err(ViewerError::NoPromotionPending);
        }
        let (pending, role) = self.promotion.resolve(role)?;
        self.phase = Phase::SolverToMove;

        let mv = self.find_move(pending.orig, pending.dest, Some(role))?;
        Ok(self.judge(mv))
    }

    /// Close the prompt without moving; the board keeps the position from
    /// before the pawn was dragged.
    pub fn cancel_promotion(&mut self) -> Result<(), ViewerError> {
        if self.phase != Phase::AwaitingPromotion {
            return Err(ViewerError::NoPromotionPending);
        }
        let pending = self.promotion.cancel()?;
        self.phase = Phase::SolverToMove;
        debug!(orig = %pending.orig, dest = %pending.dest, "Promotion cancelled");
        Ok(())
    }

    /// Which timer the driver must arm for the current phase.
    pub fn pending_timer(&self) -> Option<Timer> {
        match self.phase {
            Phase::OpponentToMove => Some(Timer::OpponentReply),
            Phase::ShowingBlunder => Some(Timer::TakeBack),
            _ => None,
        }
    }

    /// Run an expired timer. Returns `None` when the timer no longer applies.
    pub fn fire(&mut self, timer: Timer) -> Option<TimerOutcome> {
        match (timer, self.phase) {
            (Timer::OpponentReply, Phase::OpponentToMove) => {
                let Some(mv) = self.puzzle.expected(self.ply).cloned() else {
                    self.phase = Phase::Solved;
                    return None;
                };
                let played = self.apply(mv);
                self.ply += 1;
                let solved = self.ply >= self.puzzle.len();
                self.phase = if solved {
                    Phase::Solved
                } else {
                    Phase::SolverToMove
                };
                debug!(san = %played.san, ply = self.ply, "Opponent replied");
                if solved {
                    self.log_solved();
                }
                Some(TimerOutcome::OpponentMoved { played, solved })
            }
            (Timer::TakeBack, Phase::ShowingBlunder) => {
                if let Some(snapshot) = self.before_blunder.take() {
                    self.pos = snapshot.pos;
                    self.last_move = snapshot.last_move;
                }
                self.phase = Phase::SolverToMove;
                debug!(ply = self.ply, "Blunder move taken back");
                Some(TimerOutcome::TookBack)
            }
            _ => None,
        }
    }

    /// Origin square of the expected move.
    pub fn hint(&mut self) -> Result<Square, ViewerError> {
        self.ensure_solver_turn()?;
        let (orig, _) = self
            .puzzle
            .expected(self.ply)
            .and_then(move_squares)
            .ok_or(ViewerError::AlreadySolved)?;
        self.hints += 1;
        Ok(orig)
    }

    /// Back to the starting position. Mistake and hint counters are kept.
    pub fn restart(&mut self) {
        self.pos = self.puzzle.start().clone();
        self.ply = 0;
        self.phase = initial_phase(&self.puzzle);
        self.feedback = None;
        self.last_move = None;
        self.promotion.close();
        self.before_blunder = None;
        debug!("Puzzle restarted");
    }

    fn ensure_solver_turn(&self) -> Result<(), ViewerError> {
        match self.phase {
            Phase::SolverToMove => Ok(()),
            Phase::AwaitingPromotion => Err(ViewerError::PromotionPending),
            Phase::Solved => Err(ViewerError::AlreadySolved),
            Phase::OpponentToMove | Phase::ShowingBlunder => Err(ViewerError::NotSolverTurn),
        }
    }

    fn find_move(
        &self,
        orig: Square,
        dest: Square,
        promotion: Option<Role>,
    ) -> Result<Move, ViewerError> {
        self.pos
            .legal_moves()
            .into_iter()
            .find(|mv| {
                let squares_match = move_squares(mv) == Some((orig, dest))
                    || matches!(*mv, Move::Castle { king, rook } if king == orig && rook == dest);
                squares_match && mv.promotion() == promotion
            })
            .ok_or_else(|| ViewerError::IllegalMove {
                orig: orig.to_string(),
                dest: dest.to_string(),
            })
    }

    /// Compare a legal solver move against the expected one and apply it.
    fn judge(&mut self, mv: Move) -> MoveOutcome {
        let expected = self.puzzle.expected(self.ply).cloned();
        let correct = match expected {
            Some(ref expected) => {
                *expected == mv || (gives_mate(&self.pos, expected) && gives_mate(&self.pos, &mv))
            }
            None => false,
        };

        if correct {
            let played = self.apply(mv);
            self.ply += 1;
            self.feedback = Some(Feedback::Correct);
            let solved = self.ply >= self.puzzle.len();
            self.phase = if solved {
                Phase::Solved
            } else {
                Phase::OpponentToMove
            };
            debug!(san = %played.san, ply = self.ply, "Correct move");
            if solved {
                self.log_solved();
            }
            MoveOutcome::Correct { played, solved }
        } else {
            self.before_blunder = Some(Snapshot {
                pos: self.pos.clone(),
                last_move: self.last_move,
            });
            let played = self.apply(mv);
            self.mistakes += 1;
            self.feedback = Some(Feedback::Incorrect);
            self.phase = Phase::ShowingBlunder;
            debug!(san = %played.san, ply = self.ply, mistakes = self.mistakes, "Blunder move");
            MoveOutcome::Incorrect { played }
        }
    }

    fn apply(&mut self, mv: Move) -> PlayedMove {
        let (orig, dest) = move_squares(&mv).unwrap_or((mv.to(), mv.to()));
        let san = san_with_suffix(&self.pos, &mv);
        let en_passant_capture = en_passant_capture_square(&mv);

        self.pos.play_unchecked(mv.clone());
        self.last_move = Some((orig, dest));

        PlayedMove {
            mv,
            orig,
            dest,
            san,
            en_passant_capture,
        }
    }

    fn log_solved(&self) {
        info!(
            id = self.puzzle.id().unwrap_or("-"),
            mistakes = self.mistakes,
            hints = self.hints,
            "Puzzle solved"
        );
    }
}

fn initial_phase(puzzle: &Puzzle) -> Phase {
    if puzzle.first_move_blunder() {
        Phase::OpponentToMove
    } else {
        Phase::SolverToMove
    }
}

fn gives_mate(pos: &Chess, mv: &Move) -> bool {
    let mut after = pos.clone();
    after.play_unchecked(mv.clone());
    after.is_checkmate()
}
