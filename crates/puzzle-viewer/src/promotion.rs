//! Promotion sub-handler: at most one pending promotion, resolved by a piece
//! choice or cancelled.

use chess_core::notation::{color_name, role_name};
use serde::Serialize;
use shakmaty::{Chess, Color, Move, Position, Role, Square};

use crate::error::ViewerError;

/// Order in which the choices are stacked from the promotion square.
pub const PROMOTION_ROLES: [Role; 4] = [Role::Queen, Role::Knight, Role::Rook, Role::Bishop];

const SQUARE_PERCENT: f32 = 12.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPromotion {
    pub orig: Square,
    pub dest: Square,
    pub color: Color,
}

/// One clickable piece of the promotion overlay, positioned in board percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionChoice {
    pub role: &'static str,
    pub left: f32,
    pub top: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionPrompt {
    pub orig: String,
    pub dest: String,
    pub color: &'static str,
    pub choices: Vec<PromotionChoice>,
}

impl PendingPromotion {
    /// Overlay layout: choices stacked from the promotion square towards the
    /// centre of the board, mirrored when the board is viewed from black.
    pub fn prompt(&self, orientation: Color) -> PromotionPrompt {
        let mut left = self.dest.file() as i32;
        let mut top: i32 = if self.color == Color::White { 0 } else { 7 };
        let mut step: i32 = if self.color == Color::White { 1 } else { -1 };

        if orientation == Color::Black {
            left = 7 - left;
            top = 7 - top;
            step = -step;
        }

        let choices = PROMOTION_ROLES
            .iter()
            .enumerate()
            .map(|(i, &role)| PromotionChoice {
                role: role_name(role),
                left: left as f32 * SQUARE_PERCENT,
                top: (top + i as i32 * step) as f32 * SQUARE_PERCENT,
            })
            .collect();

        PromotionPrompt {
            orig: self.orig.to_string(),
            dest: self.dest.to_string(),
            color: color_name(self.color),
            choices,
        }
    }
}

#[derive(Debug, Default)]
pub struct PromotionHandler {
    pending: Option<PendingPromotion>,
}

impl PromotionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a legal move from `orig` to `dest` needs a promotion piece.
    pub fn is_promotion(pos: &Chess, orig: Square, dest: Square) -> bool {
        pos.legal_moves().iter().any(|mv| {
            matches!(
                *mv,
                Move::Normal { from, to, promotion: Some(_), .. } if from == orig && to == dest
            )
        })
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingPromotion> {
        self.pending.as_ref()
    }

    pub fn open(
        &mut self,
        orig: Square,
        dest: Square,
        color: Color,
    ) -> Result<PendingPromotion, ViewerError> {
        if self.pending.is_some() {
            return Err(ViewerError::PromotionPending);
        }
        let pending = PendingPromotion { orig, dest, color };
        self.pending = Some(pending);
        Ok(pending)
    }

    /// Close the prompt with a piece choice. An unusable role leaves it open.
    pub fn resolve(&mut self, role: Role) -> Result<(PendingPromotion, Role), ViewerError> {
        if self.pending.is_none() {
            return Err(ViewerError::NoPromotionPending);
        }
        if !PROMOTION_ROLES.contains(&role) {
            return Err(ViewerError::InvalidPromotionRole(role_name(role).to_string()));
        }
        let pending = self.pending.take().ok_or(ViewerError::NoPromotionPending)?;
        Ok((pending, role))
    }

    pub fn cancel(&mut self) -> Result<PendingPromotion, ViewerError> {
        self.pending.take().ok_or(ViewerError::NoPromotionPending)
    }

    pub fn close(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::notation::position_from_fen;

    fn tops(prompt: &PromotionPrompt) -> Vec<f32> {
        prompt.choices.iter().map(|c| c.top).collect()
    }

    #[test]
    fn test_is_promotion() {
        let pos = position_from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").unwrap();
        assert!(PromotionHandler::is_promotion(&pos, Square::A7, Square::A8));
        assert!(!PromotionHandler::is_promotion(&pos, Square::H1, Square::H2));
    }

    #[test]
    fn test_pawn_on_last_rank_without_legal_move_is_not_promotion() {
        // a8 is occupied, the pawn cannot advance
        let pos = position_from_fen("n7/P7/8/8/8/8/8/k6K w - - 0 1").unwrap();
        assert!(!PromotionHandler::is_promotion(&pos, Square::A7, Square::A8));
    }

    #[test]
    fn test_white_prompt_white_orientation() {
        let pending = PendingPromotion {
            orig: Square::F7,
            dest: Square::F8,
            color: Color::White,
        };
        let prompt = pending.prompt(Color::White);
        assert_eq!(prompt.color, "white");
        assert_eq!(prompt.choices[0].role, "queen");
        assert_eq!(prompt.choices[1].role, "knight");
        assert_eq!(prompt.choices[0].left, 62.5);
        assert_eq!(tops(&prompt), vec![0.0, 12.5, 25.0, 37.5]);
    }

    #[test]
    fn test_black_prompt_flips_with_orientation() {
        let pending = PendingPromotion {
            orig: Square::B2,
            dest: Square::B1,
            color: Color::Black,
        };

        let from_white = pending.prompt(Color::White);
        assert_eq!(from_white.choices[0].left, 12.5);
        assert_eq!(tops(&from_white), vec![87.5, 75.0, 62.5, 50.0]);

        let from_black = pending.prompt(Color::Black);
        assert_eq!(from_black.choices[0].left, 75.0);
        assert_eq!(tops(&from_black), vec![0.0, 12.5, 25.0, 37.5]);
    }

    #[test]
    fn test_only_one_pending_promotion() {
        let mut handler = PromotionHandler::new();
        handler.open(Square::A7, Square::A8, Color::White).unwrap();
        assert!(handler.is_open());
        assert!(matches!(
            handler.open(Square::B7, Square::B8, Color::White),
            Err(ViewerError::PromotionPending)
        ));
    }

    #[test]
    fn test_resolve_rejects_king_and_stays_open() {
        let mut handler = PromotionHandler::new();
        handler.open(Square::A7, Square::A8, Color::White).unwrap();
        assert!(matches!(
            handler.resolve(Role::King),
            Err(ViewerError::InvalidPromotionRole(_))
        ));
        assert!(handler.is_open());

        let (pending, role) = handler.resolve(Role::Knight).unwrap();
        assert_eq!(pending.dest, Square::A8);
        assert_eq!(role, Role::Knight);
        assert!(!handler.is_open());
    }

    #[test]
    fn test_cancel_without_prompt() {
        let mut handler = PromotionHandler::new();
        assert!(matches!(handler.cancel(), Err(ViewerError::NoPromotionPending)));
    }
}
