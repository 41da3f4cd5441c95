//! Puzzle replay controller.
//!
//! `PuzzleViewer` is a synchronous state machine: it validates the solver's
//! moves against the scripted line and reports which timer, if any, must fire
//! next. `Session` drives it on a tokio task, owning the timers and turning
//! every state change into an `Event` for the board widget.

pub mod board_state;
pub mod error;
pub mod promotion;
pub mod puzzle;
pub mod session;
pub mod viewer;

pub use board_state::BoardState;
pub use error::ViewerError;
pub use promotion::{PromotionHandler, PromotionPrompt};
pub use puzzle::Puzzle;
pub use session::{Command, Event, Session, SessionConfig, SessionHandle};
pub use viewer::{Feedback, MoveOutcome, Phase, PuzzleViewer, Timer, TimerOutcome};
