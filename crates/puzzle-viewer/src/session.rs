//! Async driver: owns a `PuzzleViewer` on a tokio task, applies commands,
//! arms the viewer's timers and publishes every change as an `Event`.

use std::time::Duration;

use chess_core::notation::color_name;
use serde::Serialize;
use shakmaty::{Role, Square};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::board_state::BoardState;
use crate::error::ViewerError;
use crate::promotion::PromotionPrompt;
use crate::viewer::{Feedback, MoveOutcome, PlayedMove, PuzzleViewer, Timer, TimerOutcome};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Delay before the opponent's scripted reply.
    pub opponent_delay: Duration,
    /// How long a blunder move stays on the board.
    pub take_back_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            opponent_delay: Duration::from_millis(500),
            take_back_delay: Duration::from_millis(900),
        }
    }
}

impl SessionConfig {
    fn delay(&self, timer: Timer) -> Duration {
        match timer {
            Timer::OpponentReply => self.opponent_delay,
            Timer::TakeBack => self.take_back_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move { orig: Square, dest: Square },
    Promote(Role),
    CancelPromotion,
    Hint,
    Restart,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Full redraw.
    Board { state: BoardState },
    Feedback { feedback: Feedback, san: String },
    PromotionPrompt { prompt: PromotionPrompt },
    /// Pawn to remove from the widget after an en passant capture.
    EnPassant { captured: String },
    Hint { square: String },
    Solved { mistakes: u32, hints: u32 },
    Rejected { reason: String },
}

pub struct Session;

impl Session {
    /// Start driving `viewer` on a new task. The first event is always a `Board`.
    pub fn spawn(viewer: PuzzleViewer, config: SessionConfig) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let task = tokio::spawn(run(viewer, config, command_rx, event_tx));

        SessionHandle {
            commands: command_tx,
            events: event_rx,
            task,
        }
    }
}

pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: mpsc::Receiver<Event>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<(), ViewerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ViewerError::SessionClosed)
    }

    pub async fn recv(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Split into the raw channel ends, for callers that `select!` on them.
    pub fn into_parts(self) -> (mpsc::Sender<Command>, mpsc::Receiver<Event>, JoinHandle<()>) {
        (self.commands, self.events, self.task)
    }
}

async fn run(
    mut viewer: PuzzleViewer,
    config: SessionConfig,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<Event>,
) {
    info!(
        id = viewer.puzzle().id().unwrap_or("-"),
        solver = color_name(viewer.orientation()),
        "Puzzle session started"
    );

    let mut deadline: Option<(Timer, Instant)> = None;
    let mut out = vec![board(&viewer)];

    loop {
        for event in out.drain(..) {
            if events.send(event).await.is_err() {
                debug!("Event receiver dropped, ending session");
                return;
            }
        }

        deadline = match (viewer.pending_timer(), deadline) {
            (Some(timer), Some((armed, at))) if timer == armed => Some((armed, at)),
            (Some(timer), _) => Some((timer, Instant::now() + config.delay(timer))),
            (None, _) => None,
        };
        let wake_at = deadline.map(|(_, at)| at).unwrap_or_else(Instant::now);

        tokio::select! {
            command = commands.recv() => {
                match command {
                    None | Some(Command::Close) => break,
                    Some(Command::Restart) => {
                        viewer.restart();
                        deadline = None;
                        out.push(board(&viewer));
                    }
                    Some(command) => apply_command(&mut viewer, command, &mut out),
                }
            }
            _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                if let Some((timer, _)) = deadline.take() {
                    if let Some(outcome) = viewer.fire(timer) {
                        timer_events(&viewer, outcome, &mut out);
                    }
                }
            }
        }
    }

    info!(
        id = viewer.puzzle().id().unwrap_or("-"),
        solved = viewer.is_solved(),
        mistakes = viewer.mistakes(),
        "Puzzle session closed"
    );
}

fn board(viewer: &PuzzleViewer) -> Event {
    Event::Board {
        state: viewer.board_state(),
    }
}

fn apply_command(viewer: &mut PuzzleViewer, command: Command, out: &mut Vec<Event>) {
    debug!(?command, "Session command");

    let result = match command {
        Command::Move { orig, dest } => viewer
            .handle_move(orig, dest)
            .map(|outcome| move_events(viewer, outcome, out)),
        Command::Promote(role) => viewer
            .resolve_promotion(role)
            .map(|outcome| move_events(viewer, outcome, out)),
        Command::CancelPromotion => viewer.cancel_promotion(),
        Command::Hint => viewer.hint().map(|square| {
            out.push(Event::Hint {
                square: square.to_string(),
            })
        }),
        Command::Restart | Command::Close => Ok(()),
    };

    if let Err(e) = result {
        debug!(error = %e, "Command rejected");
        out.push(Event::Rejected {
            reason: e.to_string(),
        });
    }

    // The widget may already show the dragged piece; always resync it
    out.push(board(viewer));
}

fn move_events(viewer: &PuzzleViewer, outcome: MoveOutcome, out: &mut Vec<Event>) {
    match outcome {
        MoveOutcome::PromotionPrompt(prompt) => out.push(Event::PromotionPrompt { prompt }),
        MoveOutcome::Correct { played, solved } => {
            played_events(&played, out);
            out.push(Event::Feedback {
                feedback: Feedback::Correct,
                san: played.san,
            });
            if solved {
                out.push(solved_event(viewer));
            }
        }
        MoveOutcome::Incorrect { played } => {
            played_events(&played, out);
            out.push(Event::Feedback {
                feedback: Feedback::Incorrect,
                san: played.san,
            });
        }
    }
}

fn timer_events(viewer: &PuzzleViewer, outcome: TimerOutcome, out: &mut Vec<Event>) {
    if let TimerOutcome::OpponentMoved { played, solved } = outcome {
        played_events(&played, out);
        out.push(board(viewer));
        if solved {
            out.push(solved_event(viewer));
        }
    } else {
        out.push(board(viewer));
    }
}

fn played_events(played: &PlayedMove, out: &mut Vec<Event>) {
    if let Some(captured) = played.en_passant_capture {
        out.push(Event::EnPassant {
            captured: captured.to_string(),
        });
    }
}

fn solved_event(viewer: &PuzzleViewer) -> Event {
    Event::Solved {
        mistakes: viewer.mistakes(),
        hints: viewer.hints(),
    }
}
