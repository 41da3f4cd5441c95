//! WebSocket viewer route
//!
//! Each socket drives at most one puzzle session. Client messages become
//! session commands, and every session event is forwarded as JSON.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use chess_core::notation::{color_name, parse_role, parse_square};
use futures::{SinkExt, StreamExt};
use puzzle_viewer::{Command, Event, Puzzle, PuzzleViewer, Session};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::library::PuzzleLibrary;

const OUTGOING_CAPACITY: usize = 64;

// ---- Message types ----

/// Server → Client messages that do not come from the session itself
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Loaded {
        id: Option<String>,
        solver: &'static str,
        plies: usize,
        first_move_blunder: bool,
    },
    Error {
        message: String,
    },
}

/// Client → Server messages
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Load {
        id: String,
    },
    LoadPgn {
        pgn: String,
        #[serde(default)]
        first_move_blunder: bool,
    },
    Move {
        orig: String,
        dest: String,
    },
    Promote {
        role: String,
    },
    CancelPromotion,
    Hint,
    Restart,
}

// ---- WebSocket handler ----

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(library): Extension<Arc<PuzzleLibrary>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, library, config))
}

async fn handle_socket(socket: WebSocket, library: Arc<PuzzleLibrary>, config: Config) {
    let (sender, mut receiver) = socket.split();

    // All socket writes go through one task, so the read loop never waits on
    // a write and session events are drained while commands are pending.
    let (out, out_rx) = mpsc::channel(OUTGOING_CAPACITY);
    let writer = tokio::spawn(write_loop(sender, out_rx));

    let mut session: Option<ActiveSession> = None;

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t.to_string(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket receive error: {}", e);
                break;
            }
        };

        if let Err(e) = handle_text(&text, &mut session, &library, &config, &out).await {
            tracing::debug!("WebSocket writer gone: {}", e);
            break;
        }
    }

    if let Some(active) = session.take() {
        active.abort();
    }
    drop(out);
    let _ = writer.await;
}

/// A running session: the command side plus the task forwarding its events.
struct ActiveSession {
    commands: mpsc::Sender<Command>,
    forward: JoinHandle<()>,
}

impl ActiveSession {
    fn start(puzzle: Puzzle, config: &Config, out: &mpsc::Sender<String>) -> Self {
        let handle = Session::spawn(PuzzleViewer::new(puzzle), config.session_config());
        let (commands, events, _task) = handle.into_parts();
        let forward = tokio::spawn(forward_events(events, out.clone()));
        Self { commands, forward }
    }

    /// Stop the session and wait until its remaining events are queued, so
    /// nothing from it follows a later message.
    async fn close(self) {
        drop(self.commands);
        let _ = self.forward.await;
    }

    /// Stop without waiting; the session ends once its event receiver is gone.
    fn abort(self) {
        self.forward.abort();
    }
}

async fn handle_text(
    text: &str,
    session: &mut Option<ActiveSession>,
    library: &PuzzleLibrary,
    config: &Config,
    out: &mpsc::Sender<String>,
) -> Result<()> {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => return send_error(out, format!("Invalid message: {}", e)).await,
    };

    let loaded = match client_msg {
        ClientMessage::Load { id } => library.puzzle(&id),
        ClientMessage::LoadPgn {
            pgn,
            first_move_blunder,
        } => Puzzle::from_pgn(&pgn, first_move_blunder),
        other => {
            let Some(active) = session.as_ref() else {
                return send_error(out, "No puzzle loaded".into()).await;
            };
            let command = match to_command(other) {
                Ok(command) => command,
                Err(message) => return send_error(out, message).await,
            };
            if active.commands.send(command).await.is_err() {
                if let Some(ended) = session.take() {
                    ended.abort();
                }
                return send_error(out, "Puzzle session ended".into()).await;
            }
            return Ok(());
        }
    };

    let puzzle = match loaded {
        Ok(puzzle) => puzzle,
        Err(e) => return send_error(out, format!("Could not load puzzle: {}", e)).await,
    };

    if let Some(previous) = session.take() {
        previous.close().await;
    }

    send_json(
        out,
        &ServerMessage::Loaded {
            id: puzzle.id().map(str::to_string),
            solver: color_name(puzzle.solver()),
            plies: puzzle.len(),
            first_move_blunder: puzzle.first_move_blunder(),
        },
    )
    .await?;

    *session = Some(ActiveSession::start(puzzle, config, out));
    Ok(())
}

fn to_command(msg: ClientMessage) -> Result<Command, String> {
    match msg {
        ClientMessage::Move { orig, dest } => {
            let orig = parse_square(&orig).ok_or_else(|| format!("Invalid square: {orig}"))?;
            let dest = parse_square(&dest).ok_or_else(|| format!("Invalid square: {dest}"))?;
            Ok(Command::Move { orig, dest })
        }
        ClientMessage::Promote { role } => parse_role(&role)
            .map(Command::Promote)
            .ok_or_else(|| format!("Invalid piece: {role}")),
        ClientMessage::CancelPromotion => Ok(Command::CancelPromotion),
        ClientMessage::Hint => Ok(Command::Hint),
        ClientMessage::Restart => Ok(Command::Restart),
        ClientMessage::Load { .. } | ClientMessage::LoadPgn { .. } => {
            Err("Load messages are not session commands".into())
        }
    }
}

async fn forward_events(mut events: mpsc::Receiver<Event>, out: mpsc::Sender<String>) {
    while let Some(event) = events.recv().await {
        if send_json(&out, &event).await.is_err() {
            break;
        }
    }
}

async fn write_loop(
    mut sender: futures::stream::SplitSink<WebSocket, Message>,
    mut out: mpsc::Receiver<String>,
) {
    while let Some(json) = out.recv().await {
        if let Err(e) = sender.send(Message::Text(json.into())).await {
            tracing::debug!("WebSocket send failed: {}", e);
            break;
        }
    }
    let _ = sender.close().await;
}

// ---- Helper: queue message ----

async fn send_json<T: Serialize>(out: &mpsc::Sender<String>, msg: &T) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    out.send(json)
        .await
        .map_err(|_| anyhow::anyhow!("WebSocket writer closed"))?;
    Ok(())
}

async fn send_error(out: &mpsc::Sender<String>, message: String) -> Result<()> {
    send_json(out, &ServerMessage::Error { message }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Role, Square};

    fn parse(json: &str) -> ClientMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_client_messages_deserialize() {
        assert_eq!(
            parse(r#"{"type":"load","id":"demo-knight-mate"}"#),
            ClientMessage::Load {
                id: "demo-knight-mate".into()
            }
        );
        assert_eq!(
            parse(r#"{"type":"load_pgn","pgn":"1. e4 e5"}"#),
            ClientMessage::LoadPgn {
                pgn: "1. e4 e5".into(),
                first_move_blunder: false
            }
        );
        assert_eq!(parse(r#"{"type":"cancel_promotion"}"#), ClientMessage::CancelPromotion);
    }

    #[test]
    fn test_move_and_promote_commands() {
        let mv = to_command(parse(r#"{"type":"move","orig":"f7","dest":"f8"}"#)).unwrap();
        assert_eq!(
            mv,
            Command::Move {
                orig: Square::F7,
                dest: Square::F8
            }
        );

        let promote = to_command(parse(r#"{"type":"promote","role":"knight"}"#)).unwrap();
        assert_eq!(promote, Command::Promote(Role::Knight));

        let short = to_command(parse(r#"{"type":"promote","role":"q"}"#)).unwrap();
        assert_eq!(short, Command::Promote(Role::Queen));
    }

    #[test]
    fn test_invalid_command_fields() {
        assert!(to_command(parse(r#"{"type":"move","orig":"z9","dest":"f8"}"#)).is_err());
        assert!(to_command(parse(r#"{"type":"promote","role":"dragon"}"#)).is_err());
        assert!(to_command(parse(r#"{"type":"load","id":"x"}"#)).is_err());
    }

    #[test]
    fn test_loaded_message_shape() {
        let json = serde_json::to_value(ServerMessage::Loaded {
            id: Some("p1".into()),
            solver: "black",
            plies: 8,
            first_move_blunder: true,
        })
        .unwrap();
        assert_eq!(json["type"], "loaded");
        assert_eq!(json["solver"], "black");
    }
}
