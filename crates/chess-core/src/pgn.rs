//! PGN parsing for puzzle records.
//!
//! Tags and movetext are tokenized by `pgn-reader`; every SAN move is replayed
//! with shakmaty from the `FEN` tag (or the standard start), so a record that
//! parses is guaranteed to be a legal line.

use std::fmt::Write;
use std::io;
use std::ops::ControlFlow;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{CastlingMode, Chess, Position};
use thiserror::Error;

use crate::notation::{fen_of, position_from_fen, san_with_suffix};
use crate::record::{PuzzleMetadata, PuzzleRecord};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Error)]
pub enum PgnError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Illegal position '{fen}': {reason}")]
    IllegalPosition { fen: String, reason: String },

    #[error("Illegal move '{san}' at ply {ply}")]
    IllegalMove { ply: usize, san: String },

    #[error("Puzzle has no moves")]
    EmptySolution,

    #[error("No game found in PGN")]
    NoGame,

    #[error("PGN read error: {0}")]
    Io(#[from] io::Error),
}

/// Tags collected during header parsing.
#[derive(Default)]
struct PuzzleTags {
    metadata: PuzzleMetadata,
    fen: Option<String>,
}

/// State during movetext parsing.
struct LineState {
    metadata: PuzzleMetadata,
    fen: String,
    pos: Chess,
    moves: Vec<String>,
    uci: Vec<String>,
}

/// Visitor that turns one game into a `PuzzleRecord`.
struct PuzzleVisitor;

impl Visitor for PuzzleVisitor {
    type Tags = PuzzleTags;
    type Movetext = LineState;
    type Output = Result<PuzzleRecord, PgnError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, PuzzleTags> {
        ControlFlow::Continue(PuzzleTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut PuzzleTags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let value = value.decode_utf8_lossy().into_owned();
        match name {
            b"Event" => tags.metadata.event = Some(value),
            b"Site" => tags.metadata.site = Some(value),
            b"PuzzleId" => tags.metadata.puzzle_id = Some(value),
            b"Result" => tags.metadata.result = value,
            b"FEN" => tags.fen = Some(value),
            b"FirstMoveBlunder" => tags.metadata.first_move_blunder = parse_flag(&value),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: PuzzleTags) -> ControlFlow<Self::Output, LineState> {
        let fen = tags.fen.unwrap_or_else(|| STANDARD_START_FEN.to_string());
        let pos = match position_from_fen(&fen) {
            Ok(pos) => pos,
            Err(e) => return ControlFlow::Break(Err(e)),
        };

        let mut metadata = tags.metadata;
        if metadata.result.is_empty() {
            metadata.result = "*".to_string();
        }

        ControlFlow::Continue(LineState {
            metadata,
            fen: fen_of(&pos),
            pos,
            moves: Vec::new(),
            uci: Vec::new(),
        })
    }

    fn san(&mut self, state: &mut LineState, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        let ply = state.moves.len();
        let mv = match san_plus.san.to_move(&state.pos) {
            Ok(mv) => mv,
            Err(_) => {
                return ControlFlow::Break(Err(PgnError::IllegalMove {
                    ply,
                    san: san_plus.to_string(),
                }))
            }
        };

        // Re-render the SAN, the source may omit or misplace check suffixes
        state.moves.push(san_with_suffix(&state.pos, &mv));
        state
            .uci
            .push(mv.to_uci(CastlingMode::Standard).to_string());
        state.pos.play_unchecked(mv);

        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _state: &mut LineState) -> ControlFlow<Self::Output, Skip> {
        // Only the mainline is the solution
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, state: LineState) -> Self::Output {
        if state.moves.is_empty() {
            return Err(PgnError::EmptySolution);
        }

        let pgn = render_pgn(&state.metadata, &state.fen, &state.moves)?;
        Ok(PuzzleRecord {
            metadata: state.metadata,
            fen: state.fen,
            moves: state.moves,
            uci: state.uci,
            pgn,
        })
    }
}

/// Parse the first game of a PGN string into a puzzle record.
pub fn parse_puzzle(pgn: &str) -> Result<PuzzleRecord, PgnError> {
    let mut reader = Reader::new(pgn.as_bytes());
    match reader.read_game(&mut PuzzleVisitor)? {
        Some(result) => result,
        None => Err(PgnError::NoGame),
    }
}

/// Parse every game of a (possibly multi-game) PGN file.
/// One entry per game; a broken game does not stop the rest from parsing.
pub fn parse_puzzles(text: &str) -> Vec<Result<PuzzleRecord, PgnError>> {
    let mut reader = Reader::new(text.as_bytes());
    let mut records = Vec::new();

    loop {
        match reader.read_game(&mut PuzzleVisitor) {
            Ok(Some(result)) => records.push(result),
            Ok(None) => break,
            Err(e) => {
                records.push(Err(PgnError::Io(e)));
                break;
            }
        }
    }

    tracing::debug!("Parsed {} games", records.len());
    records
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Tag values are quoted, so `\` and `"` are escaped.
fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Re-serialize a line as PGN with move numbers matching the start position.
fn render_pgn(metadata: &PuzzleMetadata, fen: &str, moves: &[String]) -> Result<String, PgnError> {
    let pos = position_from_fen(fen)?;

    let mut out = String::new();
    let mut tag = |name: &str, value: &str| {
        // Writing into a String cannot fail
        let _ = writeln!(out, "[{} \"{}\"]", name, escape_tag(value));
    };
    if let Some(ref event) = metadata.event {
        tag("Event", event);
    }
    if let Some(ref site) = metadata.site {
        tag("Site", site);
    }
    if let Some(ref id) = metadata.puzzle_id {
        tag("PuzzleId", id);
    }
    tag("Result", &metadata.result);
    if fen != STANDARD_START_FEN {
        tag("SetUp", "1");
        tag("FEN", fen);
    }
    if metadata.first_move_blunder {
        tag("FirstMoveBlunder", "1");
    }
    out.push('\n');

    let mut number = pos.fullmoves().get();
    let mut white_to_move = pos.turn().is_white();
    let mut tokens: Vec<String> = Vec::with_capacity(moves.len() + 1);

    for (i, san) in moves.iter().enumerate() {
        if white_to_move {
            tokens.push(format!("{}. {}", number, san));
        } else if i == 0 {
            tokens.push(format!("{}... {}", number, san));
        } else {
            tokens.push(san.clone());
        }
        if !white_to_move {
            number += 1;
        }
        white_to_move = !white_to_move;
    }
    tokens.push(metadata.result.clone());

    out.push_str(&tokens.join(" "));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATE_WITH_KNIGHT: &str = "[FEN \"5r2/2R2P1k/7p/4q3/7K/8/6Q1/8 w - - 0 1\"]\n\n1. Qg8+ Rxg8 2. f8=N+ Kh8 3. Rh7#";

    const EN_PASSANT_LINE: &str = "[FEN \"8/8/2pqp3/2Q2pkp/3P2p1/4P1P1/4KPP1/8 b - - 3 43\"]\n\n Qxc5 dxc5 Kf6 f4 gxf3+ Kxf3 Ke5 e4";

    #[test]
    fn test_parse_puzzle_with_fen() {
        let record = parse_puzzle(MATE_WITH_KNIGHT).unwrap();
        assert_eq!(record.fen, "5r2/2R2P1k/7p/4q3/7K/8/6Q1/8 w - - 0 1");
        assert_eq!(record.moves, vec!["Qg8+", "Rxg8", "f8=N+", "Kh8", "Rh7#"]);
        assert_eq!(record.uci, vec!["g2g8", "f8g8", "f7f8n", "h7h8", "c7h7"]);
        assert_eq!(record.metadata.result, "*");
        assert!(!record.metadata.first_move_blunder);
    }

    #[test]
    fn test_parse_movetext_without_numbers_black_to_move() {
        let record = parse_puzzle(EN_PASSANT_LINE).unwrap();
        assert_eq!(record.plies(), 8);
        assert_eq!(record.moves[4], "gxf3+");
        assert_eq!(record.uci[4], "g4f3");
        assert!(record.pgn.contains("43... Qxc5 44. dxc5 Kf6 45. f4 gxf3+"));
    }

    #[test]
    fn test_parse_standard_start_without_fen() {
        let record = parse_puzzle("1. e4 e5 2. Nf3 Nc6 1-0").unwrap();
        assert_eq!(record.fen, STANDARD_START_FEN);
        assert_eq!(record.moves, vec!["e4", "e5", "Nf3", "Nc6"]);
        assert!(!record.pgn.contains("[FEN"));
    }

    #[test]
    fn test_comments_and_variations_ignored() {
        let record = parse_puzzle("1. e4 {best by test} (1. d4 d5) 1... e5 *").unwrap();
        assert_eq!(record.moves, vec!["e4", "e5"]);
    }

    #[test]
    fn test_illegal_move_reports_ply() {
        let err = parse_puzzle("1. e4 e5 2. Ke3 *").unwrap_err();
        match err {
            PgnError::IllegalMove { ply, san } => {
                assert_eq!(ply, 2);
                assert_eq!(san, "Ke3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_solution_rejected() {
        let pgn = "[FEN \"k7/8/8/8/8/8/8/K7 w - - 0 1\"]\n\n*";
        assert!(matches!(parse_puzzle(pgn), Err(PgnError::EmptySolution)));
    }

    #[test]
    fn test_invalid_fen_rejected() {
        let pgn = "[FEN \"not a fen\"]\n\n1. e4 *";
        assert!(matches!(parse_puzzle(pgn), Err(PgnError::InvalidFen { .. })));
    }

    #[test]
    fn test_first_move_blunder_tag() {
        let pgn = format!("[FirstMoveBlunder \"1\"]\n{}", EN_PASSANT_LINE);
        let record = parse_puzzle(&pgn).unwrap();
        assert!(record.metadata.first_move_blunder);
        assert!(record.pgn.contains("[FirstMoveBlunder \"1\"]"));
    }

    #[test]
    fn test_parse_puzzles_multi_game() {
        let text = format!(
            "[PuzzleId \"a\"]\n{}\n\n[PuzzleId \"b\"]\n[FEN \"k7/8/8/8/8/8/8/K7 w - - 0 1\"]\n\n*\n\n[PuzzleId \"c\"]\n1. e4 *\n",
            MATE_WITH_KNIGHT
        );
        let results = parse_puzzles(&text);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().metadata.puzzle_id.as_deref(), Some("a"));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().moves, vec!["e4"]);
    }

    #[test]
    fn test_rendered_pgn_escapes_tag_values() {
        let pgn = format!(
            "[Event \"The \\\"Immortal\\\" \\\\ game\"]\n{}",
            MATE_WITH_KNIGHT
        );
        let record = parse_puzzle(&pgn).unwrap();
        assert_eq!(record.metadata.event.as_deref(), Some("The \"Immortal\" \\ game"));
        assert!(record.pgn.contains(r#"[Event "The \"Immortal\" \\ game"]"#));

        let again = parse_puzzle(&record.pgn).unwrap();
        assert_eq!(again.metadata.event, record.metadata.event);
        assert_eq!(again.uci, record.uci);
    }

    #[test]
    fn test_rendered_pgn_parses_back() {
        let record = parse_puzzle(MATE_WITH_KNIGHT).unwrap();
        let again = parse_puzzle(&record.pgn).unwrap();
        assert_eq!(again.uci, record.uci);
    }
}
