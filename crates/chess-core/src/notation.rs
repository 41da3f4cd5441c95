//! Notation helpers: names, squares, FEN and board-widget destination maps.

use std::collections::BTreeMap;

use shakmaty::{
    fen::Fen, san::SanPlus, CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Role, Square,
};

use crate::pgn::PgnError;

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

/// Parse a role from its name ("queen") or letter ("q", "Q").
pub fn parse_role(s: &str) -> Option<Role> {
    match s.trim().to_ascii_lowercase().as_str() {
        "pawn" | "p" => Some(Role::Pawn),
        "knight" | "n" => Some(Role::Knight),
        "bishop" | "b" => Some(Role::Bishop),
        "rook" | "r" => Some(Role::Rook),
        "queen" | "q" => Some(Role::Queen),
        "king" | "k" => Some(Role::King),
        _ => None,
    }
}

pub fn parse_square(s: &str) -> Option<Square> {
    s.trim().parse().ok()
}

pub fn position_from_fen(fen: &str) -> Result<Chess, PgnError> {
    let parsed: Fen = fen.parse().map_err(|e: shakmaty::fen::ParseFenError| {
        PgnError::InvalidFen {
            fen: fen.to_string(),
            reason: e.to_string(),
        }
    })?;

    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| PgnError::IllegalPosition {
            fen: fen.to_string(),
            reason: e.to_string(),
        })
}

pub fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// SAN with its check/mate suffix.
pub fn san_with_suffix(pos: &Chess, mv: &Move) -> String {
    SanPlus::from_move(pos.clone(), mv.clone()).to_string()
}

/// Origin and destination as a board widget sees them: castling goes to the
/// king's final square.
pub fn move_squares(mv: &Move) -> Option<(Square, Square)> {
    match *mv {
        Move::Normal { from, to, .. } | Move::EnPassant { from, to } => Some((from, to)),
        Move::Castle { king, rook } => Some((king, castle_king_target(king, rook))),
        Move::Put { .. } => None,
    }
}

fn castle_king_target(king: Square, rook: Square) -> Square {
    let file = if rook.file() > king.file() { File::G } else { File::C };
    Square::from_coords(file, king.rank())
}

/// Legal destinations keyed by origin square, the shape a board widget wants.
/// Castling is listed both as the two-square king move and as king-onto-rook.
pub fn chessground_dests(pos: &Chess) -> BTreeMap<String, Vec<String>> {
    let mut dests: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for mv in pos.legal_moves() {
        let Some((from, to)) = move_squares(&mv) else {
            continue;
        };
        let entry = dests.entry(from.to_string()).or_default();
        push_unique(entry, to.to_string());

        if let Move::Castle { rook, .. } = mv {
            push_unique(entry, rook.to_string());
        }
    }

    for list in dests.values_mut() {
        list.sort();
    }
    dests
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// The square of the pawn removed by an en passant capture.
pub fn en_passant_capture_square(mv: &Move) -> Option<Square> {
    match *mv {
        Move::EnPassant { from, to } => Some(Square::from_coords(to.file(), from.rank())),
        _ => None,
    }
}

/// The king square of the side to move, if it is in check.
pub fn check_square(pos: &Chess) -> Option<Square> {
    if pos.is_check() {
        pos.board().king_of(pos.turn())
    } else {
        None
    }
}
