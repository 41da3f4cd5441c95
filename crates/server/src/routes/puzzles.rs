use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use chess_core::notation::color_name;
use chess_core::{parse_puzzles, PuzzleRecord};
use puzzle_viewer::Puzzle;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::AppError;
use crate::library::PuzzleLibrary;

/// GET /api/puzzles
pub async fn list_puzzles(
    Extension(library): Extension<Arc<PuzzleLibrary>>,
) -> Json<JsonValue> {
    let puzzles = library.summaries();
    let total = puzzles.len();

    Json(json!({
        "puzzles": puzzles,
        "total": total,
    }))
}

/// GET /api/puzzles/{id}
pub async fn get_puzzle(
    Extension(library): Extension<Arc<PuzzleLibrary>>,
    Path(id): Path<String>,
) -> Result<Json<PuzzleRecord>, AppError> {
    library
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Puzzle {id} not found")))
}

#[derive(Deserialize)]
pub struct ParseRequest {
    pub pgn: String,
    #[serde(default)]
    pub first_move_blunder: bool,
}

#[derive(Serialize)]
pub struct ParsedPuzzle {
    #[serde(flatten)]
    pub record: PuzzleRecord,
    pub solver: &'static str,
}

/// POST /api/puzzles/parse
///
/// Checks a PGN before it is loaded into a viewer session. Only the first game
/// is considered.
pub async fn parse_pgn(Json(req): Json<ParseRequest>) -> Result<Json<ParsedPuzzle>, AppError> {
    if req.pgn.trim().is_empty() {
        return Err(AppError::BadRequest("PGN is empty".into()));
    }

    let mut record = parse_puzzles(&req.pgn)
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("No game found in PGN".into()))?
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    record.metadata.first_move_blunder |= req.first_move_blunder;
    let puzzle = Puzzle::from_record(&record)?;

    Ok(Json(ParsedPuzzle {
        solver: color_name(puzzle.solver()),
        record,
    }))
}
