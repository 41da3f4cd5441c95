use std::sync::Arc;

use axum::{Extension, Json};
use serde_json::{json, Value as JsonValue};

use crate::library::PuzzleLibrary;

/// GET /health
pub async fn health_check(Extension(library): Extension<Arc<PuzzleLibrary>>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "puzzles": library.len(),
    }))
}
