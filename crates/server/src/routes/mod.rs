pub mod health;
pub mod puzzles;
pub mod viewer_ws;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::library::PuzzleLibrary;

pub fn router(library: Arc<PuzzleLibrary>, config: Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        // Puzzles: specific routes before parameterized
        .route("/api/puzzles", get(puzzles::list_puzzles))
        .route("/api/puzzles/parse", post(puzzles::parse_pgn))
        .route("/api/puzzles/{id}", get(puzzles::get_puzzle))
        .route("/ws/viewer", get(viewer_ws::ws_handler))
        .layer(Extension(library))
        .layer(Extension(config))
        .layer(CompressionLayer::new())
        .layer(cors)
}
