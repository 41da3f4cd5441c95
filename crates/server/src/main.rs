use std::sync::Arc;

use server::config::Config;
use server::library::PuzzleLibrary;
use server::routes;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    tracing::info!("Loading puzzles from {}...", config.puzzle_dir);
    let library = Arc::new(PuzzleLibrary::load(&config.puzzle_dir)?);
    tracing::info!("{} puzzles ready", library.len());

    let app = routes::router(library, config.clone());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
