#![allow(dead_code)]

use std::sync::Arc;

use reqwest::Client;
use server::config::Config;
use server::library::PuzzleLibrary;

/// Build a reqwest client for tests.
pub fn client() -> Client {
    Client::new()
}

/// Serve the demo library on an ephemeral port and return its base URL.
pub async fn spawn_server() -> String {
    let config = Config {
        host: "127.0.0.1".into(),
        port: 0,
        puzzle_dir: String::new(),
        opponent_delay_ms: 5,
        take_back_delay_ms: 5,
    };
    let app = server::routes::router(Arc::new(PuzzleLibrary::demo()), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });

    format!("http://{}", addr)
}

/// WebSocket URL of the viewer route for a server started by `spawn_server`.
pub fn ws_url(base: &str) -> String {
    format!("{}/ws/viewer", base.replacen("http://", "ws://", 1))
}
