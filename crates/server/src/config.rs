use std::env;
use std::time::Duration;

use puzzle_viewer::SessionConfig;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub puzzle_dir: String,
    pub opponent_delay_ms: u64,
    pub take_back_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            puzzle_dir: env::var("PUZZLE_DIR").unwrap_or_else(|_| "puzzles".to_string()),
            opponent_delay_ms: env::var("OPPONENT_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            take_back_delay_ms: env::var("TAKE_BACK_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            opponent_delay: Duration::from_millis(self.opponent_delay_ms),
            take_back_delay: Duration::from_millis(self.take_back_delay_ms),
        }
    }
}
