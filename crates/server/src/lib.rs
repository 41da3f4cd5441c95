pub mod config;
pub mod error;
pub mod library;
pub mod routes;
