//! HTTP server implementation
//!
//! Actix-web application exposing the webhook API.

pub mod middleware;
pub mod routes;

pub mod builder;
pub mod server;
pub mod state;

pub use server::HttpServer;
pub use state::AppState;
