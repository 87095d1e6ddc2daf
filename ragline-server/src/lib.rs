//! `ragline-server` exposes a ragline pipeline over HTTP.
//! It answers questions with `POST /query` and reports index status on
//! `GET /health` and `GET /documents`.

pub mod protocol;
pub mod server;

pub use server::{AppState, ServerConfig, app_router, initialize, run_server};
