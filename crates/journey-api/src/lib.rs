//! HTTP delivery layer: axum handlers over the journey services.

pub mod auth;
pub mod chat;
pub mod error;
pub mod groups;
pub mod middleware;
pub mod polls;
pub mod routes;
pub mod tasks;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
