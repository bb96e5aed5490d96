//! Real-time group chat over websockets: one registry of live connections
//! plus the per-socket loop that feeds it.

pub mod connection;
pub mod hub;

pub use connection::handle_connection;
pub use hub::{ChatHub, Outbound};
