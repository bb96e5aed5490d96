//! Types shared by every journey crate: domain entities, typed identifiers
//! and the JSON shapes of the HTTP API.

pub mod api;
pub mod models;
