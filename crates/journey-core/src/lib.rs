//! Domain services for journey: group lifecycle, task scheduling, polls,
//! chat history and user accounts.
//!
//! Services depend only on the repository traits in [`repository`]; the
//! SQLite implementation lives in `journey-db` so this crate stays free of
//! any storage engine.

pub mod chat;
pub mod error;
pub mod group;
pub mod poll;
pub mod repository;
pub mod task;
pub mod tokens;
pub mod user;

#[cfg(test)]
mod memory;

pub use chat::ChatService;
pub use error::ServiceError;
pub use group::{DisconnectNotifier, GroupRepos, GroupService};
pub use poll::PollService;
pub use repository::StoreError;
pub use task::TaskService;
pub use tokens::{InviteTokens, SessionTokens};
pub use user::UserService;
