//! Storage seams the services call through.
//!
//! Every method is one conditional statement against the store; the services
//! never hold a lock across calls. Counts returned from update-style methods
//! are the number of rows the condition matched.

use chrono::{DateTime, Utc};
use thiserror::Error;

use journey_types::models::{
    Blacklist, Group, GroupId, Invitation, InviteId, Message, NewInvitation, NewPoll, NewTask,
    NewUser, Poll, PollId, PollOption, Task, TaskId, User, UserId,
};

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait UserRepository: Send + Sync {
    fn create_user(&self, user: &NewUser) -> Result<UserId, StoreError>;
    fn get_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

pub trait GroupRepository: Send + Sync {
    /// Inserts an active group whose only member is its leader.
    fn create_group(&self, name: &str, leader_login: &str) -> Result<GroupId, StoreError>;
    /// Active groups the login belongs to.
    fn list_groups_for_member(&self, login: &str) -> Result<Vec<Group>, StoreError>;
    /// The group if it exists and is active.
    fn get_active_group(&self, group_id: &GroupId) -> Result<Option<Group>, StoreError>;
    fn change_leader(&self, group_id: &GroupId, new_leader: &str) -> Result<(), StoreError>;
    fn add_member(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError>;
    fn remove_member(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError>;
    fn deactivate(&self, group_id: &GroupId) -> Result<(), StoreError>;
}

pub trait BlacklistRepository: Send + Sync {
    fn create_blacklist(&self, group_id: &GroupId) -> Result<(), StoreError>;
    /// `StoreError::NotFound` when the group has no blacklist record.
    fn get_blacklist(&self, group_id: &GroupId) -> Result<Blacklist, StoreError>;
    fn ban(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError>;
    fn unban(&self, group_id: &GroupId, login: &str) -> Result<(), StoreError>;
}

pub trait InviteRepository: Send + Sync {
    fn add_invitation(&self, invite: &NewInvitation) -> Result<InviteId, StoreError>;
    /// Unused invitations addressed to `receiver`.
    fn list_pending(&self, receiver: &str) -> Result<Vec<Invitation>, StoreError>;
    fn has_pending(&self, group_id: &GroupId, receiver: &str) -> Result<bool, StoreError>;
    fn get_pending_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError>;
    fn mark_used_by_token(&self, token: &str) -> Result<u64, StoreError>;
    /// Only matches an unused invitation owned by `receiver`.
    fn mark_used_by_id(&self, invite_id: &InviteId, receiver: &str) -> Result<u64, StoreError>;
}

pub trait TaskRepository: Send + Sync {
    fn add_task(&self, task: &NewTask) -> Result<TaskId, StoreError>;
    fn list_tasks(&self, group_id: &GroupId) -> Result<Vec<Task>, StoreError>;
    fn get_task(&self, task_id: &TaskId, group_id: &GroupId) -> Result<Option<Task>, StoreError>;
    fn update_task(&self, task: &Task) -> Result<(), StoreError>;
    fn delete_task(&self, task_id: &TaskId, group_id: &GroupId) -> Result<u64, StoreError>;
}

pub trait PollRepository: Send + Sync {
    fn create_poll(&self, poll: &NewPoll) -> Result<PollId, StoreError>;
    fn list_polls(&self, group_id: &GroupId) -> Result<Vec<Poll>, StoreError>;
    fn get_poll(&self, poll_id: &PollId, group_id: &GroupId) -> Result<Option<Poll>, StoreError>;
    /// Sets the early-closed flag if it is not set yet.
    fn close_poll(&self, poll_id: &PollId) -> Result<u64, StoreError>;
    fn delete_poll(&self, poll_id: &PollId) -> Result<u64, StoreError>;
    /// Drops `login` from both voter sets and adds it to `option`'s set as
    /// one unit, only while the poll is open at `now`. Zero means the poll
    /// was closed or gone and nothing changed.
    fn cast_vote(
        &self,
        poll_id: &PollId,
        option: PollOption,
        login: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

pub trait ChatRepository: Send + Sync {
    fn insert_message(&self, message: &Message) -> Result<(), StoreError>;
    /// Oldest first.
    fn messages_for_group(&self, group_id: &GroupId) -> Result<Vec<Message>, StoreError>;
}
