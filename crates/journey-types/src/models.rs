use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

entity_id!(UserId);
entity_id!(GroupId);
entity_id!(InviteId);
entity_id!(TaskId);
entity_id!(PollId);
entity_id!(MessageId);

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to persist a freshly registered user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub leader_login: String,
    pub members: Vec<String>,
    #[serde(skip_serializing)]
    pub is_active: bool,
}

impl Group {
    pub fn is_member(&self, login: &str) -> bool {
        self.members.iter().any(|m| m == login)
    }

    pub fn is_leader(&self, login: &str) -> bool {
        self.leader_login == login
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
    pub members_count: usize,
}

impl From<&Group> for GroupSummary {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            members_count: group.members.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Blacklist {
    pub group_id: GroupId,
    pub logins: Vec<String>,
}

impl Blacklist {
    pub fn contains(&self, login: &str) -> bool {
        self.logins.iter().any(|l| l == login)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Invitation {
    pub id: InviteId,
    pub sender: String,
    pub receiver: String,
    pub group_id: GroupId,
    /// Group name at the time the invitation was sent.
    pub group_name: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub sender: String,
    pub receiver: String,
    pub group_id: GroupId,
    pub group_name: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub group_id: GroupId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    /// Total length in minutes.
    pub duration: i64,
    pub end_time: DateTime<Utc>,
}

impl Task {
    /// Half-open interval test: `[start_time, end_time)` against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.end_time > start && self.start_time < end
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub group_id: GroupId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub duration: i64,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollOption {
    #[serde(rename = "firstOption")]
    First,
    #[serde(rename = "secondOption")]
    Second,
}

impl PollOption {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "firstOption",
            Self::Second => "secondOption",
        }
    }
}

impl FromStr for PollOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firstOption" => Ok(Self::First),
            "secondOption" => Ok(Self::Second),
            other => Err(format!("invalid vote option '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Poll {
    pub id: PollId,
    pub group_id: GroupId,
    pub creator: String,
    pub title: String,
    pub first_option: String,
    pub first_votes: Vec<String>,
    pub second_option: String,
    pub second_votes: Vec<String>,
    pub end_time: DateTime<Utc>,
    pub is_early_closed: bool,
}

impl Poll {
    /// A poll is terminal once it was closed early or its end time has passed.
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.is_early_closed || self.end_time <= now
    }

    pub fn voters(&self, option: PollOption) -> &[String] {
        match option {
            PollOption::First => &self.first_votes,
            PollOption::Second => &self.second_votes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub group_id: GroupId,
    pub creator: String,
    pub title: String,
    pub first_option: String,
    pub second_option: String,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub group_id: GroupId,
    pub author: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}
