use serde::{Deserialize, Serialize};

use crate::models::{InviteId, PollId};

const MINUTES_PER_DAY: i64 = 24 * 60;
const MINUTES_PER_HOUR: i64 = 60;

// -- Auth --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    pub login: String,
    pub email: String,
    pub password: String,
}

/// `login` accepts either the account login or its email address.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInResponse {
    pub token: String,
}

// -- Common --

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    pub group_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Acknowledgement for mutations that return nothing else.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
}

/// Body for every endpoint that targets another user: invite, ban, unban,
/// leadership transfer.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberRequest {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationView {
    pub id: InviteId,
    pub text: String,
    pub link: String,
}

// -- Tasks --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartTime {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub start_time: String,
}

impl StartTime {
    /// Either part missing.
    pub fn is_empty(&self) -> bool {
        self.start_date.is_empty() || self.start_time.is_empty()
    }

    /// Both parts missing.
    pub fn is_fully_empty(&self) -> bool {
        self.start_date.is_empty() && self.start_time.is_empty()
    }

    pub fn is_missing_part(&self) -> bool {
        !self.is_fully_empty() && self.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DurationParts {
    #[serde(default)]
    pub days: i64,
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
}

impl DurationParts {
    /// Components that are all zero or negative count as "no duration given".
    pub fn is_empty(&self) -> bool {
        self.days <= 0 && self.hours <= 0 && self.minutes <= 0
    }

    /// `days*1440 + hours*60 + minutes`, or `None` on overflow.
    pub fn total_minutes(&self) -> Option<i64> {
        self.days
            .checked_mul(MINUTES_PER_DAY)?
            .checked_add(self.hours.checked_mul(MINUTES_PER_HOUR)?)?
            .checked_add(self.minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub group_id: String,
    pub title: String,
    #[serde(default)]
    pub start: StartTime,
    #[serde(default)]
    pub duration: DurationParts,
}

impl CreateTaskRequest {
    pub fn is_incomplete(&self) -> bool {
        self.title.trim().is_empty() || self.start.is_empty() || self.duration.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskRequest {
    pub group_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start: StartTime,
    #[serde(default)]
    pub duration: DurationParts,
}

impl UpdateTaskRequest {
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.start.is_fully_empty() && self.duration.is_empty()
    }
}

// -- Polls --

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePollRequest {
    pub group_id: String,
    pub title: String,
    pub first_option: String,
    pub second_option: String,
    /// Minutes until voting ends. Missing or zero means open indefinitely.
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteRequest {
    pub group_id: String,
    pub option: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSummary {
    pub id: PollId,
    pub title: String,
    pub creator: String,
    pub first_option: String,
    pub first_votes_count: usize,
    pub second_option: String,
    pub second_votes_count: usize,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollList {
    pub open: Vec<PollSummary>,
    pub closed: Vec<PollSummary>,
}
