use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

use journey_types::api::{CreatePollRequest, PollList, PollSummary, VoteRequest};
use journey_types::models::{Group, NewPoll, Poll, PollId, PollOption};

use crate::error::{ServiceError, internal, parse_id};
use crate::group::member_group;
use crate::repository::{GroupRepository, PollRepository};

/// Voting window used when none is given: roughly thirty years.
pub const NO_DURATION_MINUTES: i64 = 15_770_000;

const END_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn summarize(poll: &Poll) -> PollSummary {
    PollSummary {
        id: poll.id,
        title: poll.title.clone(),
        creator: poll.creator.clone(),
        first_option: poll.first_option.clone(),
        first_votes_count: poll.first_votes.len(),
        second_option: poll.second_option.clone(),
        second_votes_count: poll.second_votes.len(),
        end_time: poll.end_time.format(END_TIME_FORMAT).to_string(),
    }
}

fn poll_end(now: DateTime<Utc>, duration: Option<u64>) -> Result<DateTime<Utc>, ServiceError> {
    let minutes = match duration {
        None | Some(0) => NO_DURATION_MINUTES,
        Some(m) => i64::try_from(m)
            .map_err(|_| ServiceError::InvalidInput("invalid duration".into()))?,
    };
    TimeDelta::try_minutes(minutes)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| ServiceError::InvalidInput("invalid duration".into()))
}

/// Two-option polls scoped to a group.
pub struct PollService {
    polls: Arc<dyn PollRepository>,
    groups: Arc<dyn GroupRepository>,
}

impl PollService {
    pub fn new(polls: Arc<dyn PollRepository>, groups: Arc<dyn GroupRepository>) -> Self {
        Self { polls, groups }
    }

    fn group_for(&self, raw_group_id: &str, login: &str) -> Result<Group, ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        member_group(self.groups.as_ref(), &group_id, login)
    }

    fn load(&self, poll_id: &PollId, group: &Group) -> Result<Poll, ServiceError> {
        self.polls
            .get_poll(poll_id, &group.id)
            .map_err(internal("failed to load poll"))?
            .ok_or_else(|| ServiceError::NotFound("poll was not found".into()))
    }

    pub fn create_poll(
        &self,
        req: &CreatePollRequest,
        login: &str,
    ) -> Result<PollId, ServiceError> {
        let title = req.title.trim();
        let first = req.first_option.trim();
        let second = req.second_option.trim();
        if title.is_empty() || first.is_empty() || second.is_empty() {
            return Err(ServiceError::InvalidInput(
                "title and both options are required".into(),
            ));
        }
        let group = self.group_for(&req.group_id, login)?;
        let end_time = poll_end(Utc::now(), req.duration)?;

        let poll_id = self
            .polls
            .create_poll(&NewPoll {
                group_id: group.id,
                creator: login.to_string(),
                title: title.to_string(),
                first_option: first.to_string(),
                second_option: second.to_string(),
                end_time,
            })
            .map_err(internal("failed to create poll"))?;

        info!("user {} opened poll {} in group {}", login, poll_id, group.id);
        Ok(poll_id)
    }

    pub fn list_polls(&self, raw_group_id: &str, login: &str) -> Result<PollList, ServiceError> {
        let group = self.group_for(raw_group_id, login)?;
        let polls = self
            .polls
            .list_polls(&group.id)
            .map_err(internal("failed to load polls"))?;

        let now = Utc::now();
        let (closed, open): (Vec<&Poll>, Vec<&Poll>) = polls.iter().partition(|p| p.is_closed(now));
        Ok(PollList {
            open: open.into_iter().map(summarize).collect(),
            closed: closed.into_iter().map(summarize).collect(),
        })
    }

    pub fn close_poll(
        &self,
        raw_poll_id: &str,
        raw_group_id: &str,
        login: &str,
    ) -> Result<(), ServiceError> {
        let poll_id: PollId = parse_id(raw_poll_id, "poll")?;
        let group = self.group_for(raw_group_id, login)?;
        let poll = self.load(&poll_id, &group)?;

        if poll.is_closed(Utc::now()) {
            return Err(ServiceError::Conflict("poll is already closed".into()));
        }
        if !group.is_leader(login) && poll.creator != login {
            return Err(ServiceError::no_permission());
        }

        let modified = self
            .polls
            .close_poll(&poll_id)
            .map_err(internal("failed to close poll"))?;
        if modified == 0 {
            return Err(ServiceError::Conflict("poll is already closed".into()));
        }
        info!("user {} closed poll {}", login, poll_id);
        Ok(())
    }

    pub fn delete_poll(
        &self,
        raw_poll_id: &str,
        raw_group_id: &str,
        login: &str,
    ) -> Result<(), ServiceError> {
        let poll_id: PollId = parse_id(raw_poll_id, "poll")?;
        let group = self.group_for(raw_group_id, login)?;
        let poll = self.load(&poll_id, &group)?;
        if !group.is_leader(login) && poll.creator != login {
            return Err(ServiceError::no_permission());
        }

        let removed = self
            .polls
            .delete_poll(&poll_id)
            .map_err(internal("failed to delete poll"))?;
        if removed == 0 {
            return Err(ServiceError::NotFound("poll was not found".into()));
        }
        info!("user {} deleted poll {}", login, poll_id);
        Ok(())
    }

    /// Moves the caller's single vote to `req.option`.
    pub fn vote(
        &self,
        login: &str,
        raw_poll_id: &str,
        req: &VoteRequest,
    ) -> Result<(), ServiceError> {
        let option: PollOption = req.option.parse().map_err(ServiceError::InvalidInput)?;
        let poll_id: PollId = parse_id(raw_poll_id, "poll")?;
        let group = self.group_for(&req.group_id, login)?;
        let poll = self.load(&poll_id, &group)?;

        let now = Utc::now();
        if poll.is_closed(now) {
            return Err(ServiceError::Conflict("poll is closed".into()));
        }

        let cast = self
            .polls
            .cast_vote(&poll_id, option, login, now)
            .map_err(internal("failed to vote"))?;
        // Closed between the check and the write; the earlier vote stands.
        if cast == 0 {
            return Err(ServiceError::Conflict("poll is closed".into()));
        }

        info!("user {} voted {} in poll {}", login, option.as_str(), poll_id);
        Ok(())
    }
}
