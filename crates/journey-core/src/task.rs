use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use tracing::info;

use journey_types::api::{CreateTaskRequest, DurationParts, StartTime, UpdateTaskRequest};
use journey_types::models::{Group, GroupId, NewTask, Task, TaskId};

use crate::error::{ServiceError, internal, parse_id};
use crate::group::member_group;
use crate::repository::{GroupRepository, TaskRepository};

const START_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// `date` is `YYYY-MM-DD`, `time` is `HH:MM`, both UTC.
fn parse_start(start: &StartTime) -> Result<DateTime<Utc>, ServiceError> {
    let raw = format!("{}T{}:00Z", start.start_date.trim(), start.start_time.trim());
    NaiveDateTime::parse_from_str(&raw, START_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ServiceError::InvalidInput("invalid start date or time".into()))
}

fn future_start(start: &StartTime, now: DateTime<Utc>) -> Result<DateTime<Utc>, ServiceError> {
    let start = parse_start(start)?;
    if start <= now {
        return Err(ServiceError::InvalidInput("start time must be in the future".into()));
    }
    Ok(start)
}

fn minutes(duration: &DurationParts) -> Result<i64, ServiceError> {
    match duration.total_minutes() {
        Some(total) if total > 0 => Ok(total),
        _ => Err(ServiceError::InvalidInput("invalid duration".into())),
    }
}

fn end_of(start: DateTime<Utc>, duration: i64) -> Result<DateTime<Utc>, ServiceError> {
    TimeDelta::try_minutes(duration)
        .and_then(|delta| start.checked_add_signed(delta))
        .ok_or_else(|| ServiceError::InvalidInput("invalid duration".into()))
}

/// Task scheduling inside a group. Only the leader edits the schedule;
/// any member can read it.
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    groups: Arc<dyn GroupRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, groups: Arc<dyn GroupRepository>) -> Self {
        Self { tasks, groups }
    }

    fn led_group(&self, raw_group_id: &str, login: &str) -> Result<Group, ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        let group = member_group(self.groups.as_ref(), &group_id, login)?;
        if !group.is_leader(login) {
            return Err(ServiceError::no_permission());
        }
        Ok(group)
    }

    /// Conflict naming the first task in the group that intersects
    /// `[start, end)`, ignoring `skip`.
    fn check_overlap(
        &self,
        group_id: &GroupId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        skip: Option<&TaskId>,
    ) -> Result<(), ServiceError> {
        let existing = self
            .tasks
            .list_tasks(group_id)
            .map_err(internal("failed to check task schedule"))?;
        if let Some(clash) = existing
            .iter()
            .filter(|t| Some(&t.id) != skip)
            .find(|t| t.overlaps(start, end))
        {
            return Err(ServiceError::Conflict(format!(
                "task overlaps with an existing task: {}",
                clash.title
            )));
        }
        Ok(())
    }

    pub fn create_task(
        &self,
        req: &CreateTaskRequest,
        login: &str,
    ) -> Result<TaskId, ServiceError> {
        if req.is_incomplete() {
            return Err(ServiceError::InvalidInput(
                "title, start date, start time and duration are required".into(),
            ));
        }
        let group = self.led_group(&req.group_id, login)?;

        let start = future_start(&req.start, Utc::now())?;
        let duration = minutes(&req.duration)?;
        let end = end_of(start, duration)?;
        self.check_overlap(&group.id, start, end, None)?;

        let task_id = self
            .tasks
            .add_task(&NewTask {
                group_id: group.id,
                title: req.title.trim().to_string(),
                start_time: start,
                duration,
                end_time: end,
            })
            .map_err(internal("failed to create task"))?;

        info!("user {} scheduled task {} in group {}", login, task_id, group.id);
        Ok(task_id)
    }

    pub fn update_task(
        &self,
        raw_task_id: &str,
        login: &str,
        req: &UpdateTaskRequest,
    ) -> Result<Task, ServiceError> {
        if req.is_empty() {
            return Err(ServiceError::InvalidInput("no new details".into()));
        }
        if req.start.is_missing_part() {
            return Err(ServiceError::InvalidInput(
                "both start date and start time are required".into(),
            ));
        }
        let task_id: TaskId = parse_id(raw_task_id, "task")?;
        let group = self.led_group(&req.group_id, login)?;

        let mut task = self
            .tasks
            .get_task(&task_id, &group.id)
            .map_err(internal("failed to load task"))?
            .ok_or_else(|| ServiceError::NotFound("task was not found".into()))?;

        if !req.start.is_fully_empty() {
            task.start_time = future_start(&req.start, Utc::now())?;
        }
        if !req.duration.is_empty() {
            task.duration = minutes(&req.duration)?;
        }
        task.end_time = end_of(task.start_time, task.duration)?;
        let title = req.title.trim();
        if !title.is_empty() {
            task.title = title.to_string();
        }

        self.check_overlap(&group.id, task.start_time, task.end_time, Some(&task.id))?;
        self.tasks
            .update_task(&task)
            .map_err(internal("failed to update task"))?;

        info!("user {} updated task {}", login, task.id);
        Ok(task)
    }

    pub fn delete_task(
        &self,
        raw_task_id: &str,
        raw_group_id: &str,
        login: &str,
    ) -> Result<(), ServiceError> {
        let task_id: TaskId = parse_id(raw_task_id, "task")?;
        let group = self.led_group(raw_group_id, login)?;
        let removed = self
            .tasks
            .delete_task(&task_id, &group.id)
            .map_err(internal("failed to delete task"))?;
        if removed == 0 {
            return Err(ServiceError::NotFound("task was not found".into()));
        }
        info!("user {} deleted task {}", login, task_id);
        Ok(())
    }

    pub fn list_tasks(&self, raw_group_id: &str, login: &str) -> Result<Vec<Task>, ServiceError> {
        let group_id = parse_id(raw_group_id, "group")?;
        member_group(self.groups.as_ref(), &group_id, login)?;
        let mut tasks = self
            .tasks
            .list_tasks(&group_id)
            .map_err(internal("failed to load tasks"))?;
        tasks.sort_by_key(|t| t.start_time);
        Ok(tasks)
    }
}
