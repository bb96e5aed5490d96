use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use journey_types::api::{
    CreateTaskRequest, CreatedResponse, GroupQuery, MessageResponse, UpdateTaskRequest,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::Caller;

pub async fn create_task(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task_id = blocking(move || state.tasks.create_task(&req, &caller.login)).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: task_id.to_string(),
        }),
    ))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<GroupQuery>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = blocking(move || state.tasks.list_tasks(&query.group_id, &caller.login)).await?;
    Ok(Json(tasks))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = blocking(move || state.tasks.update_task(&task_id, &caller.login, &req)).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<GroupQuery>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.tasks.delete_task(&task_id, &query.group_id, &caller.login)).await?;
    Ok(Json(MessageResponse::new("task was deleted")))
}
