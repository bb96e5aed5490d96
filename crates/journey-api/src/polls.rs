use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use journey_types::api::{
    CreatePollRequest, CreatedResponse, GroupQuery, MessageResponse, VoteRequest,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::Caller;

pub async fn create_poll(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreatePollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let poll_id = blocking(move || state.polls.create_poll(&req, &caller.login)).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: poll_id.to_string(),
        }),
    ))
}

pub async fn list_polls(
    State(state): State<AppState>,
    Query(query): Query<GroupQuery>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let polls = blocking(move || state.polls.list_polls(&query.group_id, &caller.login)).await?;
    Ok(Json(polls))
}

pub async fn close_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Query(query): Query<GroupQuery>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.polls.close_poll(&poll_id, &query.group_id, &caller.login)).await?;
    Ok(Json(MessageResponse::new("poll was closed")))
}

pub async fn delete_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Query(query): Query<GroupQuery>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.polls.delete_poll(&poll_id, &query.group_id, &caller.login)).await?;
    Ok(Json(MessageResponse::new("poll was deleted")))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.polls.vote(&caller.login, &poll_id, &req)).await?;
    Ok(Json(MessageResponse::new("your vote was counted")))
}
