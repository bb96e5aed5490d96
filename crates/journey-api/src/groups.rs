use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use journey_types::api::{
    CreateGroupRequest, CreatedResponse, MemberRequest, MessageResponse, TokenQuery,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::Caller;

pub async fn create_group(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group_id = blocking(move || state.groups.create_group(&req.name, &caller.login)).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: group_id.to_string(),
        }),
    ))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let groups = blocking(move || state.groups.list_groups(&caller.login)).await?;
    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let group = blocking(move || state.groups.get_group(&group_id, &caller.login)).await?;
    Ok(Json(group))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.groups.delete_group(&group_id, &caller.login)).await?;
    Ok(Json(MessageResponse::new("group was deleted")))
}

pub async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.groups.leave_group(&group_id, &caller.login)).await?;
    Ok(Json(MessageResponse::new("you left the group")))
}

pub async fn give_leader_role(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<MemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.groups.give_leader_role(&group_id, &caller.login, &req.login)).await?;
    Ok(Json(MessageResponse::new("leader role was given")))
}

pub async fn invite_user(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<MemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invite_id =
        blocking(move || state.groups.invite_user(&group_id, &caller.login, &req.login)).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: invite_id.to_string(),
        }),
    ))
}

pub async fn get_blacklist(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let banned = blocking(move || state.groups.get_blacklist(&group_id, &caller.login)).await?;
    Ok(Json(banned))
}

pub async fn ban_member(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<MemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.groups.ban_member(&group_id, &req.login, &caller.login)).await?;
    Ok(Json(MessageResponse::new("user was banned")))
}

pub async fn unban_member(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<MemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.groups.unban_member(&group_id, &req.login, &caller.login)).await?;
    Ok(Json(MessageResponse::new("user was unbanned")))
}

pub async fn list_invites(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let invites = blocking(move || state.groups.list_invites(&caller.login)).await?;
    Ok(Json(invites))
}

pub async fn decline_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<String>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(move || state.groups.decline_invite(&caller.login, &invite_id)).await?;
    Ok(Json(MessageResponse::new("invite was declined")))
}

/// Public: the invitation token itself is the credential.
pub async fn join_group(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let group_id = blocking(move || state.groups.join_group(&query.token)).await?;
    Ok(Json(CreatedResponse {
        id: group_id.to_string(),
    }))
}
