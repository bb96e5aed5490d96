use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};

use journey_types::api::MessageResponse;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{chat, groups, polls, tasks};

async fn health() -> Json<MessageResponse> {
    Json(MessageResponse::new("ok"))
}

/// The full HTTP surface. Everything except sign-up, sign-in, invitation
/// redemption and the health check requires a session token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/join-group", get(groups::join_group))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/groups", post(groups::create_group).get(groups::list_groups))
        .route("/groups/invites", get(groups::list_invites))
        .route("/groups/invites/{invite_id}/decline", post(groups::decline_invite))
        .route("/groups/ws", get(chat::ws_upgrade))
        .route(
            "/groups/{group_id}",
            get(groups::get_group).delete(groups::delete_group),
        )
        .route("/groups/{group_id}/leave", post(groups::leave_group))
        .route("/groups/{group_id}/leader", put(groups::give_leader_role))
        .route("/groups/{group_id}/invites", post(groups::invite_user))
        .route("/groups/{group_id}/blacklist", get(groups::get_blacklist))
        .route("/groups/{group_id}/ban", put(groups::ban_member))
        .route("/groups/{group_id}/unban", put(groups::unban_member))
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route(
            "/tasks/{task_id}",
            put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/polls", post(polls::create_poll).get(polls::list_polls))
        .route("/polls/{poll_id}", axum::routing::delete(polls::delete_poll))
        .route("/polls/{poll_id}/close", put(polls::close_poll))
        .route("/polls/{poll_id}/vote", put(polls::vote))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
