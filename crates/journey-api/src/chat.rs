use axum::{
    Extension,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::rejection::WebSocketUpgradeRejection,
    },
    response::{IntoResponse, Response},
};
use tracing::warn;

use journey_core::ServiceError;
use journey_gateway::handle_connection;
use journey_types::api::GroupQuery;
use journey_types::models::GroupId;

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::Caller;

/// GET /groups/ws?group_id=: membership is checked before the upgrade so a
/// stranger gets a plain 403 instead of a socket.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GroupQuery>,
    Extension(caller): Extension<Caller>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let group_id: GroupId = query
        .group_id
        .parse()
        .map_err(|_| ServiceError::InvalidInput("invalid group id".into()))?;

    let member = {
        let state = state.clone();
        let login = caller.login.clone();
        blocking(move || state.groups.is_member(&group_id, &login)).await?
    };
    if !member {
        warn!("{} tried to open chat of group {} without membership", caller.login, group_id);
        return Err(ServiceError::Forbidden("you are not a member of this group".into()).into());
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let hub = state.hub.clone();
    let chat = state.chat.clone();
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, hub, chat, caller.login, group_id)))
}
