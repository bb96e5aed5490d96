use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use journey_core::repository::{
    BlacklistRepository, ChatRepository, GroupRepository, InviteRepository, PollRepository,
    TaskRepository, UserRepository,
};
use journey_core::{
    ChatService, GroupRepos, GroupService, InviteTokens, PollService, SessionTokens, TaskService,
    UserService,
};
use journey_gateway::ChatHub;
use journey_types::api::{CreatedResponse, SignInRequest, SignInResponse, SignUpRequest};

use crate::error::{ApiError, blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub users: UserService,
    pub groups: GroupService,
    pub tasks: TaskService,
    pub polls: PollService,
    pub chat: Arc<ChatService>,
    pub hub: ChatHub,
}

impl AppStateInner {
    /// Wires every service to one store. The chat hub doubles as the group
    /// service's disconnect notifier.
    pub fn new<S>(
        store: Arc<S>,
        sessions: SessionTokens,
        invites: InviteTokens,
        public_url: &str,
    ) -> Self
    where
        S: UserRepository
            + GroupRepository
            + BlacklistRepository
            + InviteRepository
            + TaskRepository
            + PollRepository
            + ChatRepository
            + 'static,
    {
        let hub = ChatHub::new();
        let repos = GroupRepos {
            groups: store.clone(),
            users: store.clone(),
            invites: store.clone(),
            blacklists: store.clone(),
        };

        Self {
            users: UserService::new(store.clone(), sessions),
            groups: GroupService::new(repos, invites, Arc::new(hub.clone()))
                .with_public_url(public_url),
            tasks: TaskService::new(store.clone(), store.clone()),
            polls: PollService::new(store.clone(), store.clone()),
            chat: Arc::new(ChatService::new(store)),
            hub,
        }
    }
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = blocking(move || state.users.register(&req)).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: user_id.to_string(),
        }),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = blocking(move || state.users.login(&req.login, &req.password)).await?;
    Ok(Json(SignInResponse { token }))
}
