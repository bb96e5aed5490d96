//! Shared helpers for driving the router in tests.

#![allow(dead_code)]

use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use journey_api::{AppStateInner, router};
use journey_core::{InviteTokens, SessionTokens, UserService};
use journey_db::Database;

pub const PUBLIC_URL: &str = "http://journey.test";

/// Fresh state over in-memory SQLite, with cheap password hashing.
pub fn state() -> AppStateInner {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let sessions = SessionTokens::new("test-session-secret");
    let mut state = AppStateInner::new(
        db.clone(),
        sessions.clone(),
        InviteTokens::new("test-invite-secret"),
        PUBLIC_URL,
    );
    let cheap = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(1024, 1, 1, None).unwrap(),
    );
    state.users = UserService::new(db, sessions).with_hasher(cheap);
    state
}

pub fn app() -> Router {
    router(Arc::new(state()))
}

pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Signs up `login` and returns a session token.
pub async fn account(app: &Router, login: &str) -> String {
    let signup = json!({
        "login": login,
        "email": format!("{}@trip.io", login),
        "password": "hunter22",
    });
    let (status, _) = call(app, "POST", "/auth/sign-up", None, Some(signup)).await;
    assert_eq!(status, StatusCode::CREATED);

    let signin = json!({ "login": login, "password": "hunter22" });
    let (status, body) = call(app, "POST", "/auth/sign-in", None, Some(signin)).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// Creates a group led by the token's owner and returns its id.
pub async fn group(app: &Router, token: &str) -> String {
    let body = json!({ "name": "Alps 2030" });
    let (status, body) = call(app, "POST", "/groups", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

/// Path and query of the newest pending invitation link for `token`'s owner.
pub async fn invite_path(app: &Router, token: &str) -> String {
    let (status, invites) = call(app, "GET", "/groups/invites", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    let link = invites[0]["link"].as_str().unwrap();
    link.strip_prefix(PUBLIC_URL).unwrap().to_string()
}

/// `leader` invites `login`, who then redeems the link.
pub async fn invite_and_join(
    app: &Router,
    leader: &str,
    group_id: &str,
    login: &str,
    member: &str,
) {
    let uri = format!("/groups/{}/invites", group_id);
    let body = json!({ "login": login });
    let (status, _) = call(app, "POST", &uri, Some(leader), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let path = invite_path(app, member).await;
    let (status, _) = call(app, "GET", &path, None, None).await;
    assert_eq!(status, StatusCode::OK);
}
