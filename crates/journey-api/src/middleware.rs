use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use journey_core::ServiceError;

use crate::auth::AppState;
use crate::error::ApiError;

/// Identity of the authenticated caller, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct Caller {
    pub login: String,
}

/// Extract and validate the session token from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".into()))?;

    let login = state.users.authenticate(token.trim())?;

    req.extensions_mut().insert(Caller { login });
    Ok(next.run(req).await)
}
