//! Two independent signed capabilities: session tokens prove who the caller
//! is, invitation tokens grant one login the right to join one group.
//!
//! They use separate secrets, separate claim types and separate audiences,
//! so a token of one kind never verifies as the other.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use journey_types::models::GroupId;

const SESSION_AUDIENCE: &str = "journey-session";
const INVITE_AUDIENCE: &str = "journey-invite";

pub const SESSION_TTL_HOURS: i64 = 24;
pub const INVITE_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(e),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Caller login.
    pub sub: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteClaims {
    pub login: String,
    pub group_id: String,
    /// Random per issue, so re-inviting within the same second still yields
    /// a distinct token.
    pub jti: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

fn validation(audience: &str, required: &[&str]) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(required);
    validation
}

fn window(ttl: Duration) -> (usize, usize) {
    let now = Utc::now();
    (now.timestamp() as usize, (now + ttl).timestamp() as usize)
}

#[derive(Clone)]
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionTokens {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(SESSION_TTL_HOURS),
        }
    }

    #[cfg(test)]
    fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, login: &str) -> Result<String, TokenError> {
        let (iat, exp) = window(self.ttl);
        let claims = SessionClaims {
            sub: login.to_string(),
            aud: SESSION_AUDIENCE.to_string(),
            iat,
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Sign)
    }

    /// Checks signature, audience and expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(
            token,
            &self.decoding,
            &validation(SESSION_AUDIENCE, &["exp", "sub", "aud"]),
        )?;
        Ok(data.claims)
    }
}

#[derive(Clone)]
pub struct InviteTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl InviteTokens {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(INVITE_TTL_HOURS),
        }
    }

    #[cfg(test)]
    fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, login: &str, group_id: &GroupId) -> Result<String, TokenError> {
        let (iat, exp) = window(self.ttl);
        let claims = InviteClaims {
            login: login.to_string(),
            group_id: group_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            aud: INVITE_AUDIENCE.to_string(),
            iat,
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Sign)
    }

    pub fn verify(&self, token: &str) -> Result<InviteClaims, TokenError> {
        let data = decode::<InviteClaims>(
            token,
            &self.decoding,
            &validation(INVITE_AUDIENCE, &["exp", "aud"]),
        )?;
        Ok(data.claims)
    }
}
