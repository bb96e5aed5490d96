use std::sync::{Arc, LazyLock};

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use regex::Regex;
use tracing::{error, info, warn};

use journey_types::api::SignUpRequest;
use journey_types::models::{NewUser, UserId};

use crate::error::{ServiceError, internal};
use crate::repository::{StoreError, UserRepository};
use crate::tokens::SessionTokens;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

const LOGIN_LEN: (usize, usize) = (6, 15);
const EMAIL_LEN: (usize, usize) = (6, 20);
const PASSWORD_LEN: (usize, usize) = (6, 30);

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), ServiceError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ServiceError::InvalidInput(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

/// Registration, sign-in and session verification.
pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: SessionTokens,
    hasher: Argon2<'static>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, sessions: SessionTokens) -> Self {
        Self {
            users,
            sessions,
            hasher: Argon2::default(),
        }
    }

    /// Swap the password hasher, e.g. for cheaper parameters in tests.
    pub fn with_hasher(mut self, hasher: Argon2<'static>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn register(&self, req: &SignUpRequest) -> Result<UserId, ServiceError> {
        let login = req.login.trim();
        let email = req.email.trim();
        check_len("login", login, LOGIN_LEN)?;
        check_len("email", email, EMAIL_LEN)?;
        check_len("password", &req.password, PASSWORD_LEN)?;
        if !is_valid_email(email) {
            return Err(ServiceError::InvalidInput("invalid email".into()));
        }

        if self
            .users
            .get_user_by_login(login)
            .map_err(internal("failed to register user"))?
            .is_some()
        {
            return Err(ServiceError::Conflict("this login is already registered".into()));
        }
        if self
            .users
            .get_user_by_email(email)
            .map_err(internal("failed to register user"))?
            .is_some()
        {
            return Err(ServiceError::Conflict("this email is already registered".into()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .hasher
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| {
                error!("password hashing failed: {}", e);
                ServiceError::Internal(
                    "unfortunately we were unable to process your request, please try again later"
                        .into(),
                )
            })?
            .to_string();

        let id = self
            .users
            .create_user(&NewUser {
                login: login.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                StoreError::AlreadyExists => {
                    ServiceError::Conflict("this login or email is already registered".into())
                }
                other => internal("failed to register user")(other),
            })?;

        info!("registered user {}", login);
        Ok(id)
    }

    /// `login_or_email` is treated as an email when it looks like one.
    pub fn login(&self, login_or_email: &str, password: &str) -> Result<String, ServiceError> {
        let option = login_or_email.trim();
        let user = if is_valid_email(option) {
            self.users.get_user_by_email(option)
        } else {
            self.users.get_user_by_login(option)
        }
        .map_err(internal("failed to sign in"))?
        .ok_or(ServiceError::InvalidCredentials)?;

        let parsed = PasswordHash::new(&user.password_hash).map_err(|e| {
            error!("stored hash for {} is unreadable: {}", user.login, e);
            ServiceError::Internal("failed to sign in".into())
        })?;
        if self
            .hasher
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            warn!("wrong password for {}", user.login);
            return Err(ServiceError::InvalidCredentials);
        }

        self.sessions.issue(&user.login).map_err(|e| {
            error!("failed to issue session token: {}", e);
            ServiceError::Internal("failed to sign in".into())
        })
    }

    /// Resolves a bearer token to the caller's login.
    pub fn authenticate(&self, token: &str) -> Result<String, ServiceError> {
        self.sessions
            .verify(token)
            .map(|claims| claims.sub)
            .map_err(|e| {
                warn!("rejected session token: {}", e);
                ServiceError::Unauthorized("invalid or expired token".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use argon2::{Algorithm, Params, Version};

    fn service() -> UserService {
        let store = Arc::new(MemoryStore::default());
        let cheap = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(1024, 1, 1, None).unwrap(),
        );
        UserService::new(store, SessionTokens::new("test-session")).with_hasher(cheap)
    }

    fn sign_up(login: &str, email: &str) -> SignUpRequest {
        SignUpRequest {
            login: login.into(),
            email: email.into(),
            password: "hunter22".into(),
        }
    }

    #[test]
    fn register_then_login_by_login_and_email() {
        let svc = service();
        svc.register(&sign_up("wanderer", "wand@trip.io")).unwrap();

        let token = svc.login("wanderer", "hunter22").unwrap();
        assert_eq!(svc.authenticate(&token).unwrap(), "wanderer");

        let token = svc.login("wand@trip.io", "hunter22").unwrap();
        assert_eq!(svc.authenticate(&token).unwrap(), "wanderer");
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let svc = service();
        svc.register(&sign_up("wanderer", "wand@trip.io")).unwrap();

        assert!(matches!(
            svc.login("wanderer", "nope-nope"),
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.login("stranger", "hunter22"),
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[test]
    fn duplicates_are_rejected() {
        let svc = service();
        svc.register(&sign_up("wanderer", "wand@trip.io")).unwrap();

        let err = svc.register(&sign_up("wanderer", "other@trip.io")).unwrap_err();
        assert_eq!(err.to_string(), "this login is already registered");

        let err = svc.register(&sign_up("roamer1", "wand@trip.io")).unwrap_err();
        assert_eq!(err.to_string(), "this email is already registered");
    }

    #[test]
    fn input_validation() {
        let svc = service();
        assert!(matches!(
            svc.register(&sign_up("short", "wand@trip.io")),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.register(&sign_up("wanderer", "not-an-email")),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        let svc = service();
        assert!(matches!(
            svc.authenticate("abc.def.ghi"),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
