//! Registration, login and the session table backing the `kelime_sid` cookie.

use crate::error::AppError;
use crate::store::{Store, StoreError};
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub const MISSING_REGISTRATION_FIELDS: &str = "Lütfen tüm alanları doldur.";
pub const EMAIL_TAKEN: &str = "Bu email zaten kayıtlı.";
pub const MISSING_LOGIN_FIELDS: &str = "Email ve şifre gir.";
pub const WRONG_CREDENTIALS: &str = "Email veya şifre yanlış.";

const TOKEN_LEN: usize = 48;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// The authenticated user carried by a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Clone)]
pub struct Identity {
    store: Store,
    hasher: Argon2<'static>,
    session_ttl: Duration,
}

impl Identity {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            hasher: Argon2::default(),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Overrides the Argon2 cost parameters used for new hashes.
    pub fn with_hasher(mut self, hasher: Argon2<'static>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<IssuedSession, AppError> {
        let username = username.trim();
        let email = email.trim().to_lowercase();
        let password = password.trim();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::validation(MISSING_REGISTRATION_FIELDS));
        }
        if self.store.find_user_by_email(&email)?.is_some() {
            return Err(AppError::validation(EMAIL_TAKEN));
        }

        let password_hash = self.hash_password(password)?;
        let id = self
            .store
            .insert_user(username, &email, &password_hash)
            .map_err(|err| match err {
                StoreError::UniqueViolation(_) => AppError::validation(EMAIL_TAKEN),
                other => AppError::Storage(other),
            })?;
        info!(user_id = id, "registered user");
        self.issue(SessionUser {
            id,
            username: username.to_string(),
            email,
        })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let email = email.trim().to_lowercase();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::validation(MISSING_LOGIN_FIELDS));
        }

        let Some(user) = self.store.find_user_by_email(&email)? else {
            warn!("login rejected: unknown email");
            return Err(AppError::auth(WRONG_CREDENTIALS));
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "login rejected: wrong password");
            return Err(AppError::auth(WRONG_CREDENTIALS));
        }
        self.issue(SessionUser {
            id: user.id,
            username: user.username,
            email: user.email,
        })
    }

    /// The user behind `token`, or `None` when the session is unknown or expired.
    pub fn session_user(&self, token: &str) -> Result<Option<SessionUser>, AppError> {
        let owner = self.store.session_owner(token, now_ts())?;
        Ok(owner.map(|(id, username, email)| SessionUser {
            id,
            username,
            email,
        }))
    }

    pub fn logout(&self, token: &str) -> Result<(), AppError> {
        self.store.delete_session(token)?;
        Ok(())
    }

    fn issue(&self, user: SessionUser) -> Result<IssuedSession, AppError> {
        let now = now_ts();
        self.store.purge_expired_sessions(now)?;
        let token = session_token();
        let ttl = i64::try_from(self.session_ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl);
        self.store
            .insert_session(&token, user.id, &user.username, &user.email, expires_at)?;
        Ok(IssuedSession { token, user })
    }

    fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| AppError::PasswordHash(err.to_string()))?;
        Ok(hash.to_string())
    }
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed =
        PasswordHash::new(stored).map_err(|err| AppError::PasswordHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Cheap Argon2 parameters so hashing does not dominate test time.
#[cfg(test)]
pub(crate) fn test_hasher() -> Argon2<'static> {
    use argon2::{Algorithm, Params, Version};
    let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}
