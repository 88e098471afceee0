//! User accounts and bearer-token authentication for the HTTP API

use std::sync::{Arc, Mutex, MutexGuard};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::AuthConfig, domain::library::User, storage::{error::StorageError, store::MediaStore}};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password must not be empty")]
    EmptyCredentials,

    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("missing or malformed bearer token")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Claims carried in every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// username
    pub sub: String,
    pub uid: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates bearer identities against the user table
pub struct AuthService {
    store: Arc<Mutex<MediaStore>>,
    secret: String,
    token_ttl_secs: i64,
}

impl AuthService {
    pub fn new(store: Arc<Mutex<MediaStore>>, config: &AuthConfig) -> Self {
        Self {
            store,
            secret: config.jwt_secret.clone(),
            token_ttl_secs: config.token_ttl_secs,
        }
    }

    fn store(&self) -> MutexGuard<'_, MediaStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::EmptyCredentials);
        }

        let mut store = self.store();
        if store.find_user_by_username(username)?.is_some() {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string();

        Ok(store.insert_user(username, &hash)?)
    }

    /// Checks the credentials and issues a signed token
    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .store()
            .find_user_by_username(username)?
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue(&user)
    }

    fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            iat: now,
            exp: now + self.token_ttl_secs,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    /// Verifies a token and returns its claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
    }

    /// Verifies the token inside an `Authorization: Bearer` header value
    pub fn verify_bearer(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::storage::{schema, store::MediaStore};

    fn setup_auth(ttl_secs: i64) -> AuthService {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        schema::init(&conn).unwrap();
        let store = Arc::new(Mutex::new(MediaStore::from_existing_conn(conn)));

        AuthService::new(
            store,
            &AuthConfig {
                jwt_secret: "test-secret".to_string(),
                token_ttl_secs: ttl_secs,
            },
        )
    }

    #[test]
    fn register_login_verify_roundtrip() -> anyhow::Result<()> {
        let auth = setup_auth(3600);

        let user = auth.register("alice", "hunter2")?;
        assert_eq!(user.username, "alice");
        // the stored hash is salted, never the raw password
        assert_ne!(user.password_hash, "hunter2");

        let token = auth.login("alice", "hunter2")?;
        let claims = auth.verify(&token)?;
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.uid, user.id);
        assert!(claims.exp > claims.iat);

        Ok(())
    }

    #[test]
    fn login_rejects_wrong_credentials() -> anyhow::Result<()> {
        let auth = setup_auth(3600);
        auth.register("alice", "hunter2")?;

        assert!(matches!(
            auth.login("alice", "wrong").unwrap_err(),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            auth.login("nobody", "hunter2").unwrap_err(),
            AuthError::InvalidCredentials
        ));

        Ok(())
    }

    #[test]
    fn register_rejects_taken_and_empty_names() -> anyhow::Result<()> {
        let auth = setup_auth(3600);
        auth.register("alice", "hunter2")?;

        assert!(matches!(
            auth.register("alice", "other").unwrap_err(),
            AuthError::UsernameTaken(_)
        ));
        assert!(matches!(
            auth.register("", "pw").unwrap_err(),
            AuthError::EmptyCredentials
        ));
        assert!(matches!(
            auth.register("bob", "").unwrap_err(),
            AuthError::EmptyCredentials
        ));

        Ok(())
    }

    #[test]
    fn expired_tokens_are_rejected() -> anyhow::Result<()> {
        let auth = setup_auth(3600);
        auth.register("alice", "hunter2")?;

        let stale = Claims {
            sub: "alice".to_string(),
            uid: 1,
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &stale,
            &EncodingKey::from_secret("test-secret".as_bytes()),
        )?;

        assert!(matches!(
            auth.verify(&token).unwrap_err(),
            AuthError::InvalidToken
        ));
        Ok(())
    }

    #[test]
    fn bearer_header_parsing() -> anyhow::Result<()> {
        let auth = setup_auth(3600);
        auth.register("alice", "hunter2")?;
        let token = auth.login("alice", "hunter2")?;

        let claims = auth.verify_bearer(Some(&format!("Bearer {token}")))?;
        assert_eq!(claims.sub, "alice");

        assert!(matches!(
            auth.verify_bearer(None).unwrap_err(),
            AuthError::MissingToken
        ));
        assert!(matches!(
            auth.verify_bearer(Some(&token)).unwrap_err(),
            AuthError::MissingToken
        ));
        assert!(matches!(
            auth.verify_bearer(Some("Bearer garbage")).unwrap_err(),
            AuthError::InvalidToken
        ));

        Ok(())
    }
}
