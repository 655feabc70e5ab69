//! Auth Gate
//!
//! Identity and role resolution for both the request path and the push
//! handshake. Bearer tokens are HMAC-SHA256 signed over `user_id.expiry`
//! with the shared secret; password digests are salted SHA-256 (the hashing
//! primitive itself is a swappable collaborator).

use crate::services::{UserStore, UserStoreError};
use crate::types::{Role, UserProfile};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    BadCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Role not permitted")]
    RoleNotPermitted,

    #[error("{0}")]
    Exists(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION",
            AuthError::BadCredentials => "BAD_CREDENTIALS",
            AuthError::Unauthorized => "AUTH_REQUIRED",
            AuthError::RoleNotPermitted => "ROLE_NOT_PERMITTED",
            AuthError::Exists(_) => "EXISTS",
        }
    }
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AuthError::Validation(_) => axum::http::StatusCode::BAD_REQUEST,
            AuthError::BadCredentials | AuthError::Unauthorized => {
                axum::http::StatusCode::UNAUTHORIZED
            }
            AuthError::RoleNotPermitted => axum::http::StatusCode::FORBIDDEN,
            AuthError::Exists(_) => axum::http::StatusCode::CONFLICT,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<UserStoreError> for AuthError {
    fn from(e: UserStoreError) -> Self {
        match e {
            UserStoreError::DuplicateEmail | UserStoreError::DuplicateUsername => {
                AuthError::Exists(e.to_string())
            }
            UserStoreError::MissingIdentifier => AuthError::Validation(e.to_string()),
        }
    }
}

/// Resolved identity attached to a request or push connection.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub role: Role,
}

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub password: String,
}

/// Identity and role resolution.
pub struct AuthGate {
    users: Arc<UserStore>,
    secret: Vec<u8>,
    open_registration: bool,
}

impl AuthGate {
    pub fn new(users: Arc<UserStore>, secret: &[u8], open_registration: bool) -> Self {
        Self {
            users,
            secret: secret.to_vec(),
            open_registration,
        }
    }

    /// Create an account. When registration is closed, only admins may call.
    pub fn register(
        &self,
        request: RegisterRequest,
        actor: Option<&Identity>,
    ) -> Result<UserProfile, AuthError> {
        if !self.open_registration && !matches!(actor.map(|a| a.role), Some(Role::Admin)) {
            return Err(AuthError::RoleNotPermitted);
        }

        let email = normalize_optional(request.email);
        let username = normalize_optional(request.username);
        if let Some(ref email) = email {
            if !email.contains('@') {
                return Err(AuthError::Validation("Invalid email address".to_string()));
            }
        }
        if let Some(ref username) = username {
            if username.len() < 3 || !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(AuthError::Validation(
                    "Username must be at least 3 alphanumeric characters".to_string(),
                ));
            }
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let display_name = request
            .display_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| username.clone())
            .or_else(|| {
                email
                    .as_ref()
                    .map(|e| e.split('@').next().unwrap_or(e.as_str()).to_string())
            })
            .ok_or_else(|| {
                AuthError::Validation("At least one of email or username is required".to_string())
            })?;

        let hash = self.hash_password(&request.password);
        let user = self
            .users
            .create(email, username, display_name, hash, Role::User)?;
        Ok(UserProfile::from(&user))
    }

    /// Verify credentials and issue a bearer token.
    pub fn login(&self, identifier: &str, password: &str) -> Result<(String, UserProfile), AuthError> {
        let user = self
            .users
            .find_by_identifier(identifier)
            .ok_or(AuthError::BadCredentials)?;
        if !self.verify_password(password, &user.password_hash) {
            warn!(identifier, "failed login attempt");
            return Err(AuthError::BadCredentials);
        }

        let token = self.mint_token(&user.user_id);
        info!(user_id = %user.user_id, "login");
        Ok((token, UserProfile::from(&user)))
    }

    /// Resolve a bearer token to an identity.
    pub fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        self.resolve_with_expiry(token).map(|(identity, _)| identity)
    }

    /// Resolve a bearer token, also returning its expiry instant. The push
    /// handshake uses the expiry to time the connection out.
    pub fn resolve_with_expiry(
        &self,
        token: &str,
    ) -> Result<(Identity, chrono::DateTime<chrono::Utc>), AuthError> {
        let mut parts = token.splitn(3, '.');
        let (user_id, expiry, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(u), Some(e), Some(s)) => (u, e, s),
            _ => return Err(AuthError::Unauthorized),
        };

        let expires_at: i64 = expiry.parse().map_err(|_| AuthError::Unauthorized)?;
        if expires_at < chrono::Utc::now().timestamp() {
            return Err(AuthError::Unauthorized);
        }

        let payload = format!("{}.{}", user_id, expiry);
        let sig_bytes = hex::decode(signature).map_err(|_| AuthError::Unauthorized)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| AuthError::Unauthorized)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig_bytes)
            .map_err(|_| AuthError::Unauthorized)?;

        let user = self.users.get(user_id).ok_or(AuthError::Unauthorized)?;
        let expiry = chrono::DateTime::from_timestamp(expires_at, 0).ok_or(AuthError::Unauthorized)?;
        Ok((
            Identity {
                user_id: user.user_id,
                display_name: user.display_name,
                role: user.role,
            },
            expiry,
        ))
    }

    fn mint_token(&self, user_id: &str) -> String {
        let expires_at = chrono::Utc::now().timestamp() + TOKEN_TTL_SECS;
        let payload = format!("{}.{}", user_id, expires_at);
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("{}.{}", payload, signature)
    }

    /// Salted SHA-256 digest, stored as `salt$digest` hex.
    pub fn hash_password(&self, password: &str) -> String {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = Self::digest_with_salt(&salt, password);
        format!("{}${}", hex::encode(salt), digest)
    }

    fn verify_password(&self, password: &str, stored: &str) -> bool {
        let Some((salt_hex, digest)) = stored.split_once('$') else {
            return false;
        };
        let Ok(salt) = hex::decode(salt_hex) else {
            return false;
        };
        Self::digest_with_salt(&salt, password) == digest
    }

    fn digest_with_salt(salt: &[u8], password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
