//! Authentication API
//!
//! Endpoints:
//! - POST /auth/register - Create a user account
//! - POST /auth/login    - Issue a bearer credential
//! - GET  /auth/profile  - Profile for the presented credential

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::ApiResponse;
use crate::services::{AuthError, Identity, RegisterRequest};
use crate::types::UserProfile;
use crate::AppState;

/// Create auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(profile))
}

/// POST /auth/register
///
/// Create a new account. When registration is closed, only an admin
/// credential may create accounts.
async fn register(
    State(state): State<AppState>,
    auth: Option<Authenticated>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), AuthError> {
    let actor = auth.as_ref().map(|a| &a.identity);
    let profile = state.auth.register(request, actor)?;
    Ok((StatusCode::CREATED, Json(ApiResponse { data: profile })))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    identifier: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    profile: UserProfile,
}

/// POST /auth/login
///
/// Verify credentials and issue a bearer token.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AuthError> {
    if request.identifier.trim().is_empty() || request.password.is_empty() {
        return Err(AuthError::Validation(
            "Identifier and password are required".to_string(),
        ));
    }
    let (token, profile) = state.auth.login(&request.identifier, &request.password)?;
    Ok(Json(ApiResponse {
        data: LoginResponse { token, profile },
    }))
}

/// GET /auth/profile
///
/// Return the profile attached to the presented credential.
async fn profile(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<UserProfile>>, AuthError> {
    let user = state
        .users
        .get(&auth.identity.user_id)
        .ok_or(AuthError::Unauthorized)?;
    Ok(Json(ApiResponse {
        data: UserProfile::from(&user),
    }))
}

/// Authenticated identity extractor.
///
/// Use this in route handlers to require a bearer credential:
/// ```ignore
/// async fn my_handler(auth: Authenticated) -> impl IntoResponse {
///     let identity = auth.identity;
///     // ...
/// }
/// ```
pub struct Authenticated {
    pub identity: Identity,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::Unauthorized)?;

        let identity = state.auth.resolve(token)?;
        Ok(Authenticated { identity })
    }
}
