//! Chat API
//!
//! Endpoints (tester/admin only):
//! - GET  /chat/messages?page=N&limit=M - Paginated window, newest first
//! - POST /chat/messages                - Append a message

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::auth::Authenticated;
use crate::api::ApiResponse;
use crate::services::chat::MAX_PAGE_LIMIT;
use crate::services::{AuthError, ChatError};
use crate::types::{ChatMessage, ServerFrame};
use crate::AppState;

/// Create chat router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat/messages", get(get_messages))
        .route("/chat/messages", post(post_message))
}

impl axum::response::IntoResponse for ChatError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ChatQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatWindow {
    messages: Vec<ChatMessage>,
    total: usize,
    page: usize,
    limit: usize,
}

/// GET /chat/messages
async fn get_messages(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<ChatQuery>,
) -> Result<Json<ApiResponse<ChatWindow>>, AuthError> {
    require_chat_role(&auth)?;

    let limit = query.limit.unwrap_or(50).clamp(1, MAX_PAGE_LIMIT);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;

    let window = state.chat.get_messages(limit, offset);
    Ok(Json(ApiResponse {
        data: ChatWindow {
            messages: window.messages,
            total: window.total,
            page,
            limit,
        },
    }))
}

#[derive(Debug, Deserialize)]
struct PostMessageRequest {
    text: String,
}

/// POST /chat/messages
async fn post_message(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChatMessage>>), axum::response::Response> {
    require_chat_role(&auth).map_err(axum::response::IntoResponse::into_response)?;

    // Sim timestamp comes from the shared reference tape.
    let sim_timestamp = state
        .registry
        .get(&state.reference_session)
        .map(|handle| handle.lock().clock.current)
        .unwrap_or_else(crate::types::timestamp::now);

    let message = state
        .chat
        .post(
            &auth.identity.user_id,
            &auth.identity.display_name,
            &request.text,
            sim_timestamp,
        )
        .map_err(axum::response::IntoResponse::into_response)?;

    state
        .hub
        .publish_chat(ServerFrame::Chat {
            data: message.clone(),
        })
        .await;

    Ok((StatusCode::CREATED, Json(ApiResponse { data: message })))
}

fn require_chat_role(auth: &Authenticated) -> Result<(), AuthError> {
    if auth.identity.role.can_chat() {
        Ok(())
    } else {
        Err(AuthError::RoleNotPermitted)
    }
}
