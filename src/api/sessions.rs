//! Session API
//!
//! The human trading surface (the web UI's backend):
//! - POST   /session          - Start (or replace) the primary session
//! - GET    /session          - Current session summary
//! - POST   /session/order    - Submit an order
//! - POST   /session/restore  - Start a session from a saved snapshot
//! - DELETE /session          - End the session, rolling stats up
//!
//! Each human holds at most one primary session at a time.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::auth::Authenticated;
use crate::api::{execute_order, ApiResponse};
use crate::services::{modes, scheduler, SessionHandle, TradeError};
use crate::types::{
    AllocationReport, ModeState, PortfolioDetails, SessionConfig, Trade, TradeKind,
};
use crate::AppState;
use std::sync::Arc;

/// Create session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", post(create_session))
        .route("/session", get(get_session))
        .route("/session/order", post(place_order))
        .route("/session/speed", post(set_speed))
        .route("/session/restore", post(restore_session))
        .route("/session", delete(end_session))
}

/// Convert TradeError to an HTTP response (human-order path; the bot path
/// folds domain rejections into 200 bodies instead).
impl IntoResponse for TradeError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            TradeError::SymbolUnknown(_) => StatusCode::NOT_FOUND,
            TradeError::ConflictingLongPosition(_) | TradeError::ConflictingShortPosition(_) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    session_id: String,
    config: SessionConfig,
    day: i64,
    #[serde(with = "crate::types::timestamp")]
    simulated_time: chrono::DateTime<chrono::Utc>,
    mode_state: ModeState,
    portfolio: PortfolioDetails,
    return_pct: f64,
    trade_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    allocation: Option<AllocationReport>,
}

fn summarize(state: &AppState, handle: &Arc<SessionHandle>) -> SessionSummary {
    let session = handle.lock();
    let allocation = modes::allocation_report(
        &session.mode,
        &session.portfolio,
        &state.catalog,
        |sym| session.price_of(sym),
    );
    SessionSummary {
        session_id: session.id.clone(),
        config: session.config.clone(),
        day: session.clock.day_count(),
        simulated_time: session.clock.current,
        mode_state: session.mode.clone(),
        portfolio: session.portfolio_details(),
        return_pct: session.return_pct(),
        trade_count: session.trades.len(),
        allocation,
    }
}

/// Roll a finished session's return into the owner's lifetime stats.
fn roll_up_stats(state: &AppState, user_id: &str, previous: Option<Arc<SessionHandle>>) {
    if let Some(handle) = previous {
        let return_pct = handle.lock().return_pct();
        state.users.record_game(user_id, return_pct);
    }
}

/// POST /session
async fn create_session(
    State(state): State<AppState>,
    auth: Authenticated,
    config: Option<Json<SessionConfig>>,
) -> (StatusCode, Json<ApiResponse<SessionSummary>>) {
    let config = config.map(|Json(c)| c).unwrap_or_default();
    let (handle, previous) = state
        .registry
        .create_user_session(&auth.identity.user_id, config);
    roll_up_stats(&state, &auth.identity.user_id, previous);
    scheduler::spawn(handle.clone(), state.hub.clone(), false);

    let summary = summarize(&state, &handle);
    (StatusCode::CREATED, Json(ApiResponse { data: summary }))
}

/// GET /session
async fn get_session(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<SessionSummary>>, axum::response::Response> {
    let handle = state
        .registry
        .primary_for_user(&auth.identity.user_id)
        .ok_or_else(no_active_session)?;
    Ok(Json(ApiResponse {
        data: summarize(&state, &handle),
    }))
}

#[derive(Debug, Deserialize)]
struct OrderRequest {
    symbol: String,
    side: TradeKind,
    quantity: u64,
}

#[derive(Debug, Serialize)]
struct OrderResponse {
    trade: Trade,
    cash: f64,
    total_value: f64,
}

/// POST /session/order
async fn place_order(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<OrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, axum::response::Response> {
    let handle = state
        .registry
        .primary_for_user(&auth.identity.user_id)
        .ok_or_else(no_active_session)?;

    let trade = execute_order(
        &state,
        &handle,
        request.side,
        &request.symbol,
        request.quantity,
    )
    .await
    .map_err(IntoResponse::into_response)?;

    let (cash, total_value) = {
        let session = handle.lock();
        (session.portfolio.cash, session.portfolio_value())
    };
    Ok(Json(ApiResponse {
        data: OrderResponse {
            trade,
            cash,
            total_value,
        },
    }))
}

#[derive(Debug, Deserialize)]
struct SpeedRequest {
    speed: f64,
}

/// POST /session/speed
///
/// Adjust clock acceleration; the scheduler picks the new interval up on
/// its next tick. The applied (clamped) speed is returned.
async fn set_speed(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<SpeedRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, axum::response::Response> {
    let handle = state
        .registry
        .primary_for_user(&auth.identity.user_id)
        .ok_or_else(no_active_session)?;
    handle.touch();

    let applied = {
        let mut session = handle.lock();
        session.clock.set_speed(request.speed);
        session.clock.speed
    };
    Ok(Json(ApiResponse {
        data: serde_json::json!({ "speed": applied }),
    }))
}

#[derive(Debug, Deserialize)]
struct RestoreRequest {
    code: String,
    preset: String,
}

/// POST /session/restore
async fn restore_session(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<RestoreRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionSummary>>), axum::response::Response> {
    let snapshot = state
        .saves
        .get_preset(&request.code, &request.preset)
        .map_err(IntoResponse::into_response)?;

    let (handle, previous) = state
        .registry
        .restore_user_session(&auth.identity.user_id, snapshot);
    roll_up_stats(&state, &auth.identity.user_id, previous);
    scheduler::spawn(handle.clone(), state.hub.clone(), false);

    let summary = summarize(&state, &handle);
    Ok((StatusCode::CREATED, Json(ApiResponse { data: summary })))
}

#[derive(Debug, Serialize)]
struct EndSessionResponse {
    ended: bool,
    return_pct: f64,
}

/// DELETE /session
async fn end_session(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<EndSessionResponse>>, axum::response::Response> {
    let handle = state
        .registry
        .primary_for_user(&auth.identity.user_id)
        .ok_or_else(no_active_session)?;

    let return_pct = handle.lock().return_pct();
    state.registry.delete(&handle.id);
    state.users.record_game(&auth.identity.user_id, return_pct);

    Ok(Json(ApiResponse {
        data: EndSessionResponse {
            ended: true,
            return_pct,
        },
    }))
}

fn no_active_session() -> axum::response::Response {
    crate::error::AppError::NotFound("No active session".to_string()).into_response()
}
