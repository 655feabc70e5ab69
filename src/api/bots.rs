//! Bot API
//!
//! Endpoints:
//! - POST /bot/register     - Create a bot session (returns the order key)
//! - POST /bot/order        - Submit an order for a bot session
//! - GET  /bot/:id/stats    - Aggregate stats for one bot
//! - GET  /bot/leaderboard  - Bots ranked by return percentage
//! - GET  /portfolio?bot_id - Positions plus unrealized P&L
//!
//! Domain rejections on the order path are not HTTP errors: they return
//! 200 with `status = "rejected"` and a stable code.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{execute_order, ApiResponse};
use crate::error::AppError;
use crate::services::{modes, scheduler, TradeError};
use crate::types::{AllocationReport, PortfolioDetails, Trade, TradeKind};
use crate::AppState;

/// Create bot router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bot/register", post(register_bot))
        .route("/bot/order", post(place_order))
        .route("/bot/:id/stats", get(bot_stats))
        .route("/bot/leaderboard", get(leaderboard))
        .route("/portfolio", get(portfolio))
}

// =============================================================================
// Registration
// =============================================================================

#[derive(Debug, Deserialize)]
struct RegisterBotRequest {
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegisterBotResponse {
    bot_id: String,
    bot_key: String,
    session_id: String,
    name: String,
    starting_capital: f64,
}

/// POST /bot/register
async fn register_bot(
    State(state): State<AppState>,
    Json(request): Json<RegisterBotRequest>,
) -> (StatusCode, Json<ApiResponse<RegisterBotResponse>>) {
    let name = request
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "bot".to_string());

    let (record, handle) = state.registry.create_bot(&name);
    scheduler::spawn(handle.clone(), state.hub.clone(), false);

    let starting_capital = handle.lock().initial_capital;
    let response = RegisterBotResponse {
        bot_id: record.bot_id,
        bot_key: record.bot_key,
        session_id: record.session_id,
        name: record.name,
        starting_capital,
    };
    (StatusCode::CREATED, Json(ApiResponse { data: response }))
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
struct BotOrderRequest {
    bot_id: String,
    bot_key: String,
    symbol: String,
    side: TradeKind,
    quantity: u64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum BotOrderResponse {
    Filled {
        trade: Trade,
        cash: f64,
        total_value: f64,
    },
    Rejected {
        code: String,
        message: String,
    },
}

/// POST /bot/order
async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<BotOrderRequest>,
) -> Response {
    let Some(handle) = state.registry.bot_session(&request.bot_id, &request.bot_key) else {
        let body = serde_json::json!({
            "error": "Unknown bot or bad key",
            "code": "BAD_BOT_KEY",
        });
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    };

    match execute_order(
        &state,
        &handle,
        request.side,
        &request.symbol,
        request.quantity,
    )
    .await
    {
        Ok(trade) => {
            let (cash, total_value) = {
                let session = handle.lock();
                (session.portfolio.cash, session.portfolio_value())
            };
            Json(ApiResponse {
                data: BotOrderResponse::Filled {
                    trade,
                    cash,
                    total_value,
                },
            })
            .into_response()
        }
        Err(TradeError::SymbolUnknown(symbol)) => {
            let body = serde_json::json!({
                "error": format!("Unknown symbol: {}", symbol),
                "code": "SYMBOL_UNKNOWN",
            });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(TradeError::InvalidQuantity) => {
            let body = serde_json::json!({
                "error": TradeError::InvalidQuantity.to_string(),
                "code": TradeError::InvalidQuantity.code(),
            });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
        Err(rejection) => {
            info!(bot = %request.bot_id, "order rejected: {}", rejection);
            Json(ApiResponse {
                data: BotOrderResponse::Rejected {
                    code: rejection.code().to_string(),
                    message: rejection.to_string(),
                },
            })
            .into_response()
        }
    }
}

// =============================================================================
// Stats & Portfolio
// =============================================================================

#[derive(Debug, Serialize)]
struct BotStats {
    bot_id: String,
    name: String,
    session_id: String,
    day: i64,
    total_value: f64,
    cash: f64,
    unrealized_pnl: f64,
    realized_gains: f64,
    return_pct: f64,
    trade_count: usize,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    allocation: Option<AllocationReport>,
}

/// GET /bot/:id/stats
async fn bot_stats(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> Response {
    let Some(record) = state.registry.bot(&bot_id) else {
        return not_found("Unknown bot");
    };
    let Some(handle) = state.registry.get(&record.session_id) else {
        return not_found("Bot session is gone");
    };

    let session = handle.lock();
    let allocation = modes::allocation_report(
        &session.mode,
        &session.portfolio,
        &state.catalog,
        |sym| session.price_of(sym),
    );
    let stats = BotStats {
        bot_id: record.bot_id,
        name: record.name,
        session_id: record.session_id,
        day: session.clock.day_count(),
        total_value: session.portfolio_value(),
        cash: session.portfolio.cash,
        unrealized_pnl: session.unrealized_pnl(),
        realized_gains: session.portfolio.realized_gains,
        return_pct: session.return_pct(),
        trade_count: session.trades.len(),
        mode: session.config.mode.to_string(),
        allocation,
    };
    drop(session);

    Json(ApiResponse { data: stats }).into_response()
}

#[derive(Debug, Deserialize)]
struct PortfolioQuery {
    bot_id: String,
}

/// GET /portfolio?bot_id=B
async fn portfolio(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> Response {
    let Some(record) = state.registry.bot(&query.bot_id) else {
        return not_found("Unknown bot");
    };
    let Some(handle) = state.registry.get(&record.session_id) else {
        return not_found("Bot session is gone");
    };

    let details: PortfolioDetails = handle.lock().portfolio_details();
    Json(ApiResponse { data: details }).into_response()
}

// =============================================================================
// Leaderboard
// =============================================================================

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct LeaderboardEntry {
    bot_id: String,
    name: String,
    total_value: f64,
    return_pct: f64,
    trade_count: usize,
}

/// GET /bot/leaderboard
///
/// Bots ranked by return percentage, descending.
async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<ApiResponse<Vec<LeaderboardEntry>>> {
    let mut entries: Vec<LeaderboardEntry> = state
        .registry
        .bots()
        .into_iter()
        .filter_map(|record| {
            let handle = state.registry.get(&record.session_id)?;
            let session = handle.lock();
            Some(LeaderboardEntry {
                bot_id: record.bot_id,
                name: record.name,
                total_value: session.portfolio_value(),
                return_pct: session.return_pct(),
                trade_count: session.trades.len(),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.return_pct
            .partial_cmp(&a.return_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(query.limit.unwrap_or(10).clamp(1, 100));

    Json(ApiResponse { data: entries })
}

fn not_found(message: &str) -> Response {
    AppError::NotFound(message.to_string()).into_response()
}
