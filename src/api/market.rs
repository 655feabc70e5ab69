//! Market Data API
//!
//! Endpoints:
//! - GET /market/data            - All symbol snapshots
//! - GET /market/data?symbol=S   - One symbol, with recent history
//!
//! Without a `bot_id` the shared reference tape is served; with one, the
//! bot session's private tape.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiResponse;
use crate::error::AppError;
use crate::services::SessionHandle;
use crate::types::MarketQuote;
use crate::AppState;
use std::sync::Arc;

/// History points returned for a single-symbol query.
const HISTORY_WINDOW: usize = 30;

/// Create market router.
pub fn router() -> Router<AppState> {
    Router::new().route("/market/data", get(market_data))
}

#[derive(Debug, Deserialize)]
struct MarketQuery {
    symbol: Option<String>,
    bot_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MarketSnapshot {
    quotes: Vec<MarketQuote>,
    day: i64,
    #[serde(with = "crate::types::timestamp")]
    simulated_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SymbolSnapshot {
    quote: MarketQuote,
    display_name: String,
    kind: String,
    history: Vec<f64>,
}

/// GET /market/data
async fn market_data(
    State(state): State<AppState>,
    Query(query): Query<MarketQuery>,
) -> Response {
    let handle = match resolve_tape(&state, query.bot_id.as_deref()) {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    match query.symbol {
        Some(symbol) => {
            let upper = symbol.to_uppercase();
            let Some(instrument) = state.catalog.get(&upper) else {
                return not_found(&format!("Unknown symbol: {}", symbol));
            };

            let session = handle.lock();
            let Some(price_state) = session.price_states.get(&upper) else {
                return not_found(&format!("Unknown symbol: {}", symbol));
            };
            let snapshot = SymbolSnapshot {
                quote: MarketQuote::from_state(&upper, price_state),
                display_name: instrument.display_name.clone(),
                kind: instrument.kind.to_string(),
                history: price_state
                    .history
                    .iter()
                    .rev()
                    .take(HISTORY_WINDOW)
                    .rev()
                    .copied()
                    .collect(),
            };
            drop(session);
            Json(ApiResponse { data: snapshot }).into_response()
        }
        None => {
            let session = handle.lock();
            let snapshot = MarketSnapshot {
                quotes: session.market_quotes(),
                day: session.clock.day_count(),
                simulated_time: session.clock.current,
            };
            drop(session);
            Json(ApiResponse { data: snapshot }).into_response()
        }
    }
}

fn resolve_tape(
    state: &AppState,
    bot_id: Option<&str>,
) -> Result<Arc<SessionHandle>, Response> {
    match bot_id {
        Some(bot_id) => {
            let record = state
                .registry
                .bot(bot_id)
                .ok_or_else(|| not_found("Unknown bot"))?;
            state
                .registry
                .get(&record.session_id)
                .ok_or_else(|| not_found("Bot session is gone"))
        }
        None => state
            .registry
            .get(&state.reference_session)
            .ok_or_else(|| not_found("Reference market unavailable")),
    }
}

fn not_found(message: &str) -> Response {
    AppError::NotFound(message.to_string()).into_response()
}
