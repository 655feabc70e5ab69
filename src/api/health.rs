use crate::types::Topic;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    active_sessions: usize,
    registered_bots: usize,
    push_clients: usize,
    market_subscribers: usize,
    users: usize,
    save_codes: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.registry.len(),
        registered_bots: state.registry.bots().len(),
        push_clients: state.hub.client_count(),
        market_subscribers: state.hub.subscriber_count(Topic::MarketData),
        users: state.users.len(),
        save_codes: state.saves.len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
