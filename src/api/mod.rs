pub mod auth;
pub mod bots;
pub mod chat;
pub mod health;
pub mod market;
pub mod saves;
pub mod sessions;

use crate::services::{trader, SessionHandle, TradeError};
use crate::types::{OrderUpdateData, ServerFrame, Trade, TradeKind};
use crate::AppState;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(chat::router())
        .merge(bots::router())
        .merge(market::router())
        .merge(saves::router())
        .merge(sessions::router())
}

/// API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Execute one order against a session and publish the order update.
///
/// The update is pushed into the dispatcher queue while the session mutex
/// is still held, so broadcasts observe trade order; only a full dispatcher
/// queue defers the publish until after release.
pub(crate) async fn execute_order(
    state: &AppState,
    handle: &Arc<SessionHandle>,
    kind: TradeKind,
    symbol: &str,
    quantity: u64,
) -> Result<Trade, TradeError> {
    handle.touch();
    let (trade, deferred) = {
        let mut session = handle.lock();
        let trade = match kind {
            TradeKind::Buy => trader::buy(&mut session, symbol, quantity)?,
            TradeKind::Sell => trader::sell(&mut session, symbol, quantity)?,
            TradeKind::ShortOpen => trader::open_short(&mut session, symbol, quantity)?,
            TradeKind::ShortClose => trader::close_short(&mut session, symbol, quantity)?,
        };
        let frame = ServerFrame::OrderUpdate {
            data: OrderUpdateData {
                session_id: session.id.clone(),
                trade: trade.clone(),
                cash_after: session.portfolio.cash,
            },
        };
        let owner = session.owner.key().to_string();
        let deferred = state
            .hub
            .try_publish_order(&owner, frame)
            .map(|frame| (owner, frame));
        (trade, deferred)
    };

    if let Some((owner, frame)) = deferred {
        state.hub.publish_order(&owner, frame).await;
    }
    Ok(trade)
}
