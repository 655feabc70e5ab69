//! Push Channel Frames
//!
//! JSON frame types exchanged over the persistent push connection. All
//! frames are tagged objects; clients subscribe per topic.

use crate::types::{ChatMessage, MarketDelta, MarketQuote, Trade};
use serde::{Deserialize, Serialize};

/// Subscription topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    MarketData,
    OrderUpdate,
    PortfolioUpdate,
    Chat,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::MarketData => write!(f, "market_data"),
            Topic::OrderUpdate => write!(f, "order_update"),
            Topic::PortfolioUpdate => write!(f, "portfolio_update"),
            Topic::Chat => write!(f, "chat"),
        }
    }
}

/// Incoming frame from a push client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
    Ping,
}

/// Outgoing frame to a push client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Full market view, sent once on market-data subscription
    MarketSnapshot { quotes: Vec<MarketQuote> },
    MarketUpdate { data: MarketDelta },
    OrderUpdate { data: OrderUpdateData },
    PortfolioUpdate { data: PortfolioUpdateData },
    Chat { data: ChatMessage },
    Subscribed { topic: Topic },
    Unsubscribed { topic: Topic },
    Pong,
    Error { error: String, code: String },
}

/// Payload of an order-update frame.
#[derive(Debug, Clone, Serialize)]
pub struct OrderUpdateData {
    pub session_id: String,
    pub trade: Trade,
    pub cash_after: f64,
}

/// Payload of a portfolio-update frame.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioUpdateData {
    pub session_id: String,
    pub total_value: f64,
    pub cash: f64,
    pub unrealized_pnl: f64,
    /// Simulated-day index
    pub day: i64,
}
