//! Broadcast Hub
//!
//! Topic subscription bookkeeping plus one dispatcher task per topic. Each
//! dispatcher reads a bounded producer queue and fans out to connection
//! queues; it never suspends on a subscriber — overflow is handled by the
//! connection's drop/close policy.

use crate::services::Identity;
use crate::types::{Role, ServerFrame, Topic};
use crate::websocket::{CloseReason, Connection, OutboundFrame};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Depth of each per-topic producer queue.
const DISPATCH_QUEUE_DEPTH: usize = 1024;

/// An event addressed to the owner of a session (order and portfolio
/// updates are only delivered to the owning subscriber, and to admins).
struct OwnedEvent {
    owner: String,
    frame: ServerFrame,
}

struct HubShared {
    connections: DashMap<Uuid, Arc<Connection>>,
    rooms: DashMap<Topic, HashSet<Uuid>>,
}

impl HubShared {
    fn fan_out(&self, topic: Topic, frame: &ServerFrame, owner: Option<&str>) {
        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(_) => return,
        };
        let coalescable = topic == Topic::MarketData;

        let subscriber_ids: Vec<Uuid> = self
            .rooms
            .get(&topic)
            .map(|room| room.iter().copied().collect())
            .unwrap_or_default();

        for id in subscriber_ids {
            let Some(conn) = self.connections.get(&id) else {
                continue;
            };
            if let Some(owner) = owner {
                let permitted =
                    conn.identity.user_id == owner || conn.identity.role == Role::Admin;
                if !permitted {
                    continue;
                }
            }
            let frame = if coalescable {
                OutboundFrame::coalescable(json.clone())
            } else {
                OutboundFrame::critical(json.clone())
            };
            conn.enqueue(frame);
        }
    }
}

/// The push fabric: connections, rooms, and per-topic producer queues.
pub struct Hub {
    shared: Arc<HubShared>,
    market_tx: mpsc::Sender<ServerFrame>,
    order_tx: mpsc::Sender<OwnedEvent>,
    portfolio_tx: mpsc::Sender<OwnedEvent>,
    chat_tx: mpsc::Sender<ServerFrame>,
}

impl Hub {
    /// Create the hub and spawn its dispatcher tasks.
    pub fn new() -> Arc<Self> {
        let shared = Arc::new(HubShared {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        });

        let (market_tx, market_rx) = mpsc::channel::<ServerFrame>(DISPATCH_QUEUE_DEPTH);
        let (order_tx, order_rx) = mpsc::channel::<OwnedEvent>(DISPATCH_QUEUE_DEPTH);
        let (portfolio_tx, portfolio_rx) = mpsc::channel::<OwnedEvent>(DISPATCH_QUEUE_DEPTH);
        let (chat_tx, chat_rx) = mpsc::channel::<ServerFrame>(DISPATCH_QUEUE_DEPTH);

        spawn_broadcast_dispatcher(shared.clone(), Topic::MarketData, market_rx);
        spawn_owned_dispatcher(shared.clone(), Topic::OrderUpdate, order_rx);
        spawn_owned_dispatcher(shared.clone(), Topic::PortfolioUpdate, portfolio_rx);
        spawn_broadcast_dispatcher(shared.clone(), Topic::Chat, chat_rx);

        Arc::new(Self {
            shared,
            market_tx,
            order_tx,
            portfolio_tx,
            chat_tx,
        })
    }

    /// Register an authenticated connection.
    pub fn register(&self, identity: Identity, queue_depth: usize) -> Arc<Connection> {
        let conn = Connection::new(identity, queue_depth);
        self.shared.connections.insert(conn.id, conn.clone());
        info!(connection = %conn.id, user = %conn.identity.user_id, "push client connected");
        conn
    }

    /// Remove a connection from every room. Idempotent.
    pub fn unregister(&self, connection_id: Uuid) {
        if self.shared.connections.remove(&connection_id).is_some() {
            for mut room in self.shared.rooms.iter_mut() {
                room.remove(&connection_id);
            }
            info!(connection = %connection_id, "push client disconnected");
        }
    }

    /// Subscribe a connection to a topic. Chat requires a tester or admin
    /// credential; market data only a valid one.
    pub fn subscribe(&self, connection_id: Uuid, topic: Topic) -> Result<(), &'static str> {
        let Some(conn) = self.shared.connections.get(&connection_id) else {
            return Err("unknown connection");
        };
        if topic == Topic::Chat && !conn.identity.role.can_chat() {
            return Err("role not permitted");
        }
        drop(conn);
        self.shared
            .rooms
            .entry(topic)
            .or_default()
            .insert(connection_id);
        debug!(connection = %connection_id, %topic, "subscribed");
        Ok(())
    }

    pub fn unsubscribe(&self, connection_id: Uuid, topic: Topic) {
        if let Some(mut room) = self.shared.rooms.get_mut(&topic) {
            room.remove(&connection_id);
        }
    }

    /// Enqueue a market delta for fan-out. Suspends only when the dispatcher
    /// queue is full.
    pub async fn publish_market(&self, frame: ServerFrame) {
        let _ = self.market_tx.send(frame).await;
    }

    /// Enqueue an order update for the owning subscriber.
    pub async fn publish_order(&self, owner: &str, frame: ServerFrame) {
        let _ = self
            .order_tx
            .send(OwnedEvent {
                owner: owner.to_string(),
                frame,
            })
            .await;
    }

    /// Non-suspending order publish, usable under a session mutex so order
    /// updates enter the dispatcher queue in trade order. Hands the frame
    /// back when the dispatcher queue is full; the caller then suspends on
    /// [`Hub::publish_order`] after releasing the lock.
    pub fn try_publish_order(&self, owner: &str, frame: ServerFrame) -> Option<ServerFrame> {
        use tokio::sync::mpsc::error::TrySendError;
        match self.order_tx.try_send(OwnedEvent {
            owner: owner.to_string(),
            frame,
        }) {
            Ok(()) => None,
            Err(TrySendError::Full(event)) | Err(TrySendError::Closed(event)) => Some(event.frame),
        }
    }

    /// Enqueue a portfolio update for the owning subscriber.
    pub async fn publish_portfolio(&self, owner: &str, frame: ServerFrame) {
        let _ = self
            .portfolio_tx
            .send(OwnedEvent {
                owner: owner.to_string(),
                frame,
            })
            .await;
    }

    /// Enqueue a chat event for every chat subscriber.
    pub async fn publish_chat(&self, frame: ServerFrame) {
        let _ = self.chat_tx.send(frame).await;
    }

    /// Close every connection; used at graceful shutdown.
    pub fn close_all(&self, reason: CloseReason) {
        for conn in self.shared.connections.iter() {
            conn.close(reason);
        }
    }

    pub fn client_count(&self) -> usize {
        self.shared.connections.len()
    }

    /// Subscriber count for one topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.shared
            .rooms
            .get(&topic)
            .map(|room| room.len())
            .unwrap_or(0)
    }
}

fn spawn_broadcast_dispatcher(
    shared: Arc<HubShared>,
    topic: Topic,
    mut rx: mpsc::Receiver<ServerFrame>,
) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            shared.fan_out(topic, &frame, None);
        }
    });
}

fn spawn_owned_dispatcher(
    shared: Arc<HubShared>,
    topic: Topic,
    mut rx: mpsc::Receiver<OwnedEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            shared.fan_out(topic, &event.frame, Some(&event.owner));
        }
    });
}
