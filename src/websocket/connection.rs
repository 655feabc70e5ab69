//! Push Connection
//!
//! One bounded outbound queue per connection, drained strictly FIFO by a
//! dedicated sender task. Market-data frames coalesce under pressure;
//! order-update and chat frames never drop — when nothing coalescable is
//! left to evict, the connection closes as a slow consumer.

use crate::services::Identity;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::warn;
use uuid::Uuid;

/// Default outbound queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// Why a connection was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Bounded queue overflowed on a non-coalescable frame
    SlowConsumer,
    /// Bearer credential passed its expiry
    CredentialExpired,
    /// Graceful server shutdown
    Shutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::SlowConsumer => "slow_consumer",
            CloseReason::CredentialExpired => "credential_expired",
            CloseReason::Shutdown => "shutdown",
        }
    }
}

/// A serialized frame waiting in a connection queue.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub json: String,
    /// Market-data frames may be dropped oldest-first under pressure
    pub coalescable: bool,
}

impl OutboundFrame {
    pub fn coalescable(json: String) -> Self {
        Self {
            json,
            coalescable: true,
        }
    }

    pub fn critical(json: String) -> Self {
        Self {
            json,
            coalescable: false,
        }
    }
}

/// One push client.
pub struct Connection {
    pub id: Uuid,
    pub identity: Identity,
    queue: Mutex<VecDeque<OutboundFrame>>,
    capacity: usize,
    notify: Notify,
    closed: AtomicBool,
    close_reason: Mutex<Option<CloseReason>>,
}

impl Connection {
    pub fn new(identity: Identity, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            identity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            close_reason: Mutex::new(None),
        })
    }

    /// Enqueue a frame, applying the backpressure policy. Returns false when
    /// the frame was dropped (closed connection, or coalesced away).
    pub fn enqueue(&self, frame: OutboundFrame) -> bool {
        if self.is_closed() {
            return false;
        }

        let mut queue = self.queue.lock().expect("connection queue lock poisoned");
        if queue.len() >= self.capacity {
            // Evict the oldest coalescable frame to make room.
            let evictable = queue.iter().position(|f| f.coalescable);
            match (evictable, frame.coalescable) {
                (Some(pos), _) => {
                    queue.remove(pos);
                }
                (None, true) => {
                    // Queue is full of critical frames; the market frame loses.
                    return false;
                }
                (None, false) => {
                    drop(queue);
                    warn!(connection = %self.id, "closing slow consumer");
                    self.close(CloseReason::SlowConsumer);
                    return false;
                }
            }
        }
        queue.push_back(frame);
        drop(queue);
        self.notify.notify_one();
        true
    }

    /// Next frame to send, FIFO. Returns `None` once the connection is
    /// closed; any queued frames are discarded at that point.
    pub async fn next_frame(&self) -> Option<String> {
        loop {
            if self.is_closed() {
                return None;
            }
            if let Some(frame) = self
                .queue
                .lock()
                .expect("connection queue lock poisoned")
                .pop_front()
            {
                return Some(frame.json);
            }
            self.notify.notified().await;
        }
    }

    /// Close the connection, discarding the queue. Idempotent; the first
    /// reason wins.
    pub fn close(&self, reason: CloseReason) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self
            .close_reason
            .lock()
            .expect("close reason lock poisoned") = Some(reason);
        self.queue
            .lock()
            .expect("connection queue lock poisoned")
            .clear();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        *self
            .close_reason
            .lock()
            .expect("close reason lock poisoned")
    }

    /// Number of frames currently queued.
    pub fn queue_len(&self) -> usize {
        self.queue
            .lock()
            .expect("connection queue lock poisoned")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn identity() -> Identity {
        Identity {
            user_id: "u1".to_string(),
            display_name: "User One".to_string(),
            role: Role::User,
        }
    }

    fn market(i: usize) -> OutboundFrame {
        OutboundFrame::coalescable(format!("market-{}", i))
    }

    #[test]
    fn test_market_burst_keeps_most_recent_in_order() {
        let conn = Connection::new(identity(), 8);
        for i in 0..100 {
            conn.enqueue(market(i));
        }

        assert_eq!(conn.queue_len(), 8);
        assert!(!conn.is_closed());
        let queue = conn.queue.lock().unwrap();
        let got: Vec<&str> = queue.iter().map(|f| f.json.as_str()).collect();
        let expect: Vec<String> = (92..100).map(|i| format!("market-{}", i)).collect();
        assert_eq!(got, expect.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_critical_frames_survive_market_pressure() {
        let conn = Connection::new(identity(), 4);
        assert!(conn.enqueue(OutboundFrame::critical("order-1".to_string())));
        for i in 0..50 {
            conn.enqueue(market(i));
        }
        assert!(conn.enqueue(OutboundFrame::critical("order-2".to_string())));

        let queue = conn.queue.lock().unwrap();
        let critical: Vec<&str> = queue
            .iter()
            .filter(|f| !f.coalescable)
            .map(|f| f.json.as_str())
            .collect();
        assert_eq!(critical, vec!["order-1", "order-2"]);
    }

    #[test]
    fn test_slow_consumer_closes_on_critical_overflow() {
        let conn = Connection::new(identity(), 2);
        assert!(conn.enqueue(OutboundFrame::critical("a".to_string())));
        assert!(conn.enqueue(OutboundFrame::critical("b".to_string())));
        assert!(!conn.enqueue(OutboundFrame::critical("c".to_string())));

        assert!(conn.is_closed());
        assert_eq!(conn.close_reason(), Some(CloseReason::SlowConsumer));
        // Queue was discarded on close.
        assert_eq!(conn.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_next_frame_fifo_then_none_after_close() {
        let conn = Connection::new(identity(), 8);
        conn.enqueue(OutboundFrame::critical("first".to_string()));
        conn.enqueue(market(0));
        conn.enqueue(OutboundFrame::critical("last".to_string()));

        assert_eq!(conn.next_frame().await.as_deref(), Some("first"));
        assert_eq!(conn.next_frame().await.as_deref(), Some("market-0"));
        assert_eq!(conn.next_frame().await.as_deref(), Some("last"));

        conn.close(CloseReason::Shutdown);
        assert_eq!(conn.next_frame().await, None);
    }

    #[test]
    fn test_enqueue_after_close_is_silent_drop() {
        let conn = Connection::new(identity(), 8);
        conn.close(CloseReason::Shutdown);
        assert!(!conn.enqueue(market(0)));
        assert_eq!(conn.queue_len(), 0);
    }
}
