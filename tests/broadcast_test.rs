//! Push-fabric tests: topic fan-out, coalescing under backpressure,
//! slow-consumer disconnects, owner filtering, and chat role gating.

use paperfloor::services::Identity;
use paperfloor::types::{MarketDelta, Role, ServerFrame, Topic};
use paperfloor::websocket::Hub;
use std::time::Duration;

fn identity(user_id: &str, role: Role) -> Identity {
    Identity {
        user_id: user_id.to_string(),
        display_name: user_id.to_string(),
        role,
    }
}

fn market_frame(i: usize) -> ServerFrame {
    ServerFrame::MarketUpdate {
        data: MarketDelta {
            symbol: format!("SYM{}", i),
            price: 100.0 + i as f64,
            change: 1.0,
            day: 1,
        },
    }
}

fn chat_frame(text: &str) -> ServerFrame {
    ServerFrame::Chat {
        data: paperfloor::types::ChatMessage::new(
            "tester",
            "Tester",
            text.to_string(),
            chrono::Utc::now(),
        ),
    }
}

async fn settle() {
    // Let the dispatcher tasks drain their queues.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_slow_subscriber_keeps_most_recent_market_updates() {
    let hub = Hub::new();
    let conn = hub.register(identity("u1", Role::User), 8);
    hub.subscribe(conn.id, Topic::MarketData).unwrap();

    // A burst far beyond the queue depth.
    for i in 0..100 {
        hub.publish_market(market_frame(i)).await;
    }
    settle().await;

    assert!(!conn.is_closed(), "coalescing must not close the connection");
    assert!(conn.queue_len() <= 8);

    // Drain: every delivered update is from the most recent window, in order.
    let mut symbols = Vec::new();
    while conn.queue_len() > 0 {
        let json = conn.next_frame().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        symbols.push(value["data"]["symbol"].as_str().unwrap().to_string());
    }
    assert_eq!(symbols.len(), 8);
    let expected: Vec<String> = (92..100).map(|i| format!("SYM{}", i)).collect();
    assert_eq!(symbols, expected);
}

#[tokio::test]
async fn test_critical_frames_survive_a_market_burst() {
    let hub = Hub::new();
    let conn = hub.register(identity("tester1", Role::Tester), 8);
    hub.subscribe(conn.id, Topic::MarketData).unwrap();
    hub.subscribe(conn.id, Topic::Chat).unwrap();

    for i in 0..100 {
        hub.publish_market(market_frame(i)).await;
    }
    settle().await;
    hub.publish_chat(chat_frame("still here")).await;
    hub.publish_chat(chat_frame("and here")).await;
    settle().await;

    assert!(!conn.is_closed());
    let mut chat_texts = Vec::new();
    while conn.queue_len() > 0 {
        let json = conn.next_frame().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        if value["type"] == "chat" {
            chat_texts.push(value["data"]["text"].as_str().unwrap().to_string());
        }
    }
    assert_eq!(chat_texts, vec!["still here", "and here"]);
}

#[tokio::test]
async fn test_order_updates_are_owner_filtered() {
    let hub = Hub::new();
    let owner = hub.register(identity("owner", Role::User), 16);
    let other = hub.register(identity("other", Role::User), 16);
    let admin = hub.register(identity("root", Role::Admin), 16);
    for conn in [&owner, &other, &admin] {
        hub.subscribe(conn.id, Topic::OrderUpdate).unwrap();
    }

    let frame = ServerFrame::Error {
        error: "placeholder order event".to_string(),
        code: "TEST".to_string(),
    };
    hub.publish_order("owner", frame).await;
    settle().await;

    assert_eq!(owner.queue_len(), 1);
    assert_eq!(other.queue_len(), 0, "other users must not see the order");
    assert_eq!(admin.queue_len(), 1, "admins observe all order traffic");
}

#[tokio::test]
async fn test_chat_subscription_requires_role() {
    let hub = Hub::new();
    let user = hub.register(identity("plain", Role::User), 8);
    let tester = hub.register(identity("tester2", Role::Tester), 8);
    let admin = hub.register(identity("root", Role::Admin), 8);

    assert!(hub.subscribe(user.id, Topic::Chat).is_err());
    assert!(hub.subscribe(tester.id, Topic::Chat).is_ok());
    assert!(hub.subscribe(admin.id, Topic::Chat).is_ok());

    // Market data needs only a valid credential.
    assert!(hub.subscribe(user.id, Topic::MarketData).is_ok());
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let hub = Hub::new();
    let conn = hub.register(identity("u1", Role::User), 8);
    hub.subscribe(conn.id, Topic::MarketData).unwrap();

    hub.publish_market(market_frame(0)).await;
    settle().await;
    assert_eq!(conn.queue_len(), 1);

    hub.unsubscribe(conn.id, Topic::MarketData);
    hub.publish_market(market_frame(1)).await;
    settle().await;
    assert_eq!(conn.queue_len(), 1);
}

#[tokio::test]
async fn test_unregister_is_idempotent_and_counts_drop() {
    let hub = Hub::new();
    let conn = hub.register(identity("u1", Role::User), 8);
    hub.subscribe(conn.id, Topic::MarketData).unwrap();
    assert_eq!(hub.client_count(), 1);
    assert_eq!(hub.subscriber_count(Topic::MarketData), 1);

    hub.unregister(conn.id);
    hub.unregister(conn.id);
    assert_eq!(hub.client_count(), 0);
    assert_eq!(hub.subscriber_count(Topic::MarketData), 0);
}
