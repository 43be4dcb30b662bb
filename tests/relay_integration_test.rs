// Chat relay integration tests
//
// The scenario tests exercise the local fan-out path (registry + envelopes)
// and run everywhere. The Redis-backed tests cover the presence set and the
// pub/sub bus end to end; they are ignored by default and run against a live
// Redis (REDIS_URL, default redis://127.0.0.1:6379) with
// `cargo test -- --ignored`.

use chat_relay_service::presence::PresenceStore;
use chat_relay_service::redis_client::RedisClient;
use chat_relay_service::websocket::message_types::{ChatPayload, WsOutboundEvent};
use chat_relay_service::websocket::{pubsub, ConnectionRegistry};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep, timeout};

fn roster_frame(names: &[&str]) -> String {
    WsOutboundEvent::Clients {
        clients: names.iter().map(|s| s.to_string()).collect(),
    }
    .to_json()
    .expect("serialize roster")
}

fn chat_frame(sender: &str, message: &str) -> String {
    WsOutboundEvent::Message {
        data: ChatPayload {
            sender: sender.to_string(),
            message: message.to_string(),
        },
    }
    .to_json()
    .expect("serialize chat message")
}

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into())
}

#[actix_rt::test]
async fn roster_update_reaches_all_open_connections() {
    let registry = ConnectionRegistry::new();
    let (_alice, mut rx_alice) = registry.add_subscriber().await;
    let (_bob, mut rx_bob) = registry.add_subscriber().await;

    registry.broadcast(roster_frame(&["alice", "bob"])).await;

    for rx in [&mut rx_alice, &mut rx_bob] {
        let frame = rx.recv().await.expect("roster frame");
        match WsOutboundEvent::from_json(&frame).expect("valid envelope") {
            WsOutboundEvent::Clients { clients } => {
                let roster: HashSet<String> = clients.into_iter().collect();
                assert_eq!(
                    roster,
                    HashSet::from(["alice".to_string(), "bob".to_string()])
                );
            }
            other => panic!("expected roster update, got {other:?}"),
        }
    }
}

#[actix_rt::test]
async fn chat_message_fans_out_to_sender_too() {
    let registry = ConnectionRegistry::new();
    let (_alice, mut rx_alice) = registry.add_subscriber().await;
    let (_bob, mut rx_bob) = registry.add_subscriber().await;

    // What the bus listener does with a received payload: deliver it
    // unchanged to every local connection, the sender's own included.
    let payload = chat_frame("alice", "hello");
    registry.broadcast(payload.clone()).await;

    assert_eq!(rx_alice.recv().await.as_deref(), Some(payload.as_str()));
    assert_eq!(rx_bob.recv().await.as_deref(), Some(payload.as_str()));
}

#[actix_rt::test]
async fn closing_one_connection_leaves_the_rest_delivering() {
    let registry = ConnectionRegistry::new();
    let (_alice, mut rx_alice) = registry.add_subscriber().await;
    let (bob, mut rx_bob) = registry.add_subscriber().await;

    registry.remove_subscriber(bob).await;
    registry.broadcast(roster_frame(&["alice"])).await;

    let frame = rx_alice.recv().await.expect("roster frame");
    match WsOutboundEvent::from_json(&frame).expect("valid envelope") {
        WsOutboundEvent::Clients { clients } => assert_eq!(clients, vec!["alice".to_string()]),
        other => panic!("expected roster update, got {other:?}"),
    }

    // Bob's delivery channel closed with his registry entry.
    assert!(rx_bob.recv().await.is_none());
}

#[tokio::test]
#[ignore] // requires a live Redis
async fn presence_set_round_trip() {
    let redis = RedisClient::connect(&redis_url()).await.expect("redis");
    let presence = PresenceStore::new(redis);
    let name = format!("it-user-{}", uuid::Uuid::new_v4().simple());

    presence.add(&name).await.expect("add");
    assert!(presence.list_all().await.expect("list").contains(&name));

    presence.remove(&name).await.expect("remove");
    assert!(!presence.list_all().await.expect("list").contains(&name));

    // A second removal is a no-op, not an error.
    presence.remove(&name).await.expect("remove twice");
}

#[tokio::test]
#[ignore] // requires a live Redis
async fn bus_publish_round_trips_through_listener() {
    let url = redis_url();
    let registry = ConnectionRegistry::new();

    let listener_registry = registry.clone();
    let listener_url = url.clone();
    tokio::spawn(async move {
        if let Err(e) = pubsub::start_pubsub_listener(&listener_url, listener_registry).await {
            eprintln!("listener ended: {e}");
        }
    });
    // Let the subscription land before publishing.
    sleep(Duration::from_millis(250)).await;

    let (_id, mut rx) = registry.add_subscriber().await;

    let redis = RedisClient::connect(&url).await.expect("redis");
    let payload = chat_frame("alice", "hello");
    pubsub::publish(&redis, &payload).await.expect("publish");

    let delivered = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("delivery within 2s")
        .expect("channel open");
    assert_eq!(delivered, payload);
}
