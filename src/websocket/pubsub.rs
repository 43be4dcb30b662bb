use crate::redis_client::RedisClient;
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::ConnectionRegistry;
use futures_util::StreamExt;
use redis::AsyncCommands;

/// Single pub/sub channel carrying every chat message for the room.
pub const CHAT_CHANNEL: &str = "chat_channel";

/// Publish a serialized chat envelope to the bus.
///
/// Delivery back to local connections happens only via the listener, so the
/// sender's own echo takes the same path as everyone else's copy. A failed
/// publish drops the message for all subscribers.
pub async fn publish(redis: &RedisClient, payload: &str) -> redis::RedisResult<()> {
    let mut conn = redis.connection();
    conn.publish::<_, _, ()>(CHAT_CHANNEL, payload).await
}

/// Long-lived bus listener: one per process, spawned at startup.
///
/// Delivers every received payload, unchanged, to all locally registered
/// connections. Returning means the subscription ended; the caller treats
/// that as fatal to this process's chat fan-out.
pub async fn start_pubsub_listener(
    redis_url: &str,
    registry: ConnectionRegistry,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not the multiplexed manager
    let client = redis::Client::open(redis_url)?;
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.subscribe(CHAT_CHANNEL).await?;

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable bus payload");
                continue;
            }
        };

        // Validate the envelope, then fan out the serialized form untouched.
        if let Err(e) = WsOutboundEvent::from_json(&payload) {
            tracing::warn!(error = %e, "discarding malformed bus payload");
            continue;
        }

        registry.broadcast(payload).await;
    }

    Ok(())
}
