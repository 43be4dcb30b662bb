use crate::error::AppError;
use crate::presence::PresenceStore;
use crate::redis_client::RedisClient;
use crate::state::AppState;
use crate::websocket::message_types::{ChatPayload, WsOutboundEvent};
use crate::websocket::pubsub;
use crate::websocket::{ConnectionRegistry, SubscriberId};
use actix::fut::wrap_future;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub username: Option<String>,
}

// Message type for delivering broadcast frames to the WebSocket actor
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct BroadcastMessage(String);

/// One client connection's lifecycle: register on open, relay inbound text
/// through the bus, deregister on close.
struct WsSession {
    username: String,
    subscriber_id: SubscriberId,
    registry: ConnectionRegistry,
    redis: RedisClient,
    presence: PresenceStore,
}

impl WsSession {
    fn new(
        username: String,
        subscriber_id: SubscriberId,
        registry: ConnectionRegistry,
        redis: RedisClient,
        presence: PresenceStore,
    ) -> Self {
        Self {
            username,
            subscriber_id,
            registry,
            redis,
            presence,
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(username = %self.username, "chat session opened");

        // Welcome goes to this connection only.
        let welcome = WsOutboundEvent::Welcome {
            message: format!("Welcome to the chat, {}!", self.username),
        };
        match welcome.to_json() {
            Ok(frame) => ctx.text(frame),
            Err(e) => tracing::warn!(error = %e, "failed to serialize welcome"),
        }

        let presence = self.presence.clone();
        let registry = self.registry.clone();
        actix::spawn(async move {
            broadcast_roster(&presence, &registry).await;
        });
    }

    /// Runs exactly once per session, on any close path. Registry and
    /// presence removals are both no-ops when already gone.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(username = %self.username, "chat session closed");

        let registry = self.registry.clone();
        let presence = self.presence.clone();
        let subscriber_id = self.subscriber_id;
        let username = self.username.clone();

        actix::spawn(async move {
            registry.remove_subscriber(subscriber_id).await;
            if let Err(e) = presence.remove(&username).await {
                tracing::warn!(error = %e, username = %username, "presence cleanup failed");
            }
            broadcast_roster(&presence, &registry).await;
        });
    }
}

// Frames fanned out by the bus listener (or a roster update) arrive here via
// the forwarding task and go straight to the socket.
impl Handler<BroadcastMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: BroadcastMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                // The raw payload is the message body; no inbound envelope,
                // no validation. Local delivery happens only when the bus
                // echoes the message back through the listener.
                let envelope = WsOutboundEvent::Message {
                    data: ChatPayload {
                        sender: self.username.clone(),
                        message: text.to_string(),
                    },
                };
                let redis = self.redis.clone();
                // wait() suspends the mailbox until the publish resolves,
                // keeping publishes in frame receipt order.
                ctx.wait(wrap_future(async move {
                    match envelope.to_json() {
                        Ok(payload) => {
                            if let Err(e) = pubsub::publish(&redis, &payload).await {
                                tracing::warn!(error = %e, "chat message dropped: publish failed");
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to serialize chat envelope"),
                    }
                }));
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("WebSocket close message received: {:?}", reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!(error = %e, "websocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Read the full presence set, serialize one roster frame, deliver it to
/// every locally registered connection.
pub async fn broadcast_roster(presence: &PresenceStore, registry: &ConnectionRegistry) {
    let clients = match presence.list_all().await {
        Ok(clients) => clients,
        Err(e) => {
            tracing::warn!(error = %e, "roster update skipped: failed to read presence set");
            return;
        }
    };

    match (WsOutboundEvent::Clients { clients }).to_json() {
        Ok(frame) => registry.broadcast(frame).await,
        Err(e) => tracing::warn!(error = %e, "failed to serialize roster update"),
    }
}

fn resolve_username(requested: Option<String>) -> String {
    requested
        .filter(|name| !name.is_empty())
        .unwrap_or_else(generate_username)
}

/// Fallback display name: `User-` plus the first 8 hex chars of a UUIDv4.
/// Not guaranteed unique; collisions are not resolved.
fn generate_username() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("User-{}", &suffix[..8])
}

// HTTP handler
#[get("/websocket")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let username = resolve_username(query.into_inner().username);

    // Presence-store failure fails the upgrade; nothing to clean up yet.
    state.presence.add(&username).await.map_err(AppError::from)?;

    // Register subscriber
    let (subscriber_id, mut rx) = state.registry.add_subscriber().await;

    let session = WsSession::new(
        username.clone(),
        subscriber_id,
        state.registry.clone(),
        state.redis.clone(),
        state.presence.clone(),
    );

    let (addr, resp) = match ws::WsResponseBuilder::new(session, &req, stream).start_with_addr() {
        Ok(started) => started,
        Err(e) => {
            // Handshake failed before the actor existed; undo registration.
            state.registry.remove_subscriber(subscriber_id).await;
            if let Err(err) = state.presence.remove(&username).await {
                tracing::warn!(error = %err, username = %username, "presence cleanup failed");
            }
            return Err(e);
        }
    };

    // Bridge the registry's delivery channel into the actor mailbox. The
    // sender is dropped on deregistration, which ends this task.
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            addr.do_send(BroadcastMessage(frame));
        }
    });

    Ok(resp)
}
