use crate::{presence::PresenceStore, redis_client::RedisClient, websocket::ConnectionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub redis: RedisClient,
    pub presence: PresenceStore,
}
