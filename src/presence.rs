use crate::redis_client::RedisClient;
use redis::{AsyncCommands, RedisResult};

/// Redis SET holding every username currently online, across all processes.
const ONLINE_CLIENTS_KEY: &str = "online_clients";

/// Cross-process presence set.
///
/// Each operation is a single Redis command and therefore atomic on its own;
/// there is no transaction spanning an add/remove and the roster read that
/// follows it, so a roster built by one process may briefly lag concurrent
/// joins and leaves elsewhere.
#[derive(Clone)]
pub struct PresenceStore {
    redis: RedisClient,
}

impl PresenceStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    /// Set union: adding a name twice is a no-op. The set tracks names, not
    /// connection counts.
    pub async fn add(&self, username: &str) -> RedisResult<()> {
        let mut conn = self.redis.connection();
        conn.sadd::<_, _, ()>(ONLINE_CLIENTS_KEY, username).await
    }

    /// Removing an absent name is a no-op.
    pub async fn remove(&self, username: &str) -> RedisResult<()> {
        let mut conn = self.redis.connection();
        conn.srem::<_, _, ()>(ONLINE_CLIENTS_KEY, username).await
    }

    pub async fn list_all(&self) -> RedisResult<Vec<String>> {
        let mut conn = self.redis.connection();
        conn.smembers(ONLINE_CLIENTS_KEY).await
    }
}
