use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};

/// Shared handle to the multiplexed Redis connection.
///
/// The underlying [`ConnectionManager`] reconnects on command failure, so one
/// manager serves the whole process; clones are cheap.
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    pub fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}
