//! Redis-backed key-value client

use super::{KeyValue, StoreError, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis connection shared across requests
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    /// Connect and verify the server answers PING
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Unavailable(format!("connect to {url} timed out")))?
            .map_err(unavailable)?;
        let kv = Self { conn };
        kv.ping().await?;
        Ok(kv)
    }
}

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

async fn bounded<T, F>(op: &'static str, fut: F) -> StoreResult<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    timeout(COMMAND_TIMEOUT, fut)
        .await
        .map_err(|_| StoreError::Unavailable(format!("redis {op} timed out")))?
        .map_err(unavailable)
}

#[async_trait]
impl KeyValue for RedisKv {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = bounded("PING", async move {
            redis::cmd("PING").query_async(&mut conn).await
        })
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        bounded("GET", async move { conn.get(key).await }).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                bounded("SET", async move { conn.set_ex(key, value, ttl.as_secs()).await }).await
            }
            None => bounded("SET", async move { conn.set(key, value).await }).await,
        }
    }
}
