//! Redis 计数存储（feature = "redis"）
//!
//! 使用 ConnectionManager 自动重连；INCR / EXPIRE / GET / SET EX 均为单命令，原子性由 Redis 保证。

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{CounterStore, StoreError};

pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// 连接 Redis；url 形如 redis://127.0.0.1:6379
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        tracing::info!("Connected to Redis at {}", url);
        Ok(Self { conn })
    }
}

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1i64).await.map_err(unavailable)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let applied: bool = conn
            .expire(key, ttl.as_secs().max(1) as usize)
            .await
            .map_err(unavailable)?;
        if applied {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(unavailable)?;
        value.ok_or(StoreError::NotFound)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn
                .set_ex(key, value, ttl.as_secs().max(1) as usize)
                .await
                .map_err(unavailable),
            None => conn.set(key, value).await.map_err(unavailable),
        }
    }
}
