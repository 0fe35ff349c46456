//! 共享计数 / 缓存存储
//!
//! CounterStore 提供原子自增 + 按键过期；限流计数（ratelimit:）与能力结果缓存（cache:）
//! 共用同一实例，但使用互不重叠的键前缀。

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// 存储错误：键不存在、后端不可用、序列化失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// 计数存储接口：自增必须原子（并发自增同一键不丢失），过期按键生效
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 自增并返回自增后的值；键不存在时从 0 开始
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// 为已存在的键设置过期时间
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// 读取原始字符串值；不存在返回 NotFound
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// 写入原始字符串值；ttl 为 None 表示不过期
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError>;
}

/// 能力结果缓存：JSON 序列化 + 统一前缀 + 统一 TTL；任何存储错误都按未命中处理
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CounterStore>,
    prefix: String,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CounterStore>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ttl,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full = self.full_key(key);
        match self.store.get(&full).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %full, error = %e, "Cached value is not valid JSON, ignoring");
                    None
                }
            },
            Err(StoreError::NotFound) => None,
            Err(e) => {
                tracing::warn!(key = %full, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let full = self.full_key(key);
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %full, error = %e, "Cache value serialization failed");
                return;
            }
        };
        if let Err(e) = self.store.set(&full, raw, Some(self.ttl)).await {
            tracing::warn!(key = %full, error = %e, "Cache write failed");
        }
    }
}
