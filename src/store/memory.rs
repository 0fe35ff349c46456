//! 进程内计数存储
//!
//! 单把互斥锁保护整张表，自增与过期检查在同一临界区内完成，保证并发自增不丢失。
//! 过期条目在访问时惰性清除；限流键按窗口划分、过期后不会再被访问，
//! 因此长期运行的进程需通过 spawn_sweeper 周期性调用 purge_expired。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{CounterStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|t| now >= t).unwrap_or(false)
    }
}

/// 内存版 CounterStore（单进程部署 / 测试）
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// 清除所有已过期条目，返回清除数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        match self.lock() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, e| !e.is_expired(now));
                before - entries.len()
            }
            Err(_) => 0,
        }
    }

    /// 后台周期清扫过期条目；store 被释放后任务自行退出
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        let every = every.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(every);
            // 首个 tick 立即返回
            timer.tick().await;
            loop {
                timer.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired store entries");
                }
            }
        })
    }

    /// 当前未过期条目数
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|entries| entries.values().filter(|e| !e.is_expired(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        if entries.get(key).map(|e| e.is_expired(now)).unwrap_or(false) {
            entries.remove(key);
        }
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        let current: i64 = entry.value.parse().map_err(|_| {
            StoreError::Serialization(format!("value at {key} is not an integer"))
        })?;
        let next = current + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let now = Instant::now();
        let entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(entry.value.clone()),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|t| now + t),
            },
        );
        Ok(())
    }
}
