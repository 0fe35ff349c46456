//! 准入控制：固定窗口限流
//!
//! 键 = {prefix}{identity}:{window_start}，window_start 为按窗口截断的 Unix 秒。
//! 每次请求原子自增该键，首次自增时设置过期时间为一个窗口；计数超过上限即拒绝。
//! 计数存储不可用时放行（fail-open），remaining 报告为 0。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::store::CounterStore;

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";

/// 单次准入判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// 当前窗口结束的 Unix 秒
    pub reset_at: i64,
    /// 拒绝时距窗口结束的秒数
    pub retry_after: Option<u64>,
}

impl Decision {
    /// 三个限流响应头
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            (HEADER_LIMIT, self.limit.to_string()),
            (HEADER_REMAINING, self.remaining.to_string()),
            (HEADER_RESET, self.reset_at.to_string()),
        ]
    }

    /// 拒绝时的响应体
    pub fn rejection(&self) -> Option<RateLimitRejection> {
        self.retry_after.filter(|_| !self.allowed).map(|retry_after| RateLimitRejection {
            error: "Rate limit exceeded".to_string(),
            retry_after,
        })
    }
}

/// 429 响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRejection {
    pub error: String,
    pub retry_after: u64,
}

pub struct AdmissionController {
    store: Arc<dyn CounterStore>,
    limit: u64,
    window: Duration,
    prefix: String,
    trust_forwarded_for: bool,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn CounterStore>, limit: u64, window: Duration, prefix: impl Into<String>) -> Self {
        Self {
            store,
            limit,
            window: Duration::from_secs(window.as_secs().max(1)),
            prefix: prefix.into(),
            trust_forwarded_for: false,
        }
    }

    /// 是否信任 X-Forwarded-For 作为客户端标识（默认否）
    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    pub fn from_config(cfg: &AppConfig, store: Arc<dyn CounterStore>) -> Self {
        Self::new(
            store,
            cfg.rate_limit.max_requests,
            Duration::from_secs(cfg.rate_limit.window_secs),
            cfg.rate_limit.key_prefix.clone(),
        )
        .with_trust_forwarded_for(cfg.rate_limit.trust_forwarded_for)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    fn window_secs(&self) -> i64 {
        self.window.as_secs() as i64
    }

    /// now 所在窗口的起始 Unix 秒
    pub fn window_start(&self, now: DateTime<Utc>) -> i64 {
        let w = self.window_secs();
        now.timestamp().div_euclid(w) * w
    }

    pub fn window_key(&self, identity: &str, window_start: i64) -> String {
        format!("{}{}:{}", self.prefix, identity, window_start)
    }

    /// 对 identity 做一次准入判定
    pub async fn admit(&self, identity: &str, now: DateTime<Utc>) -> Decision {
        let window_start = self.window_start(now);
        let reset_at = window_start + self.window_secs();
        let key = self.window_key(identity, window_start);

        let count = match self.store.increment(&key).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "Rate limit store unavailable, allowing request");
                return Decision {
                    allowed: true,
                    limit: self.limit,
                    remaining: 0,
                    reset_at,
                    retry_after: None,
                };
            }
        };

        if count == 1 {
            if let Err(e) = self.store.expire(&key, self.window).await {
                tracing::warn!(key = %key, error = %e, "Failed to set rate limit window expiry");
            }
        }

        let count = count.max(0) as u64;
        let remaining = self.limit.saturating_sub(count);
        if count > self.limit {
            let elapsed = now.timestamp() - window_start;
            let retry_after = (self.window_secs() - elapsed).max(1) as u64;
            tracing::info!(identity = %identity, count, retry_after, "Rate limit exceeded");
            return Decision {
                allowed: false,
                limit: self.limit,
                remaining,
                reset_at,
                retry_after: Some(retry_after),
            };
        }

        Decision {
            allowed: true,
            limit: self.limit,
            remaining,
            reset_at,
            retry_after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct DownStore;

    #[async_trait]
    impl CounterStore for DownStore {
        async fn increment(&self, _key: &str) -> Result<i64, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn get(&self, _key: &str) -> Result<String, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn controller(store: Arc<dyn CounterStore>) -> AdmissionController {
        AdmissionController::new(store, 100, Duration::from_secs(60), "ratelimit:")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_hundred_requests_allowed_then_denied() {
        let limiter = controller(Arc::new(InMemoryStore::new()));
        let now = at(1_700_000_010);

        let mut last_remaining = u64::MAX;
        for _ in 0..100 {
            let d = limiter.admit("10.0.0.1", now).await;
            assert!(d.allowed);
            assert!(d.remaining < last_remaining);
            last_remaining = d.remaining;
        }
        assert_eq!(last_remaining, 0);

        let denied = limiter.admit("10.0.0.1", now).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        let retry_after = denied.retry_after.unwrap();
        assert!(retry_after > 0 && retry_after <= 60);
        assert_eq!(denied.rejection().unwrap().error, "Rate limit exceeded");
    }

    #[tokio::test]
    async fn test_next_window_resets_count() {
        let store = Arc::new(InMemoryStore::new());
        let limiter = controller(store.clone());
        let now = at(1_700_000_010);
        for _ in 0..101 {
            limiter.admit("10.0.0.1", now).await;
        }

        let later = now + chrono::Duration::seconds(60);
        let d = limiter.admit("10.0.0.1", later).await;
        assert!(d.allowed);
        assert_eq!(d.remaining, 99);
        let key = limiter.window_key("10.0.0.1", limiter.window_start(later));
        assert_eq!(store.get(&key).await.unwrap(), "1");
    }

    #[tokio::test]
    async fn test_identities_are_counted_separately() {
        let limiter = AdmissionController::new(Arc::new(InMemoryStore::new()), 1, Duration::from_secs(60), "rl:");
        let now = at(120);
        assert!(limiter.admit("a", now).await.allowed);
        assert!(!limiter.admit("a", now).await.allowed);
        assert!(limiter.admit("b", now).await.allowed);
    }

    #[tokio::test]
    async fn test_window_key_and_reset() {
        let limiter = controller(Arc::new(InMemoryStore::new()));
        let now = at(1_700_000_010);
        assert_eq!(limiter.window_start(now), 1_699_999_980);
        assert_eq!(limiter.window_key("1.2.3.4", 1_699_999_980), "ratelimit:1.2.3.4:1699999980");

        let d = limiter.admit("1.2.3.4", now).await;
        assert_eq!(d.reset_at, 1_700_000_040);
        let headers = d.headers();
        assert_eq!(headers[0], (HEADER_LIMIT, "100".to_string()));
        assert_eq!(headers[1], (HEADER_REMAINING, "99".to_string()));
        assert_eq!(headers[2], (HEADER_RESET, "1700000040".to_string()));
    }

    #[tokio::test]
    async fn test_store_outage_fails_open() {
        let limiter = controller(Arc::new(DownStore));
        let d = limiter.admit("10.0.0.1", at(1_700_000_010)).await;
        assert!(d.allowed);
        assert_eq!(d.remaining, 0);
        assert!(d.rejection().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_swept_store_keeps_no_past_windows() {
        let store = Arc::new(InMemoryStore::new());
        let _sweeper = store.spawn_sweeper(Duration::from_secs(60));
        let limiter = controller(store.clone());

        for window in 0..200 {
            assert!(limiter.admit("10.0.0.9", at(window * 60)).await.allowed);
            tokio::time::sleep(Duration::from_secs(61)).await;
        }
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(store.purge_expired(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_from_config_carries_forwarded_for_trust() {
        let mut cfg = AppConfig::default();
        let store: Arc<dyn CounterStore> = Arc::new(InMemoryStore::new());
        assert!(!AdmissionController::from_config(&cfg, store.clone()).trusts_forwarded_for());

        cfg.rate_limit.trust_forwarded_for = true;
        assert!(AdmissionController::from_config(&cfg, store).trusts_forwarded_for());
    }
}
