//! 编排器构建器：按配置装配计数存储、响应缓存、能力注册表、重试执行器与补全客户端
//!
//! CLI 与 HTTP 入口共用同一套装配逻辑。

use std::sync::Arc;
use std::time::Duration;

use crate::capabilities::{
    AdCopyGenerator, Capability, CapabilityRegistry, KeywordTasteProvider, MarketplaceClient,
    MarketplaceSearch, MockMarketplace, QlooTasteProvider, TasteProfile, TasteProfileProvider,
};
use crate::config::AppConfig;
use crate::core::{Orchestrator, RetryExecutor, RetryPolicy};
use crate::llm::{create_completion_from_config, CompletionClient};
use crate::store::{CounterStore, InMemoryStore, ResponseCache};

/// 按配置创建计数存储：启用 redis feature 且配置了 cache.redis_url 时连接 Redis，失败或未配置时使用内存存储
///
/// 内存存储同时启动过期条目清扫任务。
pub async fn create_store_from_config(cfg: &AppConfig) -> Arc<dyn CounterStore> {
    if let Some(url) = cfg.cache.redis_url.as_deref() {
        if let Some(store) = connect_redis(url).await {
            return store;
        }
    }
    let store = Arc::new(InMemoryStore::new());
    store.spawn_sweeper(Duration::from_secs(cfg.cache.sweep_interval_secs));
    tracing::debug!(every_secs = cfg.cache.sweep_interval_secs, "In-memory store sweeper started");
    store
}

#[cfg(feature = "redis")]
async fn connect_redis(url: &str) -> Option<Arc<dyn CounterStore>> {
    match crate::store::redis::RedisStore::connect(url).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!("Redis unavailable ({}), falling back to in-memory store", e);
            None
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(_url: &str) -> Option<Arc<dyn CounterStore>> {
    tracing::warn!("cache.redis_url is set but the redis feature is disabled, using in-memory store");
    None
}

pub struct OrchestratorBuilder {
    config: AppConfig,
    store: Option<Arc<dyn CounterStore>>,
    completion: Option<Arc<dyn CompletionClient>>,
    extra_capabilities: Vec<Arc<dyn Capability>>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: None,
            completion: None,
            extra_capabilities: Vec::new(),
        }
    }

    /// 共享的计数存储（缓存与限流使用不同 key 前缀）
    pub fn with_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_completion(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.completion = Some(client);
        self
    }

    /// 追加或替换（同名）能力
    pub fn with_capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.extra_capabilities.push(capability);
        self
    }

    fn marketplace_clients(&self) -> Vec<Arc<dyn MarketplaceClient>> {
        self.config
            .marketplace
            .providers
            .iter()
            .filter_map(|name| match MockMarketplace::by_name(name) {
                Some(client) => Some(Arc::new(client) as Arc<dyn MarketplaceClient>),
                None => {
                    tracing::warn!(marketplace = %name, "Unknown marketplace provider, skipping");
                    None
                }
            })
            .collect()
    }

    fn taste_provider(&self) -> Arc<dyn TasteProfileProvider> {
        let taste = &self.config.taste;
        if taste.provider.eq_ignore_ascii_case("qloo") {
            if let Ok(key) = std::env::var("QLOO_API_KEY") {
                tracing::info!("Using Qloo taste provider ({})", taste.base_url);
                return Arc::new(QlooTasteProvider::new(
                    &taste.base_url,
                    &key,
                    taste.timeout_secs,
                    taste.max_segments,
                ));
            }
            tracing::warn!("QLOO_API_KEY not set, using keyword taste provider");
        }
        Arc::new(KeywordTasteProvider::new(taste.max_segments))
    }

    /// 内置三个能力 + 额外注册的能力
    pub fn build_registry(&self, cache: Option<ResponseCache>) -> CapabilityRegistry {
        let mut search = MarketplaceSearch::new(self.marketplace_clients());
        let mut taste = TasteProfile::new(self.taste_provider());
        if let Some(cache) = cache {
            search = search.with_cache(cache.clone());
            taste = taste.with_cache(cache);
        }

        let mut registry = CapabilityRegistry::new();
        registry.register(search);
        registry.register(taste);
        registry.register(AdCopyGenerator::new());
        for capability in &self.extra_capabilities {
            registry.register_arc(capability.clone());
        }
        registry
    }

    pub fn build(self) -> Orchestrator {
        let cfg = &self.config;
        let store = self
            .store
            .clone()
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let cache = ResponseCache::new(
            store,
            cfg.cache.key_prefix.clone(),
            Duration::from_secs(cfg.cache.ttl_secs),
        );
        let registry = self.build_registry(Some(cache));

        let completion = self
            .completion
            .clone()
            .unwrap_or_else(|| create_completion_from_config(cfg, &registry.to_schema_json()));

        let policy = RetryPolicy {
            max_attempts: cfg.orchestrator.max_attempts,
            base_delay: Duration::from_millis(cfg.orchestrator.base_delay_ms),
        };
        let executor = RetryExecutor::new(
            registry,
            policy,
            Duration::from_secs(cfg.orchestrator.capability_timeout_secs.max(1)),
        );
        tracing::info!(capabilities = ?executor.registry().names(), "Orchestrator ready");

        Orchestrator::new(executor, completion)
            .with_request_timeout(Duration::from_secs(cfg.app.request_timeout_secs.max(1)))
    }
}
