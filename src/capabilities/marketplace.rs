//! search_marketplace 能力：多平台并发搜索
//!
//! 每个平台实现 MarketplaceClient；单个平台失败只记录告警并跳过，全部失败时能力整体失败，
//! 交给 RetryExecutor 重试。结果按价格区间过滤并缓存。

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use schemars::schema_for;
use serde_json::Value;

use crate::capabilities::{
    Capability, CapabilityArgs, CapabilityOutput, Product, SearchMarketplaceArgs, SEARCH_MARKETPLACE,
};
use crate::core::CapabilityError;
use crate::store::ResponseCache;

/// 单个电商平台客户端
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    fn name(&self) -> &str;

    /// 搜索商品；价格为 0 表示不限
    async fn search(&self, query: &str, min_price: f64, max_price: f64) -> Result<Vec<Product>, String>;
}

/// 离线模拟平台：由查询词确定性地生成商品（无需 API Key）
#[derive(Debug, Clone)]
pub struct MockMarketplace {
    name: String,
    base_url: String,
    /// (标题模板, 基准价)；模板中的 {} 替换为查询词
    catalog: Vec<(&'static str, f64)>,
}

impl MockMarketplace {
    pub fn amazon() -> Self {
        Self {
            name: "amazon".to_string(),
            base_url: "https://amazon.com/dp".to_string(),
            catalog: vec![
                ("Amazon's Choice: {} - Premium Quality", 29.99),
                ("Best Seller {} with Fast Shipping", 19.99),
                ("{} Pro Edition", 49.99),
            ],
        }
    }

    pub fn ebay() -> Self {
        Self {
            name: "ebay".to_string(),
            base_url: "https://www.ebay.com/itm".to_string(),
            catalog: vec![
                ("{} - Brand New, Free Shipping", 24.50),
                ("Used {} in Great Condition", 12.00),
            ],
        }
    }

    pub fn jumia() -> Self {
        Self {
            name: "jumia".to_string(),
            base_url: "https://www.jumia.com.ng".to_string(),
            catalog: vec![
                ("{} - Official Store", 27.75),
                ("Generic {} Value Pack", 9.99),
            ],
        }
    }

    /// 按名称构造；未知名称返回 None
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "amazon" => Some(Self::amazon()),
            "ebay" => Some(Self::ebay()),
            "jumia" => Some(Self::jumia()),
            _ => None,
        }
    }
}

/// 模拟价格：给出上下界时按目录位置均匀分布在区间内；否则取基准价，由上层价格过滤决定去留
fn mock_price(base: f64, index: usize, total: usize, min_price: f64, max_price: f64) -> f64 {
    let price = if min_price > 0.0 && max_price >= min_price {
        let step = (max_price - min_price) / (total + 1) as f64;
        min_price + step * (index + 1) as f64
    } else {
        base
    };
    (price * 100.0).round() / 100.0
}

fn title_case(query: &str) -> String {
    query
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl MarketplaceClient for MockMarketplace {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, min_price: f64, max_price: f64) -> Result<Vec<Product>, String> {
        let display = title_case(query);
        let slug = query.split_whitespace().collect::<Vec<_>>().join("-");
        let total = self.catalog.len();
        Ok(self
            .catalog
            .iter()
            .enumerate()
            .map(|(i, (template, base))| Product {
                title: template.replace("{}", &display),
                price: mock_price(*base, i, total, min_price, max_price),
                link: format!("{}/{}-{}", self.base_url, slug, i + 1),
            })
            .collect())
    }
}

/// search_marketplace：汇总所有平台结果
pub struct MarketplaceSearch {
    clients: Vec<Arc<dyn MarketplaceClient>>,
    cache: Option<ResponseCache>,
}

impl MarketplaceSearch {
    pub fn new(clients: Vec<Arc<dyn MarketplaceClient>>) -> Self {
        Self {
            clients,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn cache_key(args: &SearchMarketplaceArgs) -> String {
        format!(
            "marketplace:{}:{}:{}",
            args.query.trim().to_lowercase(),
            args.min_price,
            args.max_price
        )
    }

    async fn search_all(&self, args: &SearchMarketplaceArgs) -> Result<Vec<Product>, CapabilityError> {
        let searches = self
            .clients
            .iter()
            .map(|c| c.search(&args.query, args.min_price, args.max_price));
        let results = join_all(searches).await;

        let mut products = Vec::new();
        let mut failures = Vec::new();
        for (client, result) in self.clients.iter().zip(results) {
            match result {
                Ok(found) => products.extend(found),
                Err(e) => {
                    tracing::warn!(marketplace = client.name(), error = %e, "Marketplace search failed, skipping");
                    failures.push(format!("{}: {}", client.name(), e));
                }
            }
        }

        if !self.clients.is_empty() && failures.len() == self.clients.len() {
            return Err(CapabilityError::Failed(format!(
                "all marketplaces failed ({})",
                failures.join("; ")
            )));
        }

        products.retain(|p| {
            (args.min_price <= 0.0 || p.price >= args.min_price)
                && (args.max_price <= 0.0 || p.price <= args.max_price)
        });
        Ok(products)
    }
}

#[async_trait]
impl Capability for MarketplaceSearch {
    fn name(&self) -> &str {
        SEARCH_MARKETPLACE
    }

    fn description(&self) -> &str {
        "Search for products across multiple marketplaces (Amazon, eBay, Jumia) with optional price filtering"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(SearchMarketplaceArgs)).unwrap_or(Value::Null)
    }

    async fn invoke(&self, args: &CapabilityArgs) -> Result<CapabilityOutput, CapabilityError> {
        let args = SearchMarketplaceArgs::from_args(args)?;
        let key = Self::cache_key(&args);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get::<Vec<Product>>(&key).await {
                tracing::debug!(query = %args.query, "Marketplace cache hit");
                return Ok(CapabilityOutput::Products(hit));
            }
        }

        let products = self.search_all(&args).await?;
        if let Some(cache) = &self.cache {
            cache.put(&key, &products).await;
        }
        Ok(CapabilityOutput::Products(products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilityCall;
    use crate::store::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct BrokenMarketplace;

    #[async_trait]
    impl MarketplaceClient for BrokenMarketplace {
        fn name(&self) -> &str {
            "broken"
        }

        async fn search(&self, _q: &str, _min: f64, _max: f64) -> Result<Vec<Product>, String> {
            Err("503 Service Unavailable".to_string())
        }
    }

    struct CountingMarketplace {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketplaceClient for CountingMarketplace {
        fn name(&self) -> &str {
            "counting"
        }

        async fn search(&self, q: &str, _min: f64, _max: f64) -> Result<Vec<Product>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Product {
                title: q.to_string(),
                price: 10.0,
                link: "https://example.com/1".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn test_aggregates_all_mock_marketplaces_in_order() {
        let search = MarketplaceSearch::new(vec![
            Arc::new(MockMarketplace::amazon()),
            Arc::new(MockMarketplace::ebay()),
        ]);
        let out = search
            .invoke(&CapabilityCall::search("desk lamp", 0.0, 0.0).args)
            .await
            .unwrap();
        let CapabilityOutput::Products(products) = out else {
            panic!("expected products");
        };
        assert_eq!(products.len(), 5);
        assert!(products[0].title.contains("Desk Lamp"));
        assert!(products[3].link.starts_with("https://www.ebay.com"));
    }

    #[tokio::test]
    async fn test_price_bounds_are_respected() {
        let search = MarketplaceSearch::new(vec![Arc::new(MockMarketplace::amazon())]);
        let out = search
            .invoke(&CapabilityCall::search("mouse", 20.0, 30.0).args)
            .await
            .unwrap();
        let CapabilityOutput::Products(products) = out else {
            panic!("expected products");
        };
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| p.price >= 20.0 && p.price <= 30.0));
    }

    #[tokio::test]
    async fn test_bounded_range_spreads_prices() {
        let search = MarketplaceSearch::new(vec![Arc::new(MockMarketplace::amazon())]);
        let out = search
            .invoke(&CapabilityCall::search("mouse", 100.0, 300.0).args)
            .await
            .unwrap();
        let CapabilityOutput::Products(products) = out else {
            panic!("expected products");
        };
        let prices: Vec<f64> = products.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![150.0, 200.0, 250.0]);
    }

    #[tokio::test]
    async fn test_upper_bound_filters_out_pricier_items() {
        let search = MarketplaceSearch::new(vec![
            Arc::new(MockMarketplace::amazon()),
            Arc::new(MockMarketplace::ebay()),
        ]);
        let out = search
            .invoke(&CapabilityCall::search("mouse", 0.0, 20.0).args)
            .await
            .unwrap();
        let CapabilityOutput::Products(products) = out else {
            panic!("expected products");
        };
        let prices: Vec<f64> = products.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![19.99, 12.0]);

        let out = search
            .invoke(&CapabilityCall::search("mouse", 25.0, 0.0).args)
            .await
            .unwrap();
        assert!(matches!(out, CapabilityOutput::Products(p) if p.len() == 2 && p.iter().all(|p| p.price >= 25.0)));
    }

    #[tokio::test]
    async fn test_partial_provider_failure_is_skipped() {
        let search = MarketplaceSearch::new(vec![
            Arc::new(BrokenMarketplace),
            Arc::new(MockMarketplace::jumia()),
        ]);
        let out = search
            .invoke(&CapabilityCall::search("kettle", 0.0, 0.0).args)
            .await
            .unwrap();
        assert!(matches!(out, CapabilityOutput::Products(p) if p.len() == 2));
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_an_error() {
        let search = MarketplaceSearch::new(vec![Arc::new(BrokenMarketplace)]);
        let err = search
            .invoke(&CapabilityCall::search("kettle", 0.0, 0.0).args)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("all marketplaces failed"));
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let counting = Arc::new(CountingMarketplace {
            calls: AtomicUsize::new(0),
        });
        let cache = ResponseCache::new(Arc::new(InMemoryStore::new()), "cache:", Duration::from_secs(600));
        let search = MarketplaceSearch::new(vec![counting.clone() as Arc<dyn MarketplaceClient>]).with_cache(cache);

        let call = CapabilityCall::search("lamp", 0.0, 0.0);
        search.invoke(&call.args).await.unwrap();
        search.invoke(&call.args).await.unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_query_is_rejected() {
        let search = MarketplaceSearch::new(vec![Arc::new(MockMarketplace::amazon())]);
        let call = CapabilityCall::from_json(SEARCH_MARKETPLACE, serde_json::json!({"min_price": 5}));
        let err = search.invoke(&call.args).await.unwrap_err();
        assert_eq!(err.to_string(), "missing or invalid query parameter");
    }
}
