//! get_taste_profile 能力：根据商品描述推断受众分群
//!
//! 画像来源实现 TasteProfileProvider：KeywordTasteProvider 离线关键词表，QlooTasteProvider 调用 Qloo Taste API。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capabilities::{
    Capability, CapabilityArgs, CapabilityOutput, Segment, TasteProfileArgs, GET_TASTE_PROFILE,
};
use crate::core::CapabilityError;
use crate::store::ResponseCache;

/// 受众画像来源
#[async_trait]
pub trait TasteProfileProvider: Send + Sync {
    async fn taste_profile(&self, description: &str) -> Result<Vec<Segment>, String>;
}

/// 关键词 -> 分群表（按亲和度降序输出）
const KEYWORD_SEGMENTS: &[(&[&str], &str, f64)] = &[
    (&["gaming", "gamer", "console", "rgb"], "Gamers", 0.92),
    (&["laptop", "phone", "smartphone", "headphones", "camera", "wireless", "bluetooth", "tech"], "Tech Enthusiasts", 0.85),
    (&["fitness", "running", "yoga", "gym", "sport", "sports"], "Fitness Enthusiasts", 0.83),
    (&["fashion", "dress", "shoes", "sneakers", "jacket", "style"], "Fashion Forward", 0.8),
    (&["kitchen", "cooking", "coffee", "kettle", "blender"], "Home Cooks", 0.78),
    (&["office", "desk", "professional", "business"], "Remote Professionals", 0.74),
    (&["kids", "baby", "toy", "toys", "family"], "Young Parents", 0.72),
    (&["budget", "cheap", "affordable", "deal", "deals"], "Value Seekers", 0.7),
    (&["luxury", "premium", "designer"], "Luxury Shoppers", 0.68),
    (&["outdoor", "camping", "hiking", "travel"], "Outdoor Adventurers", 0.66),
];

/// 离线画像：按关键词命中给出分群，最多 max_segments 个
#[derive(Debug, Clone)]
pub struct KeywordTasteProvider {
    max_segments: usize,
}

impl KeywordTasteProvider {
    pub fn new(max_segments: usize) -> Self {
        Self {
            max_segments: max_segments.max(1),
        }
    }
}

impl Default for KeywordTasteProvider {
    fn default() -> Self {
        Self::new(10)
    }
}

#[async_trait]
impl TasteProfileProvider for KeywordTasteProvider {
    async fn taste_profile(&self, description: &str) -> Result<Vec<Segment>, String> {
        let lower = description.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut segments: Vec<Segment> = KEYWORD_SEGMENTS
            .iter()
            .filter(|(keywords, _, _)| keywords.iter().any(|k| words.contains(k)))
            .map(|(_, name, score)| Segment {
                name: (*name).to_string(),
                affinity_score: *score,
            })
            .collect();
        segments.truncate(self.max_segments);
        Ok(segments)
    }
}

#[derive(Debug, Serialize)]
struct TasteProfileRequest<'a> {
    description: &'a str,
    options: TasteProfileOptions,
}

#[derive(Debug, Serialize)]
struct TasteProfileOptions {
    max_segments: usize,
}

#[derive(Debug, Deserialize)]
struct TasteProfileResponse {
    #[serde(default)]
    segments: Vec<Segment>,
}

/// Qloo Taste API 客户端：POST {base_url}/taste/profile，Bearer 认证
pub struct QlooTasteProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_segments: usize,
}

impl QlooTasteProvider {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64, max_segments: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_segments,
        }
    }
}

#[async_trait]
impl TasteProfileProvider for QlooTasteProvider {
    async fn taste_profile(&self, description: &str) -> Result<Vec<Segment>, String> {
        let url = format!("{}/taste/profile", self.base_url);
        let request = TasteProfileRequest {
            description,
            options: TasteProfileOptions {
                max_segments: self.max_segments,
            },
        };

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("failed to make request: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("qloo API returned status {}", status.as_u16()));
        }

        let body: TasteProfileResponse = resp
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))?;
        Ok(body.segments)
    }
}

/// get_taste_profile：包装画像来源并缓存
pub struct TasteProfile {
    provider: Arc<dyn TasteProfileProvider>,
    cache: Option<ResponseCache>,
}

impl TasteProfile {
    pub fn new(provider: Arc<dyn TasteProfileProvider>) -> Self {
        Self {
            provider,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[async_trait]
impl Capability for TasteProfile {
    fn name(&self) -> &str {
        GET_TASTE_PROFILE
    }

    fn description(&self) -> &str {
        "Analyze a product description to identify target audience segments with affinity scores"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(TasteProfileArgs)).unwrap_or(Value::Null)
    }

    async fn invoke(&self, args: &CapabilityArgs) -> Result<CapabilityOutput, CapabilityError> {
        let args = TasteProfileArgs::from_args(args)?;
        let description = args.description.trim();
        if description.is_empty() {
            return Ok(CapabilityOutput::Segments(Vec::new()));
        }

        let key = format!("taste:{}", description.to_lowercase());
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get::<Vec<Segment>>(&key).await {
                return Ok(CapabilityOutput::Segments(hit));
            }
        }

        let segments = self
            .provider
            .taste_profile(description)
            .await
            .map_err(|e| CapabilityError::Failed(format!("failed to get taste profile: {e}")))?;

        if let Some(cache) = &self.cache {
            cache.put(&key, &segments).await;
        }
        Ok(CapabilityOutput::Segments(segments))
    }
}
