//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SHOPWRIGHT__*` 覆盖（双下划线表示嵌套，如 `SHOPWRIGHT__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub orchestrator: OrchestratorSection,
    pub rate_limit: RateLimitSection,
    pub cache: CacheSection,
    pub llm: LlmSection,
    pub marketplace: MarketplaceSection,
    pub taste: TasteSection,
    pub server: ServerSection,
}

/// [app] 段：应用名、单次请求截止时间
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// process_message_with_timeout 的默认截止时间（秒）
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// [orchestrator] 段：重试策略与单次能力调用超时
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    /// 总尝试次数（含首次）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 退避基数：第 n 次失败后等待 base * 2^n
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_capability_timeout_secs")]
    pub capability_timeout_secs: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            capability_timeout_secs: default_capability_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_capability_timeout_secs() -> u64 {
    30
}

/// [rate_limit] 段：固定窗口限流
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// 计数键前缀，必须与缓存前缀不同
    #[serde(default = "default_rate_limit_prefix")]
    pub key_prefix: String,
    /// 是否以 X-Forwarded-For 首项作为客户端标识；仅在可信反向代理之后开启
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            key_prefix: default_rate_limit_prefix(),
            trust_forwarded_for: false,
        }
    }
}

fn default_max_requests() -> u64 {
    100
}

fn default_window_secs() -> u64 {
    60
}

fn default_rate_limit_prefix() -> String {
    "ratelimit:".to_string()
}

/// [cache] 段：能力结果缓存；redis_url 仅在启用 redis feature 时生效
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_prefix")]
    pub key_prefix: String,
    pub redis_url: Option<String>,
    /// 内存存储清扫过期条目的周期（秒）
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            key_prefix: default_cache_prefix(),
            redis_url: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_cache_prefix() -> String {
    "cache:".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// [llm] 段：Unknown 意图兜底使用的补全后端
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：mock / openai；openai 还需要 OPENAI_API_KEY
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

/// [marketplace] 段：启用的电商平台
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceSection {
    #[serde(default = "default_marketplaces")]
    pub providers: Vec<String>,
}

impl Default for MarketplaceSection {
    fn default() -> Self {
        Self {
            providers: default_marketplaces(),
        }
    }
}

fn default_marketplaces() -> Vec<String> {
    vec!["amazon".into(), "ebay".into(), "jumia".into()]
}

/// [taste] 段：受众画像来源（keyword 离线表 / qloo）
#[derive(Debug, Clone, Deserialize)]
pub struct TasteSection {
    #[serde(default = "default_taste_provider")]
    pub provider: String,
    #[serde(default = "default_taste_base_url")]
    pub base_url: String,
    #[serde(default = "default_taste_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
}

impl Default for TasteSection {
    fn default() -> Self {
        Self {
            provider: default_taste_provider(),
            base_url: default_taste_base_url(),
            timeout_secs: default_taste_timeout_secs(),
            max_segments: default_max_segments(),
        }
    }
}

fn default_taste_provider() -> String {
    "keyword".to_string()
}

fn default_taste_base_url() -> String {
    "https://api.qloo.com/v1".to_string()
}

fn default_taste_timeout_secs() -> u64 {
    30
}

fn default_max_segments() -> usize {
    10
}

/// [server] 段：HTTP 监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// 从 config 目录加载配置，环境变量 SHOPWRIGHT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SHOPWRIGHT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SHOPWRIGHT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 加载失败时退回默认配置并记录告警（二进制入口使用）
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    })
}
