//! LLM 层：未识别意图时的补全协作者（CompletionClient）及其实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use mock::MockCompletionClient;
pub use openai::OpenAiCompletionClient;
pub use traits::{parse_completion, Completion, CompletionClient, CompletionError};

/// 按配置创建补全客户端：provider = "openai" 且设置了 OPENAI_API_KEY 时使用 OpenAI，否则使用 Mock
pub fn create_completion_from_config(cfg: &AppConfig, capability_schema: &str) -> Arc<dyn CompletionClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let api_key = std::env::var("OPENAI_API_KEY").ok();

    match (provider.as_str(), api_key) {
        ("openai", Some(key)) => {
            tracing::info!("Using OpenAI completion client ({})", cfg.llm.model);
            Arc::new(OpenAiCompletionClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                &key,
                capability_schema,
                cfg.llm.timeout_secs,
            ))
        }
        ("openai", None) => {
            tracing::warn!("OPENAI_API_KEY not set, using Mock completion client");
            Arc::new(MockCompletionClient::default())
        }
        _ => {
            tracing::info!("Using Mock completion client");
            Arc::new(MockCompletionClient::default())
        }
    }
}
