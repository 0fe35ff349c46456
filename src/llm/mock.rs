//! Mock 补全客户端（用于测试与离线运行，无需 API）

use async_trait::async_trait;

use crate::capabilities::CapabilityCall;
use crate::llm::{Completion, CompletionClient, CompletionError};

const DEFAULT_REPLY: &str = "I can help you search marketplaces for products or write marketing copy. \
Try something like 'find wireless headphones under $100'.";

/// 返回固定回复与建议调用；可配置为始终失败
#[derive(Debug, Clone)]
pub struct MockCompletionClient {
    reply: String,
    calls: Vec<CapabilityCall>,
    failure: Option<String>,
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY)
    }
}

impl MockCompletionClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Vec::new(),
            failure: None,
        }
    }

    pub fn with_call(mut self, call: CapabilityCall) -> Self {
        self.calls.push(call);
        self
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new("")
        }
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _message: &str) -> Result<Completion, CompletionError> {
        if let Some(msg) = &self.failure {
            return Err(CompletionError::Request(msg.clone()));
        }
        Ok(Completion {
            text: self.reply.clone(),
            suggested_calls: self.calls.clone(),
        })
    }
}
