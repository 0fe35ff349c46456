//! OpenAI 兼容补全客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；system prompt 中注入能力 schema，
//! 要求模型以 JSON 回复 {"reply", "calls"}，由 parse_completion 解析。

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{parse_completion, Completion, CompletionClient, CompletionError};

fn system_prompt(capability_schema: &str) -> String {
    format!(
        "You are a shopping assistant for a conversational commerce service. \
You can search marketplaces for products and write marketing copy.\n\n\
Available functions (JSON):\n{capability_schema}\n\n\
Always answer with a single JSON object: \
{{\"reply\": \"<text for the user>\", \"calls\": [{{\"name\": \"<function>\", \"arguments\": {{...}}}}]}}. \
Use an empty \"calls\" array when no function is needed."
    )
}

pub struct OpenAiCompletionClient {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
    timeout: Duration,
}

impl OpenAiCompletionClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: &str,
        capability_schema: &str,
        timeout_secs: u64,
    ) -> Self {
        let config = match base_url {
            Some(url) => OpenAIConfig::new().with_api_base(url).with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            system_prompt: system_prompt(capability_schema),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    fn messages(&self, message: &str) -> Result<Vec<ChatCompletionRequestMessage>, CompletionError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(self.system_prompt.clone())
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(message.to_string())
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        Ok(vec![
            ChatCompletionRequestMessage::System(system),
            ChatCompletionRequestMessage::User(user),
        ])
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, message: &str) -> Result<Completion, CompletionError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.messages(message)?)
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| CompletionError::Request(format!("timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        parse_completion(&content)
    }
}
