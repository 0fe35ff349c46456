//! 补全客户端抽象
//!
//! complete 返回自由文本与零个或多个建议的能力调用；模型输出约定为
//! {"reply": "...", "calls": [{"name": "...", "arguments": {...}}]}，纯文本视为无调用的回复。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::capabilities::CapabilityCall;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion returned no content")]
    EmptyResponse,

    #[error("failed to parse completion: {0}")]
    Parse(String),
}

/// 一次补全的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub suggested_calls: Vec<CapabilityCall>,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, message: &str) -> Result<Completion, CompletionError>;
}

#[derive(Debug, Deserialize)]
struct ReplyEnvelope {
    #[serde(default)]
    reply: String,
    #[serde(default)]
    calls: Vec<SuggestedCall>,
}

#[derive(Debug, Deserialize)]
struct SuggestedCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// 解析模型输出：```json 代码块或首个 { 到末个 } 之间的 JSON；无 JSON 时整段作为回复
pub fn parse_completion(output: &str) -> Result<Completion, CompletionError> {
    let trimmed = output.trim();

    let (json_str, fenced) = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        (rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()), true)
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            (&trimmed[start..=end], false)
        } else {
            return Ok(plain(trimmed));
        }
    } else {
        return Ok(plain(trimmed));
    };

    match serde_json::from_str::<ReplyEnvelope>(json_str) {
        Ok(envelope) => Ok(Completion {
            text: envelope.reply.trim().to_string(),
            suggested_calls: envelope
                .calls
                .into_iter()
                .filter(|c| !c.name.trim().is_empty())
                .map(|c| CapabilityCall::from_json(c.name.trim(), decode_arguments(c.arguments)))
                .collect(),
        }),
        Err(e) if fenced => Err(CompletionError::Parse(format!("{}: {}", e, json_str))),
        Err(e) => {
            tracing::debug!(error = %e, "Completion is not a reply envelope, treating as text");
            Ok(plain(trimmed))
        }
    }
}

/// 参数可能以 JSON 字符串形式给出
fn decode_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::Null),
        other => other,
    }
}

fn plain(text: &str) -> Completion {
    Completion {
        text: text.to_string(),
        suggested_calls: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityArgs, SEARCH_MARKETPLACE};

    #[test]
    fn test_plain_text_has_no_calls() {
        let c = parse_completion("  Hello! How can I help?  ").unwrap();
        assert_eq!(c.text, "Hello! How can I help?");
        assert!(c.suggested_calls.is_empty());
    }

    #[test]
    fn test_envelope_with_calls() {
        let raw = r#"Sure. {"reply": "Searching now", "calls": [{"name": "search_marketplace", "arguments": {"query": "tent"}}]}"#;
        let c = parse_completion(raw).unwrap();
        assert_eq!(c.text, "Searching now");
        assert_eq!(c.suggested_calls.len(), 1);
        assert_eq!(c.suggested_calls[0].name, SEARCH_MARKETPLACE);
        assert_eq!(c.suggested_calls[0].args_json()["query"], "tent");
    }

    #[test]
    fn test_string_encoded_arguments() {
        let raw = r#"```json
{"reply": "", "calls": [{"name": "get_taste_profile", "arguments": "{\"description\": \"tent\"}"}]}
```"#;
        let c = parse_completion(raw).unwrap();
        assert!(c.text.is_empty());
        let CapabilityArgs::Raw(map) = &c.suggested_calls[0].args else {
            panic!("expected raw args");
        };
        assert_eq!(map["description"], "tent");
    }

    #[test]
    fn test_broken_fenced_json_is_parse_error() {
        let err = parse_completion("```json\n{\"reply\": \n```").unwrap_err();
        assert!(matches!(err, CompletionError::Parse(_)));
    }

    #[test]
    fn test_braces_in_prose_fall_back_to_text() {
        let c = parse_completion("use {curly} braces").unwrap();
        assert_eq!(c.text, "use {curly} braces");
    }
}
