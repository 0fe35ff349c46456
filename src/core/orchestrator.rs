//! 消息编排器
//!
//! 每条消息一次独立运行：classify -> 按意图分发 0..n 个能力调用（经 RetryExecutor）-> 汇总渲染。
//! 业务失败只体现在 OrchestratorResponse.errors 与消息文本中；
//! process_message 仅在调用方取消或超时时返回 Err。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::{
    convert_marketing, convert_search_results, extract_segments, format_combined_message,
    format_marketing_message, format_search_message, MarketingCopy, SearchResultsSummary,
};
use crate::capabilities::{
    CapabilityArgs, CapabilityCall, GENERATE_AD_COPY, GET_TASTE_PROFILE, SEARCH_MARKETPLACE,
};
use crate::core::state::{OrchestratorPhase, RunState};
use crate::core::{DispatchError, OrchestratorError, RetryExecutor, RunContext};
use crate::intent::{classify, Intent, IntentKind};
use crate::llm::CompletionClient;

/// 画像失败时使用的默认分群
pub const FALLBACK_SEGMENTS: [&str; 2] = ["General Consumers", "Value Seekers"];

const NO_PRODUCT_MESSAGE: &str =
    "I couldn't identify what product you're looking for. Please specify a product name.";
const NO_PRODUCT_ERROR: &str = "No product specified in search request";
const NO_DESCRIPTION_MESSAGE: &str =
    "I need a product description to create marketing copy. Please provide more details about the product.";
const NO_DESCRIPTION_ERROR: &str = "No product description provided for marketing";
const NOT_UNDERSTOOD_MESSAGE: &str = "I'm sorry, I couldn't understand your request. \
Please try asking about product searches or marketing copy generation.";

/// 单次编排的最终结果；message 恒非空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<SearchResultsSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing: Option<MarketingCopy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl OrchestratorResponse {
    fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            search_results: None,
            marketing: None,
            errors: vec![error.into()],
        }
    }
}

type StepResult<T> = Result<T, DispatchError>;

pub struct Orchestrator {
    executor: RetryExecutor,
    completion: Arc<dyn CompletionClient>,
    request_timeout: Duration,
}

impl Orchestrator {
    pub fn new(executor: RetryExecutor, completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            executor,
            completion,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// 使用新的截止时间处理一条消息
    pub async fn process_message_with_timeout(
        &self,
        text: &str,
        timeout: Duration,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        self.process_message(&RunContext::with_timeout(timeout), text).await
    }

    /// 处理一条消息
    pub async fn process_message(
        &self,
        ctx: &RunContext,
        text: &str,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        ctx.check()?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let intent = classify(text);
        tracing::info!(request_id = %request_id, intent = ?intent.kind, product = %intent.product, "Processing message");

        let mut state = RunState::new(request_id.clone());
        let result = match intent.kind {
            IntentKind::Search => self.handle_search(ctx, &intent, &mut state).await,
            IntentKind::Marketing => self.handle_marketing(ctx, &intent, &mut state).await,
            IntentKind::Combined => self.handle_combined(ctx, &intent, &mut state).await,
            IntentKind::Unknown => self.handle_unknown(ctx, text, &mut state).await,
        };

        match &result {
            Ok(resp) => {
                state.advance(OrchestratorPhase::Done);
                tracing::info!(request_id = %request_id, errors = resp.errors.len(), "Message processed");
            }
            Err(e) => tracing::warn!(request_id = %request_id, error = %e, "Message processing interrupted"),
        }
        result
    }

    async fn handle_search(
        &self,
        ctx: &RunContext,
        intent: &Intent,
        state: &mut RunState,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        if intent.product.is_empty() {
            return Ok(OrchestratorResponse::failure(NO_PRODUCT_MESSAGE, NO_PRODUCT_ERROR));
        }

        state.advance(OrchestratorPhase::Dispatching);
        match self.search_step(ctx, intent).await {
            Ok(summary) => {
                state.advance(OrchestratorPhase::Aggregating);
                Ok(OrchestratorResponse {
                    message: format_search_message(&summary),
                    search_results: Some(summary),
                    marketing: None,
                    errors: Vec::new(),
                })
            }
            Err(e) => {
                interrupted(&e)?;
                Ok(OrchestratorResponse::failure(
                    format!("I encountered an error while searching for {}: {}", intent.product, e),
                    e.to_string(),
                ))
            }
        }
    }

    async fn handle_marketing(
        &self,
        ctx: &RunContext,
        intent: &Intent,
        state: &mut RunState,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        if intent.product.is_empty() && intent.description.is_empty() {
            return Ok(OrchestratorResponse::failure(NO_DESCRIPTION_MESSAGE, NO_DESCRIPTION_ERROR));
        }

        state.advance(OrchestratorPhase::Dispatching);
        match self.marketing_step(ctx, intent).await {
            Ok(copy) => {
                state.advance(OrchestratorPhase::Aggregating);
                Ok(OrchestratorResponse {
                    message: format_marketing_message(&copy, &intent.product),
                    search_results: None,
                    marketing: Some(copy),
                    errors: Vec::new(),
                })
            }
            Err(e) => {
                interrupted(&e)?;
                Ok(OrchestratorResponse::failure(
                    format!("I couldn't generate marketing copy: {}", e),
                    e.to_string(),
                ))
            }
        }
    }

    /// 搜索与营销两个独立失败域并发执行，结束后汇总
    async fn handle_combined(
        &self,
        ctx: &RunContext,
        intent: &Intent,
        state: &mut RunState,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        let run_search = !intent.product.is_empty();
        let run_marketing = !intent.product.is_empty() || !intent.description.is_empty();

        state.advance(OrchestratorPhase::Dispatching);
        let (search, marketing) = tokio::join!(
            async {
                if run_search {
                    Some(self.search_step(ctx, intent).await)
                } else {
                    None
                }
            },
            async {
                if run_marketing {
                    Some(self.marketing_step(ctx, intent).await)
                } else {
                    None
                }
            },
        );
        state.advance(OrchestratorPhase::Aggregating);

        let mut errors = Vec::new();
        let search_results = match search {
            Some(Ok(summary)) => Some(summary),
            Some(Err(e)) => {
                interrupted(&e)?;
                errors.push(format!("Search failed: {}", e));
                None
            }
            None => None,
        };
        let marketing = match marketing {
            Some(Ok(copy)) => Some(copy),
            Some(Err(e)) => {
                interrupted(&e)?;
                errors.push(format!("Marketing generation failed: {}", e));
                None
            }
            None => None,
        };

        Ok(OrchestratorResponse {
            message: format_combined_message(search_results.as_ref(), marketing.as_ref(), &intent.product),
            search_results,
            marketing,
            errors,
        })
    }

    /// 交给补全协作者，执行其建议的调用并合并结果
    async fn handle_unknown(
        &self,
        ctx: &RunContext,
        text: &str,
        state: &mut RunState,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        state.advance(OrchestratorPhase::Dispatching);
        let completion = tokio::select! {
            biased;
            reason = ctx.done() => return Err(reason),
            c = self.completion.complete(text) => c,
        };
        let completion = match completion {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Completion failed");
                return Ok(OrchestratorResponse::failure(NOT_UNDERSTOOD_MESSAGE, e.to_string()));
            }
        };

        let mut search_results = None;
        let mut marketing = None;
        let mut profile_segments: Option<Vec<String>> = None;
        let mut errors = Vec::new();

        for call in &completion.suggested_calls {
            let output = match self.executor.execute_with_retry(ctx, call).await {
                Ok(output) => output,
                Err(e) => {
                    interrupted(&e)?;
                    errors.push(e.to_string());
                    continue;
                }
            };

            match call.name.as_str() {
                SEARCH_MARKETPLACE => {
                    let query = call.args_json()["query"].as_str().unwrap_or_default().to_string();
                    search_results = Some(convert_search_results(&output, &query));
                }
                GET_TASTE_PROFILE => profile_segments = Some(extract_segments(&output)),
                GENERATE_AD_COPY => {
                    let segments = match call_segments(call) {
                        s if !s.is_empty() => s,
                        _ => profile_segments.clone().unwrap_or_default(),
                    };
                    marketing = Some(convert_marketing(&output, segments));
                }
                other => tracing::debug!(capability = other, "Result of unmapped capability ignored"),
            }
        }
        state.advance(OrchestratorPhase::Aggregating);

        let message = if !completion.text.trim().is_empty() {
            completion.text
        } else {
            match (&search_results, &marketing) {
                (Some(s), None) => format_search_message(s),
                (None, Some(m)) => format_marketing_message(m, ""),
                (Some(s), Some(m)) => format_combined_message(Some(s), Some(m), ""),
                (None, None) => NOT_UNDERSTOOD_MESSAGE.to_string(),
            }
        };

        Ok(OrchestratorResponse {
            message,
            search_results,
            marketing,
            errors,
        })
    }

    async fn search_step(&self, ctx: &RunContext, intent: &Intent) -> StepResult<SearchResultsSummary> {
        let call = CapabilityCall::search(intent.product.clone(), intent.min_price, intent.max_price);
        let output = self.executor.execute_with_retry(ctx, &call).await?;
        Ok(convert_search_results(&output, &intent.product))
    }

    /// 画像失败降级为默认分群（取消除外），随后总是生成文案
    async fn marketing_step(&self, ctx: &RunContext, intent: &Intent) -> StepResult<MarketingCopy> {
        let description = if intent.description.is_empty() {
            &intent.product
        } else {
            &intent.description
        };
        let title = if intent.product.is_empty() {
            &intent.description
        } else {
            &intent.product
        };

        let segments = match self
            .executor
            .execute_with_retry(ctx, &CapabilityCall::taste_profile(description.clone()))
            .await
        {
            Ok(output) => extract_segments(&output),
            Err(e) => {
                if let Some(reason) = e.interruption() {
                    return Err(DispatchError::Interrupted(reason));
                }
                tracing::warn!(error = %e, "Taste profile failed, using default segments");
                FALLBACK_SEGMENTS.iter().map(|s| s.to_string()).collect()
            }
        };

        let call = CapabilityCall::ad_copy(title.clone(), segments.clone());
        let output = self.executor.execute_with_retry(ctx, &call).await?;
        Ok(convert_marketing(&output, segments))
    }
}

fn interrupted(e: &DispatchError) -> Result<(), OrchestratorError> {
    match e.interruption() {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

/// 调用参数中显式给出的分群
fn call_segments(call: &CapabilityCall) -> Vec<String> {
    match &call.args {
        CapabilityArgs::AdCopy(a) => a.segments.clone(),
        _ => call.args_json()["segments"]
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default(),
    }
}
