//! 能力注册表
//!
//! 所有能力实现 Capability trait（name / description / invoke），由 CapabilityRegistry 按名注册与查找；
//! RetryExecutor 只通过注册表按名调用，不感知具体能力。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::capabilities::{CapabilityArgs, CapabilityCall, CapabilityOutput};
use crate::core::CapabilityError;

/// 能力 trait：名称、描述（供 LLM 理解）、参数 schema、异步调用
#[async_trait]
pub trait Capability: Send + Sync {
    /// 能力名称（调用时的 name 字段）
    fn name(&self) -> &str;

    /// 能力描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 调用能力；参数校验由实现自行完成
    async fn invoke(&self, args: &CapabilityArgs) -> Result<CapabilityOutput, CapabilityError>;
}

/// 能力注册表：按名称存储 Arc<dyn Capability>
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: impl Capability + 'static) {
        self.register_arc(Arc::new(capability));
    }

    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.name().to_string();
        self.capabilities.insert(name, capability);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    /// 按名调用；未注册的名称返回 `unknown function: <name>`
    pub async fn invoke(&self, call: &CapabilityCall) -> Result<CapabilityOutput, CapabilityError> {
        let capability = self
            .capabilities
            .get(&call.name)
            .ok_or_else(|| CapabilityError::UnknownFunction(call.name.clone()))?;
        capability.invoke(&call.args).await
    }

    /// 已注册名称（排序，便于稳定输出）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    /// 动态生成能力 schema JSON，拼入 LLM system prompt
    pub fn to_schema_json(&self) -> String {
        let defs: Vec<Value> = self
            .names()
            .iter()
            .filter_map(|name| self.capabilities.get(name))
            .map(|c| {
                serde_json::json!({
                    "name": c.name(),
                    "description": c.description(),
                    "parameters": c.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&defs).unwrap_or_else(|_| "[]".to_string())
    }
}
