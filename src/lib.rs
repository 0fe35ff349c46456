//! Shopwright - 对话式电商后端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **observability**: tracing 日志初始化
//! - **core**: 运行上下文、重试执行器、编排状态机、构建器
//! - **intent**: 意图识别（搜索 / 营销 / 组合 / 未知）
//! - **capabilities**: 能力抽象、注册表与内置能力（商品搜索、受众画像、广告文案）
//! - **aggregate**: 结果规整与消息渲染
//! - **llm**: 未识别意图时的补全客户端（OpenAI 兼容 / Mock）
//! - **store**: 计数存储（内存 / Redis）与响应缓存
//! - **ratelimit**: 固定窗口准入控制
//! - **http**: axum 路由（feature = "web"）

pub mod aggregate;
pub mod capabilities;
pub mod config;
pub mod core;
#[cfg(feature = "web")]
pub mod http;
pub mod intent;
pub mod llm;
pub mod observability;
pub mod ratelimit;
pub mod store;

pub use crate::core::{Orchestrator, OrchestratorBuilder, OrchestratorResponse, RunContext};
pub use crate::intent::{classify, Intent, IntentKind};
pub use crate::ratelimit::{AdmissionController, Decision};
