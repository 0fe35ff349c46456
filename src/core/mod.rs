//! 核心编排层：错误、运行上下文、重试执行器、阶段状态、编排器与构建器

pub mod builder;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod state;

pub use builder::{create_store_from_config, OrchestratorBuilder};
pub use context::RunContext;
pub use error::{CapabilityError, DispatchError, OrchestratorError};
pub use orchestrator::{Orchestrator, OrchestratorResponse, FALLBACK_SEGMENTS};
pub use retry::{RetryExecutor, RetryPolicy};
pub use state::{OrchestratorPhase, RunState};
