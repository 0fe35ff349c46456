//! 编排错误类型
//!
//! 三层错误：CapabilityError（单次能力调用失败）、DispatchError（重试执行器的终态），
//! OrchestratorError（process_message 唯一会返回的致命错误：调用方取消或超时）。

use thiserror::Error;

/// 单次能力调用失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("missing or invalid {0} parameter")]
    InvalidArgument(String),

    #[error("{0}")]
    Failed(String),

    #[error("capability {0} timed out")]
    Timeout(String),
}

/// 调用方取消 / 截止时间到达；业务失败永远不会落到这里
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// RetryExecutor 的失败结果
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// 被取消打断，不计入能力失败
    #[error(transparent)]
    Interrupted(OrchestratorError),

    /// 所有尝试均因能力自身原因失败，包装最后一次错误
    #[error("function call {name} failed after {attempts} attempts: {source}")]
    Exhausted {
        name: String,
        attempts: u32,
        #[source]
        source: CapabilityError,
    },
}

impl DispatchError {
    /// 若为取消类错误，返回需要向调用方传播的致命错误
    pub fn interruption(&self) -> Option<OrchestratorError> {
        match self {
            DispatchError::Interrupted(e) => Some(*e),
            DispatchError::Exhausted { .. } => None,
        }
    }
}

impl From<OrchestratorError> for DispatchError {
    fn from(e: OrchestratorError) -> Self {
        DispatchError::Interrupted(e)
    }
}
