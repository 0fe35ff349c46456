//! 单次编排的运行上下文：调用方取消令牌 + 可选截止时间
//!
//! RetryExecutor 在每次尝试前、每次等待前调用 check()，并在调用 / 退避期间与 done() 竞争，
//! 保证取消能被及时观察到。

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::OrchestratorError;

#[derive(Debug, Clone)]
pub struct RunContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl RunContext {
    /// 使用调用方提供的取消令牌，无截止时间
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// 从现在起 timeout 后到期
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::default().deadline_at(Instant::now() + timeout)
    }

    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 已取消或已过期则返回对应错误
    pub fn check(&self) -> Result<(), OrchestratorError> {
        if self.token.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(OrchestratorError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// 在取消或到期时完成，返回原因
    pub async fn done(&self) -> OrchestratorError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => OrchestratorError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => OrchestratorError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                OrchestratorError::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_is_live() {
        assert_eq!(RunContext::default().check(), Ok(()));
    }

    #[test]
    fn test_cancel_is_observed() {
        let ctx = RunContext::default();
        ctx.cancel();
        assert_eq!(ctx.check(), Err(OrchestratorError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry_is_observed() {
        let ctx = RunContext::with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.done().await, OrchestratorError::DeadlineExceeded);
        assert_eq!(ctx.check(), Err(OrchestratorError::DeadlineExceeded));
    }
}
