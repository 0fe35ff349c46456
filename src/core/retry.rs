//! 能力调用重试执行器
//!
//! 每次尝试施加单次超时并输出 JSON 审计日志；失败后按 base_delay * 2^n 退避。
//! 每次尝试前、每次等待前检查 RunContext，尝试与退避期间同时监听取消，取消立即返回 Interrupted。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::capabilities::{CapabilityCall, CapabilityOutput, CapabilityRegistry};
use crate::core::{CapabilityError, DispatchError, RunContext};

/// 重试策略：总尝试次数与退避基数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// 第 attempt 次（从 0 计）失败后的等待时长
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// 与具体能力无关的执行器：按名称委托给注册表
pub struct RetryExecutor {
    registry: CapabilityRegistry,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl RetryExecutor {
    pub fn new(registry: CapabilityRegistry, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            registry,
            policy: RetryPolicy {
                max_attempts: policy.max_attempts.max(1),
                ..policy
            },
            attempt_timeout,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 执行调用；成功立即返回，全部失败返回 Exhausted（包装最后一次错误）
    pub async fn execute_with_retry(
        &self,
        ctx: &RunContext,
        call: &CapabilityCall,
    ) -> Result<CapabilityOutput, DispatchError> {
        let max = self.policy.max_attempts;
        let mut last_err = CapabilityError::Failed("no attempt made".to_string());

        for attempt in 0..max {
            ctx.check()?;

            let outcome = tokio::select! {
                biased;
                reason = ctx.done() => return Err(DispatchError::Interrupted(reason)),
                r = self.invoke_once(call) => r,
            };

            match outcome {
                Ok(output) => return Ok(output),
                Err(e) => last_err = e,
            }

            if attempt + 1 < max {
                let delay = self.policy.delay_for(attempt);
                tracing::warn!(
                    capability = %call.name,
                    attempt = %format!("{}/{}", attempt + 1, max),
                    delay_ms = delay.as_millis() as u64,
                    error = %last_err,
                    "Capability call failed, retrying"
                );
                ctx.check()?;
                tokio::select! {
                    biased;
                    reason = ctx.done() => return Err(DispatchError::Interrupted(reason)),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(DispatchError::Exhausted {
            name: call.name.clone(),
            attempts: max,
            source: last_err,
        })
    }

    async fn invoke_once(&self, call: &CapabilityCall) -> Result<CapabilityOutput, CapabilityError> {
        let start = Instant::now();
        let result = timeout(self.attempt_timeout, self.registry.invoke(call)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "capability_audit",
            "capability": call.name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.args_json()),
        });
        tracing::info!(audit = %audit.to_string(), "capability");

        match result {
            Ok(r) => r,
            Err(_) => Err(CapabilityError::Timeout(call.name.clone())),
        }
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
