//! 编排状态机阶段
//!
//! Classified -> Dispatching -> Aggregating -> Done；每次消息处理独立一份，不跨请求共享。

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorPhase {
    Classified,
    Dispatching,
    Aggregating,
    Done,
}

impl OrchestratorPhase {
    /// 合法的下一阶段；校验失败（缺少商品）可从 Classified 直接结束
    pub fn can_advance_to(self, next: OrchestratorPhase) -> bool {
        use OrchestratorPhase::*;
        matches!(
            (self, next),
            (Classified, Dispatching)
                | (Classified, Done)
                | (Dispatching, Aggregating)
                | (Dispatching, Done)
                | (Aggregating, Done)
        )
    }
}

/// 单次运行的阶段跟踪，转换时输出 debug 日志
#[derive(Debug)]
pub struct RunState {
    request_id: String,
    phase: OrchestratorPhase,
}

impl RunState {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            phase: OrchestratorPhase::Classified,
        }
    }

    pub fn phase(&self) -> OrchestratorPhase {
        self.phase
    }

    pub fn advance(&mut self, next: OrchestratorPhase) {
        if !self.phase.can_advance_to(next) {
            tracing::warn!(request_id = %self.request_id, from = ?self.phase, to = ?next, "Unexpected phase transition");
        }
        tracing::debug!(request_id = %self.request_id, from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        let mut state = RunState::new("r1");
        state.advance(OrchestratorPhase::Dispatching);
        state.advance(OrchestratorPhase::Aggregating);
        state.advance(OrchestratorPhase::Done);
        assert_eq!(state.phase(), OrchestratorPhase::Done);
    }

    #[test]
    fn test_backward_transition_rejected() {
        assert!(!OrchestratorPhase::Aggregating.can_advance_to(OrchestratorPhase::Dispatching));
        assert!(!OrchestratorPhase::Done.can_advance_to(OrchestratorPhase::Classified));
        assert!(OrchestratorPhase::Classified.can_advance_to(OrchestratorPhase::Done));
    }
}
