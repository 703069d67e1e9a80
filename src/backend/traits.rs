//! 后端网关抽象
//!
//! 实现方负责把超时、网络错误、异常响应全部折算成 BackendResult::Failure，
//! 因此 send 不返回 Result：对话状态机只关心「成功 / 失败 + 展示文字」。

use async_trait::async_trait;

use super::types::{BackendRequest, BackendResult};

#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn send(&self, request: BackendRequest) -> BackendResult;
}
