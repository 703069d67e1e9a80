//! Mock 后端：按预设脚本返回结果并记录收到的请求，用于本地联调与测试

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::BackendGateway;
use super::types::{BackendRequest, BackendResult};

#[derive(Default)]
pub struct MockBackend {
    responses: Mutex<VecDeque<BackendResult>>,
    requests: Mutex<Vec<BackendRequest>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用前等待，模拟慢后端
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 追加一条待返回的结果（先进先出）
    pub fn respond(self, result: BackendResult) -> Self {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(result);
        }
        self
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl BackendGateway for MockBackend {
    async fn send(&self, request: BackendRequest) -> BackendResult {
        if let Ok(mut reqs) = self.requests.lock() {
            reqs.push(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| BackendResult::success("OK"))
    }
}
