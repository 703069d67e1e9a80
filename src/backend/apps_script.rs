//! Google Apps Script 后端客户端
//!
//! 每个动作一次 POST（JSON 体），整体有超时上限。Apps Script 无论成败通常都回 200，
//! 所以除了 HTTP 状态码，还要看响应体里的 `status` 字段。

use std::time::Duration;

use async_trait::async_trait;

use super::traits::BackendGateway;
use super::types::{BackendRequest, BackendResponse, BackendResult};

/// 默认等待上限（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 通过 reqwest 调用脚本 Web App
pub struct AppsScriptGateway {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl AppsScriptGateway {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl BackendGateway for AppsScriptGateway {
    async fn send(&self, request: BackendRequest) -> BackendResult {
        let action = request.action();
        tracing::info!(action, user_id = request.user_id(), "Calling backend");

        let resp = match self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                tracing::warn!(action, "Backend timed out after {:?}", self.timeout);
                return BackendResult::generic_failure();
            }
            Err(e) => {
                tracing::error!(action, "Backend transport error: {}", e);
                return BackendResult::generic_failure();
            }
        };

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(action, status, "Failed to read backend body: {}", e);
                return BackendResult::generic_failure();
            }
        };

        let result = interpret_response(status, &body);
        if !result.is_success() {
            tracing::warn!(action, status, "Backend reported failure: {}", body);
        }
        result
    }
}

/// 把 HTTP 状态码 + 响应体折算为 BackendResult
pub(crate) fn interpret_response(status: u16, body: &str) -> BackendResult {
    let parsed = serde_json::from_str::<BackendResponse>(body).ok();

    if !(200..300).contains(&status) {
        return match parsed.and_then(|r| r.message) {
            Some(message) => BackendResult::failure(message),
            None => BackendResult::generic_failure(),
        };
    }

    let Some(resp) = parsed else {
        return BackendResult::generic_failure();
    };

    let is_error = resp
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("error"));
    if is_error {
        return BackendResult::Failure {
            message: resp.message,
        };
    }

    BackendResult::Success {
        message: resp.message.unwrap_or_default(),
        data: resp.data.unwrap_or_default(),
    }
}
