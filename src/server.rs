//! Webhook HTTP 入口
//!
//! LINE 要求 Webhook 尽快返回 200，否则判失败并重送。
//! 这里只做签名校验和解析，事件处理放到后台任务，响应立即返回。
//! 后台任务挂在 TaskTracker 上，关闭时等它们跑完。

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tokio_util::task::TaskTracker;

use crate::core::BookingError;
use crate::dispatcher::Dispatcher;
use crate::line::{verify_signature, WebhookBody, SIGNATURE_HEADER};

/// Webhook 服务状态
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub channel_secret: String,
    /// 在途批次
    pub batches: TaskTracker,
}

/// 创建路由：POST /webhook 与 GET /health
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// 校验签名并解析请求体，失败时给出对应的错误
pub fn authenticate(
    channel_secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<WebhookBody, BookingError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !verify_signature(channel_secret, body, signature) {
        return Err(BookingError::InvalidSignature);
    }
    serde_json::from_slice(body).map_err(|e| BookingError::MalformedBody(e.to_string()))
}

/// POST /webhook：验签 -> 解析 -> 后台分发 -> 立即 200
async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let payload = match authenticate(&state.channel_secret, &headers, &body) {
        Ok(payload) => payload,
        Err(BookingError::InvalidSignature) => {
            tracing::warn!(body_len = body.len(), "Webhook rejected: invalid signature");
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            tracing::warn!("Webhook rejected: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    if payload.events.is_empty() {
        // 控制台「驗證」按钮发送的是空事件列表
        tracing::debug!("Webhook verification request");
        return Ok(Json(serde_json::json!({})));
    }

    tracing::info!(events = payload.events.len(), "Webhook accepted, dispatching in background");

    let dispatcher = Arc::clone(&state.dispatcher);
    state.batches.spawn(async move {
        let report = dispatcher.dispatch(&payload.events).await;
        tracing::info!(
            handled = report.handled,
            ignored = report.ignored,
            duplicates = report.duplicates,
            failed = report.failed,
            "Webhook batch finished"
        );
    });

    Ok(Json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::sign;

    const SECRET: &str = "test-channel-secret";

    fn headers_with(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, signature.parse().unwrap());
        headers
    }

    #[test]
    fn test_authenticate_accepts_signed_body() {
        let body = br#"{"destination":"Ubot","events":[]}"#;
        let headers = headers_with(&sign(SECRET, body));
        let parsed = authenticate(SECRET, &headers, body).unwrap();
        assert!(parsed.events.is_empty());
    }

    #[test]
    fn test_authenticate_rejects_missing_signature() {
        let body = br#"{"events":[]}"#;
        let err = authenticate(SECRET, &HeaderMap::new(), body).unwrap_err();
        assert!(matches!(err, BookingError::InvalidSignature));
    }

    #[test]
    fn test_authenticate_rejects_wrong_secret() {
        let body = br#"{"events":[]}"#;
        let headers = headers_with(&sign("another-secret", body));
        assert!(matches!(
            authenticate(SECRET, &headers, body),
            Err(BookingError::InvalidSignature)
        ));
    }

    #[test]
    fn test_authenticate_signed_garbage_is_malformed() {
        let body = b"not json";
        let headers = headers_with(&sign(SECRET, body));
        assert!(matches!(
            authenticate(SECRET, &headers, body),
            Err(BookingError::MalformedBody(_))
        ));
    }
}
