//! LINE Messaging API 客户端
//!
//! reply：消耗事件附带的一次性 reply token；push：按 userId 主动推送，不限次数。
//! 单次请求最多 5 条消息。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::ChannelError;
use crate::dialogue::{Keywords, OutboundMessage};

use super::templates::render_all;

pub const DEFAULT_API_BASE: &str = "https://api.line.me";

/// 单次 reply / push 的消息条数上限
const MAX_MESSAGES_PER_REQUEST: usize = 5;

/// 消息通道抽象（测试中用 RecordingChannel 替换）
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), ChannelError>;

    async fn push(&self, user_id: &str, messages: &[OutboundMessage]) -> Result<(), ChannelError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [Value],
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [Value],
}

pub struct LineClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    keywords: Keywords,
}

impl LineClient {
    pub fn new(access_token: impl Into<String>, base_url: impl Into<String>, keywords: Keywords) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keywords,
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ChannelError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Api { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingChannel for LineClient {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), ChannelError> {
        let mut rendered = render_all(messages, &self.keywords);
        if rendered.is_empty() {
            return Ok(());
        }
        if rendered.len() > MAX_MESSAGES_PER_REQUEST {
            tracing::warn!(
                "Reply carries {} messages, only the first {} are sent",
                rendered.len(),
                MAX_MESSAGES_PER_REQUEST
            );
            rendered.truncate(MAX_MESSAGES_PER_REQUEST);
        }
        self.post(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token,
                messages: &rendered,
            },
        )
        .await
    }

    async fn push(&self, user_id: &str, messages: &[OutboundMessage]) -> Result<(), ChannelError> {
        let rendered = render_all(messages, &self.keywords);
        for chunk in rendered.chunks(MAX_MESSAGES_PER_REQUEST) {
            self.post(
                "/v2/bot/message/push",
                &PushRequest {
                    to: user_id,
                    messages: chunk,
                },
            )
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_client() -> LineClient {
        LineClient::new("token", "http://127.0.0.1:9/", Keywords::default())
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(unreachable_client().base_url, "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_empty_reply_sends_nothing() {
        assert!(unreachable_client().reply("rt", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_http_error() {
        let err = unreachable_client()
            .push("U1", &[OutboundMessage::text("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Http(_)));
    }
}
