//! 记录型消息通道：不发网络请求，只记下每次 reply / push，用于测试

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::ChannelError;
use crate::dialogue::OutboundMessage;

use super::client::MessagingChannel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Reply {
        reply_token: String,
        messages: Vec<OutboundMessage>,
    },
    Push {
        user_id: String,
        messages: Vec<OutboundMessage>,
    },
}

impl Delivery {
    pub fn messages(&self) -> &[OutboundMessage] {
        match self {
            Delivery::Reply { messages, .. } | Delivery::Push { messages, .. } => messages,
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, Delivery::Push { .. })
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    deliveries: Mutex<Vec<Delivery>>,
    /// 模拟 reply token 过期：所有 reply 都返回 API 错误
    fail_replies: bool,
    /// 模拟推送失败（额度用尽等），可在测试中途切换
    fail_pushes: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_replies() -> Self {
        Self {
            fail_replies: true,
            ..Self::default()
        }
    }

    pub fn set_failing_pushes(&self, failing: bool) {
        self.fail_pushes.store(failing, Ordering::SeqCst);
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// 所有已送出的文字（按顺序），卡片忽略
    pub fn texts(&self) -> Vec<String> {
        self.deliveries()
            .iter()
            .flat_map(|d| d.messages().to_vec())
            .filter_map(|m| match m {
                OutboundMessage::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn record(&self, delivery: Delivery) {
        if let Ok(mut d) = self.deliveries.lock() {
            d.push(delivery);
        }
    }
}

#[async_trait]
impl MessagingChannel for RecordingChannel {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), ChannelError> {
        if self.fail_replies {
            return Err(ChannelError::Api {
                status: 400,
                body: "Invalid reply token".to_string(),
            });
        }
        self.record(Delivery::Reply {
            reply_token: reply_token.to_string(),
            messages: messages.to_vec(),
        });
        Ok(())
    }

    async fn push(&self, user_id: &str, messages: &[OutboundMessage]) -> Result<(), ChannelError> {
        if self.fail_pushes.load(Ordering::SeqCst) {
            return Err(ChannelError::Api {
                status: 429,
                body: "You have reached your monthly limit.".to_string(),
            });
        }
        self.record(Delivery::Push {
            user_id: user_id.to_string(),
            messages: messages.to_vec(),
        });
        Ok(())
    }
}
