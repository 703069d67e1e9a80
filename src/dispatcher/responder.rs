//! 单个事件的回复出口
//!
//! reply token 只能用一次：第一次 Reply 消耗它，之后的 Reply 自动改走 push；
//! reply 调用失败（token 过期等）时同样退回 push。

use crate::core::ChannelError;
use crate::dialogue::OutboundMessage;
use crate::line::MessagingChannel;

pub struct Responder<'a> {
    channel: &'a dyn MessagingChannel,
    user_id: &'a str,
    reply_token: Option<String>,
}

impl<'a> Responder<'a> {
    pub fn new(
        channel: &'a dyn MessagingChannel,
        user_id: &'a str,
        reply_token: Option<String>,
    ) -> Self {
        Self {
            channel,
            user_id,
            reply_token,
        }
    }

    pub async fn reply(&mut self, messages: &[OutboundMessage]) -> Result<(), ChannelError> {
        if let Some(token) = self.reply_token.take() {
            match self.channel.reply(&token, messages).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(user_id = self.user_id, "Reply failed, falling back to push: {}", e);
                }
            }
        }
        self.push(messages).await
    }

    pub async fn push(&self, messages: &[OutboundMessage]) -> Result<(), ChannelError> {
        self.channel.push(self.user_id, messages).await
    }

    pub fn has_reply_token(&self) -> bool {
        self.reply_token.is_some()
    }
}
