//! 错误类型
//!
//! 业务层面的失败（表单不完整、取消编号不符、后端失败）不走这里，
//! 而是由状态机转成给用户看的文字；这里只描述基础设施层面的错误。

use thiserror::Error;

/// 单个事件处理过程中可能出现的错误（按事件隔离，不影响同批次其它事件）
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Malformed webhook body: {0}")]
    MalformedBody(String),
}

/// 消息通道（LINE Messaging API）调用错误
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LINE API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// 配置加载 / 校验错误；启动阶段遇到即退出
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
