//! LINE 通道：Webhook 事件模型、签名校验、Messaging API 客户端、卡片模板

pub mod client;
pub mod event;
pub mod mock;
pub mod signature;
pub mod templates;

pub use client::{LineClient, MessagingChannel, DEFAULT_API_BASE};
pub use event::{PostbackAction, WebhookBody, WebhookEvent};
pub use mock::{Delivery, RecordingChannel};
pub use signature::{sign, verify_signature, SIGNATURE_HEADER};
