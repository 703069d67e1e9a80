//! Booking - LINE 预约机器人 Webhook 服务
//!
//! 模块划分：
//! - **backend**: 预约后端网关（Apps Script Web App / Mock）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与优雅关闭
//! - **dialogue**: 预约对话状态机（步骤、信号、转移、动作）
//! - **dispatcher**: Webhook 事件分发（去重、按用户加锁、执行动作）
//! - **line**: LINE Messaging API（事件模型、签名、消息模板、发送客户端）
//! - **observability**: tracing 初始化
//! - **server**: axum 路由（/webhook、/health）
//! - **session**: 会话记录存储

pub mod backend;
pub mod config;
pub mod core;
pub mod dialogue;
pub mod dispatcher;
pub mod line;
pub mod observability;
pub mod server;
pub mod session;

pub use dispatcher::{DispatchReport, Dispatcher, EventOutcome};
pub use server::{create_router, AppState};
