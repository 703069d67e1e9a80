//! 可观测性：tracing 订阅器初始化
//!
//! 默认 info 级别，可用 RUST_LOG 覆盖（如 `RUST_LOG=booking=debug`）。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "info";

/// RUST_LOG 未设置或无法解析时退回 info
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// 安装全局订阅器，重复调用时忽略（测试中可能多次初始化）
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .try_init();
}
