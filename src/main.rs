//! Booking Webhook 服务
//!
//! 环境变量:
//! - LINE_CHANNEL_ACCESS_TOKEN: 频道 Access Token
//! - LINE_CHANNEL_SECRET: 频道 Secret（用于验签）
//! - BACKEND_URL（或 GAS_URL）: 预约后端 Web App 地址
//! - PORT: 监听端口（默认 3000）
//!
//! 启动: cargo run --bin booking-webhook

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use booking::backend::AppsScriptGateway;
use booking::config::load_config;
use booking::core::ShutdownManager;
use booking::line::LineClient;
use booking::session::{spawn_sweeper, MemorySessionStore, SessionStore};
use booking::{create_router, observability, AppState, Dispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("failed to load configuration")?;
    let creds = cfg.validate().context("incomplete configuration")?;

    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(cfg.session.ttl()));
    let backend = Arc::new(AppsScriptGateway::new(
        creds.backend_url.clone(),
        cfg.backend.timeout_secs,
    ));
    let channel = Arc::new(LineClient::new(
        creds.channel_access_token,
        cfg.line.api_base_url.clone(),
        cfg.keywords.clone(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store),
        backend,
        channel,
        cfg.keywords.clone(),
    ));

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let sweeper = cfg.session.ttl().map(|ttl| {
        tracing::info!(ttl_secs = ttl.as_secs(), "Session expiry enabled");
        spawn_sweeper(Arc::clone(&store), cfg.session.sweep_interval(), shutdown.token())
    });

    let app = create_router(Arc::new(AppState {
        dispatcher,
        channel_secret: creds.channel_secret,
        batches: shutdown.batches(),
    }));

    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", cfg.server.port).parse()?;
    tracing::info!("Booking webhook listening on http://{}", addr);
    tracing::info!(backend = %creds.backend_url, "Webhook URL: http://YOUR_HOST:{}/webhook", cfg.server.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.signalled())
        .await?;

    // 批次里可能有正在等后端的预约，多给一个后端超时的时间让结果送达
    let drain_timeout = Duration::from_secs(cfg.backend.timeout_secs + 5);
    if !shutdown.drain(drain_timeout).await {
        tracing::warn!(
            timeout_secs = drain_timeout.as_secs(),
            "Webhook batches still running at shutdown, abandoning them"
        );
    }
    if let Some(handle) = sweeper {
        shutdown.token().cancel();
        let _ = handle.await;
    }
    let reason = shutdown
        .reason()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "server exited".to_string());
    tracing::info!(%reason, "Booking webhook stopped");
    Ok(())
}
