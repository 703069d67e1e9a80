//! 优雅关闭
//!
//! 收到 Ctrl+C / SIGTERM 后：axum 停止接收新请求，会话清理任务退出，
//! 已接收的 Webhook 批次继续跑完（后端可能已经写入预约，结果必须送达用户）。
//! 批次任务都挂在同一个 TaskTracker 上，serve 返回后由 drain 等待。

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// 关闭原因（只记录第一次触发的）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    Interrupt,
    /// SIGTERM（容器 / 平台重启）
    Terminate,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Interrupt => "interrupt",
            ShutdownReason::Terminate => "terminate",
        })
    }
}

/// 关闭信号与在途批次
#[derive(Default)]
pub struct ShutdownManager {
    token: CancellationToken,
    reason: OnceLock<ShutdownReason>,
    batches: TaskTracker,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 后台循环（会话清理）持有的 token 副本
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Webhook 批次的任务追踪器，交给路由层 spawn 用
    pub fn batches(&self) -> TaskTracker {
        self.batches.clone()
    }

    /// 触发关闭；重复触发不会覆盖第一次的原因
    pub fn trigger(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            tracing::info!(%reason, "Shutdown requested");
        }
        self.token.cancel();
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// 等待关闭信号（交给 axum 的 with_graceful_shutdown）
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let token = self.token.clone();
        async move { token.cancelled().await }
    }

    /// 不再接收新批次并等待在途批次结束；超时返回 false
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.batches.close();
        let pending = self.batches.len();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight webhook batches");
        }
        tokio::time::timeout(timeout, self.batches.wait())
            .await
            .is_ok()
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                manager.trigger(ShutdownReason::Interrupt);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    manager.trigger(ShutdownReason::Terminate);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_reason_is_kept() {
        let manager = ShutdownManager::new();
        let token = manager.token();
        assert_eq!(manager.reason(), None);

        manager.trigger(ShutdownReason::Terminate);
        manager.trigger(ShutdownReason::Interrupt);

        assert!(token.is_cancelled());
        assert_eq!(manager.reason(), Some(ShutdownReason::Terminate));
        manager.signalled().await;
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_batch() {
        let manager = ShutdownManager::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        manager.batches().spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let _ = tx.send("delivered");
        });

        manager.trigger(ShutdownReason::Terminate);
        assert!(manager.drain(Duration::from_secs(2)).await);
        assert_eq!(rx.await.unwrap(), "delivered");
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_timeout() {
        let manager = ShutdownManager::new();
        manager
            .batches()
            .spawn(tokio::time::sleep(Duration::from_secs(5)));
        assert!(!manager.drain(Duration::from_millis(20)).await);
    }
}
