//! 会话存储抽象层
//!
//! 状态机只通过 SessionStore 读写记录，换成持久化实现不影响对话逻辑。
//! 记录不存在即视为空闲；过期清理也只是让记录「不存在」。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::dialogue::SessionRecord;

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 读取用户当前记录；None 表示空闲
    async fn get(&self, user_id: &str) -> Option<SessionRecord>;

    /// 写入（覆盖）用户记录
    async fn set(&self, user_id: &str, record: SessionRecord);

    /// 删除用户记录，回到空闲
    async fn delete(&self, user_id: &str);

    /// 清理过期记录，返回清理数量
    async fn cleanup_expired(&self) -> usize;

    /// 当前记录数
    async fn active_count(&self) -> usize;
}

struct Entry {
    record: SessionRecord,
    last_active: Instant,
}

/// 内存会话存储：进程重启即丢失
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    /// None 表示永不过期
    ttl: Option<Duration>,
}

impl MemorySessionStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.last_active.elapsed() > ttl)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, user_id: &str) -> Option<SessionRecord> {
        let sessions = self.sessions.read().await;
        sessions
            .get(user_id)
            .filter(|e| !self.is_expired(e))
            .map(|e| e.record.clone())
    }

    async fn set(&self, user_id: &str, record: SessionRecord) {
        self.sessions.write().await.insert(
            user_id.to_string(),
            Entry {
                record,
                last_active: Instant::now(),
            },
        );
    }

    async fn delete(&self, user_id: &str) {
        self.sessions.write().await.remove(user_id);
    }

    async fn cleanup_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, e| !self.is_expired(e));
        before - sessions.len()
    }

    async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// 后台定期清理过期会话，收到关闭信号后退出
pub fn spawn_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Session sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = store.cleanup_expired().await;
                    if removed > 0 {
                        let active = store.active_count().await;
                        tracing::info!(removed, active, "Expired sessions evicted");
                    }
                }
            }
        }
    })
}
