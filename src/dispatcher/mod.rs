//! 事件分发器
//!
//! 一批 Webhook 事件逐个独立并发处理：归类为信号 -> 状态机转移 -> 执行动作。
//! 单个事件出错只记日志并计入报告，不影响同批次其它事件。

mod lock;
mod responder;

pub use lock::KeyedLock;
pub use responder::Responder;

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::RwLock;

use crate::backend::BackendGateway;
use crate::core::BookingError;
use crate::dialogue::{
    step_label, transition, Action, DialogueContext, Keywords, RecordChange, Signal,
};
use crate::line::{MessagingChannel, WebhookEvent};
use crate::session::SessionStore;

/// 去重缓存上限，超过后整体清空
const MAX_PROCESSED_EVENTS: usize = 10_000;

/// 单个事件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Handled,
    /// 非文字 / 无法识别的事件，不回复
    Ignored,
    /// 重送的事件（webhookEventId 已处理过）
    Duplicate,
}

/// 一批事件的汇总
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub handled: usize,
    pub ignored: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl DispatchReport {
    fn record(&mut self, result: Result<EventOutcome, BookingError>) {
        match result {
            Ok(EventOutcome::Handled) => self.handled += 1,
            Ok(EventOutcome::Ignored) => self.ignored += 1,
            Ok(EventOutcome::Duplicate) => self.duplicates += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(e.to_string());
            }
        }
    }

    pub fn total(&self) -> usize {
        self.handled + self.ignored + self.duplicates + self.failed
    }
}

pub struct Dispatcher {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn BackendGateway>,
    channel: Arc<dyn MessagingChannel>,
    keywords: Keywords,
    locks: KeyedLock,
    processed_events: RwLock<HashSet<String>>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn BackendGateway>,
        channel: Arc<dyn MessagingChannel>,
        keywords: Keywords,
    ) -> Self {
        Self {
            store,
            backend,
            channel,
            keywords,
            locks: KeyedLock::new(),
            processed_events: RwLock::new(HashSet::new()),
        }
    }

    /// 并发处理整批事件，永远返回报告而不是错误
    pub async fn dispatch(&self, events: &[WebhookEvent]) -> DispatchReport {
        let results = join_all(events.iter().map(|event| async move {
            let result = self.handle_event(event).await;
            if let Err(e) = &result {
                tracing::error!(
                    user_id = event.user_id().unwrap_or("-"),
                    event_type = %event.event_type,
                    "Event handling failed: {}",
                    e
                );
            }
            result
        }))
        .await;

        let mut report = DispatchReport::default();
        for result in results {
            report.record(result);
        }
        report
    }

    /// 处理单个事件
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<EventOutcome, BookingError> {
        if self.is_duplicate(event).await {
            tracing::debug!(
                event_id = event.webhook_event_id.as_deref().unwrap_or("-"),
                redelivery = event.is_redelivery(),
                "Duplicate event ignored"
            );
            return Ok(EventOutcome::Duplicate);
        }

        let Some(signal) = event.classify(&self.keywords) else {
            tracing::debug!(event_type = %event.event_type, "Unrecognized event ignored");
            return Ok(EventOutcome::Ignored);
        };
        let Some(user_id) = event.user_id() else {
            tracing::debug!(event_type = %event.event_type, "Event without userId ignored");
            return Ok(EventOutcome::Ignored);
        };

        let mut responder = Responder::new(
            self.channel.as_ref(),
            user_id,
            event.reply_token.clone(),
        );
        self.run(user_id, signal, &mut responder).await?;
        Ok(EventOutcome::Handled)
    }

    /// 执行信号及其后续完成信号。发送失败不会中断流程（后端调用和记录清理照常进行），
    /// 第一个发送错误在最后返回。
    async fn run(
        &self,
        user_id: &str,
        signal: Signal,
        responder: &mut Responder<'_>,
    ) -> Result<(), BookingError> {
        let mut first_error = None;
        let mut pending = Some(signal);

        while let Some(signal) = pending.take() {
            for action in self.apply(user_id, signal).await {
                match action {
                    Action::Reply(messages) => {
                        if let Err(e) = responder.reply(&messages).await {
                            tracing::error!(user_id, "Reply failed: {}", e);
                            first_error.get_or_insert(e);
                        }
                    }
                    Action::Push(messages) => {
                        if let Err(e) = responder.push(&messages).await {
                            tracing::error!(user_id, "Push failed: {}", e);
                            first_error.get_or_insert(e);
                        }
                    }
                    Action::CallBackend { request, then } => {
                        let result = self.backend.send(request).await;
                        pending = Some(then.into_signal(result));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// 在用户锁内完成「读记录 -> 转移 -> 写记录」，返回待执行的动作
    async fn apply(&self, user_id: &str, signal: Signal) -> Vec<Action> {
        let _guard = self.locks.lock(user_id).await;

        let record = self.store.get(user_id).await;
        let ctx = DialogueContext {
            user_id,
            keywords: &self.keywords,
        };
        let signal_name = signal.name();
        let from = step_label(record.as_ref());
        let result = transition(&ctx, record.as_ref(), signal);

        let to = match &result.record {
            RecordChange::Keep => from,
            RecordChange::Put(next) => {
                self.store.set(user_id, next.clone()).await;
                next.step.as_str()
            }
            RecordChange::Delete => {
                self.store.delete(user_id).await;
                "idle"
            }
        };
        tracing::info!(user_id, signal = signal_name, from, to, "Dialogue transition");

        result.actions
    }

    async fn is_duplicate(&self, event: &WebhookEvent) -> bool {
        let Some(event_id) = event.webhook_event_id.as_deref().filter(|id| !id.is_empty()) else {
            return false;
        };
        let mut processed = self.processed_events.write().await;
        if processed.contains(event_id) {
            return true;
        }
        if processed.len() >= MAX_PROCESSED_EVENTS {
            processed.clear();
        }
        processed.insert(event_id.to_string());
        false
    }
}
