//! 状态转移产生的动作

use crate::backend::{Appointment, BackendRequest, BackendResult};

use super::signal::Signal;
use super::state::SessionRecord;

/// 发给用户的消息（渲染成具体卡片由通道层负责）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text(String),
    /// 常见问题卡片
    Faq,
    /// 日期 / 时间选择 + 送出按钮
    BookingForm,
    /// 预约列表；cancellable 时每项带「取消」按钮
    AppointmentList {
        appointments: Vec<Appointment>,
        cancellable: bool,
    },
    /// 确认取消某一笔预约
    CancelConfirmation { appointment_id: String },
}

impl OutboundMessage {
    pub fn text(s: impl Into<String>) -> Self {
        OutboundMessage::Text(s.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// 优先使用 reply token；已用过则改为 push
    Reply(Vec<OutboundMessage>),
    /// 按用户 ID 主动推送
    Push(Vec<OutboundMessage>),
    /// 调用后端，结果按 then 包装成完成信号回灌状态机
    CallBackend {
        request: BackendRequest,
        then: Completion,
    },
}

/// 后端返回后回灌的信号种类（同一个查询动作既用于查询也用于取消列表）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Booking,
    Query,
    CancellationList,
    Cancellation,
}

impl Completion {
    pub fn into_signal(self, result: BackendResult) -> Signal {
        match self {
            Completion::Booking => Signal::BookingCompleted(result),
            Completion::Query => Signal::QueryCompleted(result),
            Completion::CancellationList => Signal::CancellationListCompleted(result),
            Completion::Cancellation => Signal::CancellationCompleted(result),
        }
    }
}

/// 对存储中记录的处理
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    Keep,
    Put(SessionRecord),
    Delete,
}

/// 一次转移的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: RecordChange,
    pub actions: Vec<Action>,
}

impl Transition {
    pub fn keep() -> Self {
        Self::new(RecordChange::Keep)
    }

    pub fn put(record: SessionRecord) -> Self {
        Self::new(RecordChange::Put(record))
    }

    pub fn delete() -> Self {
        Self::new(RecordChange::Delete)
    }

    fn new(record: RecordChange) -> Self {
        Self {
            record,
            actions: Vec::new(),
        }
    }

    pub fn reply(mut self, messages: Vec<OutboundMessage>) -> Self {
        self.actions.push(Action::Reply(messages));
        self
    }

    pub fn reply_text(self, text: impl Into<String>) -> Self {
        self.reply(vec![OutboundMessage::text(text)])
    }

    pub fn push(mut self, messages: Vec<OutboundMessage>) -> Self {
        self.actions.push(Action::Push(messages));
        self
    }

    pub fn push_text(self, text: impl Into<String>) -> Self {
        self.push(vec![OutboundMessage::text(text)])
    }

    pub fn call(mut self, request: BackendRequest, then: Completion) -> Self {
        self.actions.push(Action::CallBackend { request, then });
        self
    }

    /// 本次转移要调用的后端（测试与日志用）
    pub fn backend_calls(&self) -> impl Iterator<Item = &BackendRequest> {
        self.actions.iter().filter_map(|a| match a {
            Action::CallBackend { request, .. } => Some(request),
            _ => None,
        })
    }
}
