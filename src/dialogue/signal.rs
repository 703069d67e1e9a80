//! 输入信号：由入站事件归一化而来，状态机只认这些

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::backend::BackendResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    StartBooking,
    /// 其它任意文字
    TextInput(String),
    QueryRequest,
    CancelRequest,
    AbortRequest,
    FaqRequest,
    /// None 表示选择器没有带回值，忽略
    DateSelected(Option<NaiveDate>),
    TimeSelected(Option<NaiveTime>),
    SubmitBooking,
    SelectAppointmentForCancellation(String),
    ConfirmCancellation(String),

    // 以下由分发器在后端调用返回后生成
    BookingCompleted(BackendResult),
    QueryCompleted(BackendResult),
    CancellationListCompleted(BackendResult),
    CancellationCompleted(BackendResult),
}

impl Signal {
    /// 日志用名称
    pub fn name(&self) -> &'static str {
        match self {
            Signal::StartBooking => "start_booking",
            Signal::TextInput(_) => "text_input",
            Signal::QueryRequest => "query_request",
            Signal::CancelRequest => "cancel_request",
            Signal::AbortRequest => "abort_request",
            Signal::FaqRequest => "faq_request",
            Signal::DateSelected(_) => "date_selected",
            Signal::TimeSelected(_) => "time_selected",
            Signal::SubmitBooking => "submit_booking",
            Signal::SelectAppointmentForCancellation(_) => "select_cancel",
            Signal::ConfirmCancellation(_) => "confirm_cancel",
            Signal::BookingCompleted(_) => "booking_completed",
            Signal::QueryCompleted(_) => "query_completed",
            Signal::CancellationListCompleted(_) => "cancellation_list_completed",
            Signal::CancellationCompleted(_) => "cancellation_completed",
        }
    }

    /// 文字消息归类：去掉首尾空白后与关键字完全比对；空字符串返回 None
    pub fn from_text(text: &str, keywords: &Keywords) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let signal = if text == keywords.start_booking {
            Signal::StartBooking
        } else if text == keywords.query {
            Signal::QueryRequest
        } else if text == keywords.cancel {
            Signal::CancelRequest
        } else if text == keywords.abort {
            Signal::AbortRequest
        } else if text == keywords.faq {
            Signal::FaqRequest
        } else {
            Signal::TextInput(text.to_string())
        };
        Some(signal)
    }
}

/// 指令关键字（可在配置 [keywords] 段覆盖）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub start_booking: String,
    pub query: String,
    pub cancel: String,
    pub abort: String,
    pub faq: String,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            start_booking: "我要預約".to_string(),
            query: "查詢預約".to_string(),
            cancel: "取消預約".to_string(),
            abort: "放棄".to_string(),
            faq: "常見問題".to_string(),
        }
    }
}
