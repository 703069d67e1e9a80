//! LINE Webhook 事件模型与归类
//!
//! 只关心两类事件：文字消息、postback（表单按钮 / 日期时间选择器）。
//! 其它事件（follow、贴图、图片等）归类为 None，直接忽略、不回复。

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use url::form_urlencoded;

use crate::dialogue::{Keywords, Signal};

/// Webhook 请求体
#[derive(Debug, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: Option<EventMessage>,
    pub postback: Option<Postback>,
    /// 同一事件重送时不变，用于去重
    pub webhook_event_id: Option<String>,
    pub delivery_context: Option<DeliveryContext>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    pub data: String,
    pub params: Option<PostbackParams>,
}

/// 日期时间选择器带回的值
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostbackParams {
    pub date: Option<String>,
    pub time: Option<String>,
    pub datetime: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}

/// 卡片按钮 postback data 中的 action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostbackAction {
    SelectDate,
    SelectTime,
    SubmitBooking,
    SelectCancel,
    ConfirmCancel,
}

impl PostbackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostbackAction::SelectDate => "select_date",
            PostbackAction::SelectTime => "select_time",
            PostbackAction::SubmitBooking => "submit_booking",
            PostbackAction::SelectCancel => "select_cancel",
            PostbackAction::ConfirmCancel => "confirm_cancel",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "select_date" => PostbackAction::SelectDate,
            "select_time" => PostbackAction::SelectTime,
            "submit_booking" => PostbackAction::SubmitBooking,
            "select_cancel" => PostbackAction::SelectCancel,
            "confirm_cancel" => PostbackAction::ConfirmCancel,
            _ => return None,
        })
    }

    /// 生成 postback data：`action=<name>[&id=<id>]`，按 form-urlencoded 编码，
    /// 编号中的 `&`、`=`、`%` 原样带回
    pub fn data(&self, id: Option<&str>) -> String {
        let mut data = form_urlencoded::Serializer::new(String::new());
        data.append_pair("action", self.as_str());
        if let Some(id) = id {
            data.append_pair("id", id);
        }
        data.finish()
    }
}

impl WebhookEvent {
    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref()?.user_id.as_deref()
    }

    pub fn is_redelivery(&self) -> bool {
        self.delivery_context
            .as_ref()
            .is_some_and(|c| c.is_redelivery)
    }

    /// 归类为状态机信号；无法识别时返回 None
    pub fn classify(&self, keywords: &Keywords) -> Option<Signal> {
        match self.event_type.as_str() {
            "message" => {
                let msg = self.message.as_ref()?;
                if msg.message_type != "text" {
                    return None;
                }
                Signal::from_text(msg.text.as_deref()?, keywords)
            }
            "postback" => classify_postback(self.postback.as_ref()?),
            _ => None,
        }
    }
}

fn classify_postback(postback: &Postback) -> Option<Signal> {
    let mut action = None;
    let mut id = None;
    // 重复的键只认第一个
    for (key, value) in form_urlencoded::parse(postback.data.as_bytes()) {
        match key.as_ref() {
            "action" if action.is_none() => action = Some(PostbackAction::parse(&value)?),
            "id" if id.is_none() && !value.is_empty() => id = Some(value.into_owned()),
            _ => {}
        }
    }

    let params = postback.params.clone().unwrap_or_default();
    match action? {
        PostbackAction::SelectDate => Some(Signal::DateSelected(parse_date(&params))),
        PostbackAction::SelectTime => Some(Signal::TimeSelected(parse_time(&params))),
        PostbackAction::SubmitBooking => Some(Signal::SubmitBooking),
        PostbackAction::SelectCancel => id.map(Signal::SelectAppointmentForCancellation),
        PostbackAction::ConfirmCancel => id.map(Signal::ConfirmCancellation),
    }
}

fn parse_date(params: &PostbackParams) -> Option<NaiveDate> {
    let raw = params
        .date
        .as_deref()
        .or_else(|| params.datetime.as_deref().and_then(|dt| dt.get(..10)))?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!("Ignoring malformed postback date {:?}: {}", raw, e);
            None
        }
    }
}

fn parse_time(params: &PostbackParams) -> Option<NaiveTime> {
    let raw = params
        .time
        .as_deref()
        .or_else(|| params.datetime.as_deref().and_then(|dt| dt.get(11..)))?;
    match NaiveTime::parse_from_str(raw, "%H:%M") {
        Ok(time) => Some(time),
        Err(e) => {
            tracing::warn!("Ignoring malformed postback time {:?}: {}", raw, e);
            None
        }
    }
}
