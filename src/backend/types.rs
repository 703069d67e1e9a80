//! 后端请求 / 响应类型
//!
//! 请求体格式：`{ "action": "...", "userId": "...", ...字段 }`；
//! 响应体格式：`{ "message": "...", "data": [预约记录...] }`，出错时可能带 `"status": "error"`。

use serde::{Deserialize, Deserializer, Serialize};

/// 发送给表格脚本后端的动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BackendRequest {
    BookAppointment {
        user_id: String,
        name: String,
        service_item: String,
        /// YYYY-MM-DD
        date: String,
        /// HH:MM
        time: String,
    },
    QueryAppointments {
        user_id: String,
    },
    CancelAppointment {
        user_id: String,
        appointment_id: String,
    },
}

impl BackendRequest {
    /// 动作名（与请求体中的 action 字段一致，用于日志）
    pub fn action(&self) -> &'static str {
        match self {
            BackendRequest::BookAppointment { .. } => "bookAppointment",
            BackendRequest::QueryAppointments { .. } => "queryAppointments",
            BackendRequest::CancelAppointment { .. } => "cancelAppointment",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            BackendRequest::BookAppointment { user_id, .. }
            | BackendRequest::QueryAppointments { user_id }
            | BackendRequest::CancelAppointment { user_id, .. } => user_id,
        }
    }
}

/// 后端返回的一条预约记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service_item: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

/// 后端调用结果：成功与失败都会让对话结束，区别只在于展示给用户的文字
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResult {
    Success {
        message: String,
        data: Vec<Appointment>,
    },
    /// message 为 None 时由状态机使用通用致歉文字
    Failure { message: Option<String> },
}

impl BackendResult {
    pub fn success(message: impl Into<String>) -> Self {
        BackendResult::Success {
            message: message.into(),
            data: Vec::new(),
        }
    }

    pub fn with_data(message: impl Into<String>, data: Vec<Appointment>) -> Self {
        BackendResult::Success {
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        BackendResult::Failure {
            message: Some(message.into()),
        }
    }

    /// 超时、网络错误等没有后端文字可展示的失败
    pub fn generic_failure() -> Self {
        BackendResult::Failure { message: None }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BackendResult::Success { .. })
    }
}

/// 响应体（字段全部可选，脚本端各版本不一致）
#[derive(Debug, Default, Deserialize)]
pub(crate) struct BackendResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub data: Option<Vec<Appointment>>,
}

/// 表格里的编号可能是数字，也可能是字符串
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "appointment id must be string or number, got {other}"
        ))),
    }
}
