//! 会话记录与步骤
//!
//! 「空闲」没有对应的存储值：记录不存在即空闲。

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// 对话所处的步骤（记录存在时才有意义）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    AwaitingName,
    AwaitingService,
    AwaitingSubmission,
    /// 已发出后端调用，作为同一用户重复投递的锁
    Processing,
    Querying,
    InitiatingCancellation,
    ConfirmingCancellation,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::AwaitingName => "awaiting_name",
            Step::AwaitingService => "awaiting_service",
            Step::AwaitingSubmission => "awaiting_submission",
            Step::Processing => "processing",
            Step::Querying => "querying",
            Step::InitiatingCancellation => "initiating_cancellation",
            Step::ConfirmingCancellation => "confirming_cancellation",
        }
    }

    /// 日期 / 时间只允许在这两个步骤里修改
    pub fn accepts_date_time(&self) -> bool {
        matches!(self, Step::AwaitingSubmission | Step::Processing)
    }

    /// 等待后端返回中，不可被放弃或覆盖
    pub fn is_busy(&self) -> bool {
        matches!(self, Step::Processing | Step::Querying)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 日志用：记录不存在时输出 idle
pub fn step_label(record: Option<&SessionRecord>) -> &'static str {
    record.map(|r| r.step.as_str()).unwrap_or("idle")
}

/// 单个用户的对话记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub step: Step,
    pub name: Option<String>,
    pub service_item: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub appointment_to_cancel_id: Option<String>,
}

impl SessionRecord {
    /// 全新的记录（替换旧记录时使用）
    pub fn new(step: Step) -> Self {
        Self {
            step,
            name: None,
            service_item: None,
            date: None,
            time: None,
            appointment_to_cancel_id: None,
        }
    }

    pub fn with_step(&self, step: Step) -> Self {
        Self {
            step,
            ..self.clone()
        }
    }

    /// 四个必填字段齐全时返回 (姓名, 服务, 日期, 时间)
    pub fn booking_fields(&self) -> Option<(&str, &str, NaiveDate, NaiveTime)> {
        Some((
            self.name.as_deref()?,
            self.service_item.as_deref()?,
            self.date?,
            self.time?,
        ))
    }
}
