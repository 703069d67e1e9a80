//! 回复给用户的固定文字

use chrono::{NaiveDate, NaiveTime};

use super::signal::Keywords;

pub const ASK_NAME: &str = "好的，我們開始進行預約。\n請問您的預約姓名是？";
pub const PROCESSING: &str = "收到您的預約，正在為您確認時段是否可用...";
pub const ALREADY_PROCESSING: &str = "您的請求正在處理中，請稍候片刻。";
pub const INCOMPLETE_FORM: &str =
    "抱歉，您尚未選擇完整的預約資訊（日期或時間），請在表單上點選後再送出。";
pub const BACKEND_FAILURE: &str = "抱歉，預約系統發生了一些問題，請稍後再試或聯絡客服人員。";
pub const QUERYING: &str = "正在為您查詢預約紀錄，請稍候...";
pub const QUERYING_FOR_CANCELLATION: &str = "正在為您查詢可取消的預約，請稍候...";
pub const NO_APPOINTMENTS: &str = "目前查無您的預約紀錄。";
pub const CANCELLING: &str = "正在為您取消預約，請稍候...";
pub const INVALID_REQUEST: &str = "此操作無效或已過期，請重新操作。";
pub const OPERATION_CANCELLED: &str = "已為您取消目前的操作。";
/// 后端成功但没带说明文字时
pub const DONE: &str = "完成！";

pub fn ask_service(name: &str) -> String {
    format!("好的，{name}！\n請問您想預約的服務項目是？")
}

pub fn ask_date_time(service_item: &str) -> String {
    format!("已為您記錄服務項目「{service_item}」。\n請選擇您希望的預約日期與時間。")
}

pub fn date_selected(date: NaiveDate) -> String {
    format!("已選擇日期：{}", date.format("%Y-%m-%d"))
}

pub fn time_selected(time: NaiveTime) -> String {
    format!("已選擇時間：{}", time.format("%H:%M"))
}

/// 列出三個可用指令
pub fn help(keywords: &Keywords) -> String {
    format!(
        "您好！請輸入以下指令：\n・{}\n・{}\n・{}",
        keywords.start_booking, keywords.query, keywords.cancel
    )
}
