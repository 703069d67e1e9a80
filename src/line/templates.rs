//! 把 OutboundMessage 渲染成 LINE 消息 JSON（text / flex）

use serde_json::{json, Value};

use crate::backend::Appointment;
use crate::dialogue::{Keywords, OutboundMessage};

use super::event::PostbackAction;

/// 单条文字消息上限
const MAX_TEXT_CHARS: usize = 5000;
/// carousel 最多 12 个 bubble
const MAX_CAROUSEL_BUBBLES: usize = 12;

const BRAND_COLOR: &str = "#007BFF";
const DANGER_COLOR: &str = "#DC3545";

/// 一条 OutboundMessage 可能渲染成多条 LINE 消息（长文字分段）
pub fn render(message: &OutboundMessage, keywords: &Keywords) -> Vec<Value> {
    match message {
        OutboundMessage::Text(text) => render_text(text),
        OutboundMessage::Faq => vec![faq_card(keywords)],
        OutboundMessage::BookingForm => vec![booking_form_card()],
        OutboundMessage::AppointmentList {
            appointments,
            cancellable,
        } => vec![appointment_carousel(appointments, *cancellable)],
        OutboundMessage::CancelConfirmation { appointment_id } => {
            vec![cancel_confirmation_card(appointment_id, keywords)]
        }
    }
}

pub fn render_all(messages: &[OutboundMessage], keywords: &Keywords) -> Vec<Value> {
    messages.iter().flat_map(|m| render(m, keywords)).collect()
}

fn render_text(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= MAX_TEXT_CHARS {
        return vec![json!({ "type": "text", "text": text })];
    }
    chars
        .chunks(MAX_TEXT_CHARS)
        .map(|c| json!({ "type": "text", "text": c.iter().collect::<String>() }))
        .collect()
}

fn header(title: &str, color: &str) -> Value {
    json!({
        "type": "box",
        "layout": "vertical",
        "contents": [{
            "type": "text",
            "text": title,
            "weight": "bold",
            "size": "xl",
            "color": "#FFFFFF"
        }],
        "backgroundColor": color,
        "paddingAll": "20px"
    })
}

fn labeled_row(label: &str, value: &str) -> Value {
    json!({
        "type": "box",
        "layout": "horizontal",
        "contents": [
            { "type": "text", "text": label, "flex": 2, "color": "#888888", "size": "sm" },
            { "type": "text", "text": value, "flex": 5, "wrap": true, "size": "sm" }
        ]
    })
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn picker_row(label: &str, button_label: &str, action: PostbackAction, mode: &str) -> Value {
    json!({
        "type": "box",
        "layout": "horizontal",
        "contents": [
            { "type": "text", "text": label, "flex": 2, "gravity": "center", "weight": "bold" },
            {
                "type": "button",
                "action": {
                    "type": "datetimepicker",
                    "label": button_label,
                    "data": action.data(None),
                    "mode": mode
                },
                "flex": 5,
                "style": "secondary",
                "height": "sm"
            }
        ]
    })
}

fn booking_form_card() -> Value {
    json!({
        "type": "flex",
        "altText": "預約表單",
        "contents": {
            "type": "bubble",
            "header": header("線上預約", BRAND_COLOR),
            "body": {
                "type": "box",
                "layout": "vertical",
                "spacing": "md",
                "contents": [
                    { "type": "text", "text": "請點選下方按鈕，選擇日期與時間", "wrap": true, "size": "md" },
                    { "type": "separator" },
                    picker_row("預約日期", "選擇日期", PostbackAction::SelectDate, "date"),
                    picker_row("預約時間", "選擇時間", PostbackAction::SelectTime, "time")
                ]
            },
            "footer": {
                "type": "box",
                "layout": "vertical",
                "contents": [{
                    "type": "button",
                    "action": {
                        "type": "postback",
                        "label": "送出預約",
                        "data": PostbackAction::SubmitBooking.data(None),
                        "displayText": "正在為您處理預約..."
                    },
                    "style": "primary",
                    "color": BRAND_COLOR
                }]
            }
        }
    })
}

fn appointment_bubble(appt: &Appointment, cancellable: bool) -> Value {
    // flex 的 text 不能为空字符串
    let title = if appt.service_item.is_empty() {
        "預約"
    } else {
        appt.service_item.as_str()
    };
    let mut bubble = json!({
        "type": "bubble",
        "size": "kilo",
        "header": header(title, BRAND_COLOR),
        "body": {
            "type": "box",
            "layout": "vertical",
            "spacing": "sm",
            "contents": [
                labeled_row("姓名", or_dash(&appt.name)),
                labeled_row("日期", or_dash(&appt.date)),
                labeled_row("時間", or_dash(&appt.time)),
                labeled_row("編號", or_dash(&appt.id))
            ]
        }
    });
    if cancellable {
        bubble["footer"] = json!({
            "type": "box",
            "layout": "vertical",
            "contents": [{
                "type": "button",
                "action": {
                    "type": "postback",
                    "label": "取消這筆預約",
                    "data": PostbackAction::SelectCancel.data(Some(&appt.id)),
                    "displayText": "我要取消這筆預約"
                },
                "style": "primary",
                "color": DANGER_COLOR
            }]
        });
    }
    bubble
}

fn appointment_carousel(appointments: &[Appointment], cancellable: bool) -> Value {
    let bubbles: Vec<Value> = appointments
        .iter()
        .take(MAX_CAROUSEL_BUBBLES)
        .map(|a| appointment_bubble(a, cancellable))
        .collect();
    let alt = if cancellable {
        "請選擇要取消的預約"
    } else {
        "您的預約紀錄"
    };
    json!({
        "type": "flex",
        "altText": alt,
        "contents": { "type": "carousel", "contents": bubbles }
    })
}

fn cancel_confirmation_card(appointment_id: &str, keywords: &Keywords) -> Value {
    json!({
        "type": "flex",
        "altText": "確認取消預約",
        "contents": {
            "type": "bubble",
            "header": header("確認取消", DANGER_COLOR),
            "body": {
                "type": "box",
                "layout": "vertical",
                "spacing": "md",
                "contents": [
                    { "type": "text", "text": "確定要取消以下預約嗎？", "wrap": true },
                    labeled_row("編號", appointment_id)
                ]
            },
            "footer": {
                "type": "box",
                "layout": "horizontal",
                "spacing": "md",
                "contents": [
                    {
                        "type": "button",
                        "action": {
                            "type": "postback",
                            "label": "確定取消",
                            "data": PostbackAction::ConfirmCancel.data(Some(appointment_id)),
                            "displayText": "確定取消"
                        },
                        "style": "primary",
                        "color": DANGER_COLOR
                    },
                    {
                        "type": "button",
                        "action": { "type": "message", "label": "先不要", "text": keywords.abort },
                        "style": "secondary"
                    }
                ]
            }
        }
    })
}

fn faq_entries(keywords: &Keywords) -> Vec<(&'static str, String)> {
    vec![
        (
            "如何預約？",
            format!(
                "輸入「{}」，依指示填寫姓名、服務項目，再於表單選擇日期與時間後送出。",
                keywords.start_booking
            ),
        ),
        (
            "如何查詢預約？",
            format!("輸入「{}」即可看到您目前的預約紀錄。", keywords.query),
        ),
        (
            "如何取消預約？",
            format!(
                "輸入「{}」，在列表中選擇要取消的預約並確認即可。",
                keywords.cancel
            ),
        ),
        ("營業時間？", "週一至週六 09:00-18:00，週日公休。".to_string()),
    ]
}

fn faq_card(keywords: &Keywords) -> Value {
    let mut contents = Vec::new();
    for (i, (q, a)) in faq_entries(keywords).iter().enumerate() {
        if i > 0 {
            contents.push(json!({ "type": "separator" }));
        }
        contents.push(json!({ "type": "text", "text": q, "weight": "bold", "wrap": true }));
        contents.push(json!({ "type": "text", "text": a, "wrap": true, "size": "sm", "color": "#555555" }));
    }
    json!({
        "type": "flex",
        "altText": "常見問題",
        "contents": {
            "type": "bubble",
            "header": header("常見問題", BRAND_COLOR),
            "body": { "type": "box", "layout": "vertical", "spacing": "md", "contents": contents }
        }
    })
}
