//! 纯状态转移函数
//!
//! (当前记录, 信号) -> (记录变更, 动作列表)。不做任何 I/O：后端调用以 Action::CallBackend
//! 交给分发器执行，结果再以 *Completed 信号回到这里。

use crate::backend::{BackendRequest, BackendResult};

use super::action::{Completion, OutboundMessage, Transition};
use super::signal::{Keywords, Signal};
use super::state::{SessionRecord, Step};
use super::texts;

/// 转移所需的上下文
#[derive(Debug, Clone, Copy)]
pub struct DialogueContext<'a> {
    pub user_id: &'a str,
    pub keywords: &'a Keywords,
}

pub fn transition(
    ctx: &DialogueContext<'_>,
    record: Option<&SessionRecord>,
    signal: Signal,
) -> Transition {
    let step = record.map(|r| r.step);

    match signal {
        Signal::FaqRequest => Transition::keep().reply(vec![OutboundMessage::Faq]),

        // ============================================================
        // 预约流程
        // ============================================================
        Signal::StartBooking => {
            if step == Some(Step::Processing) {
                return busy();
            }
            Transition::put(SessionRecord::new(Step::AwaitingName)).reply_text(texts::ASK_NAME)
        }

        Signal::TextInput(text) => match record {
            Some(r) if r.step == Step::AwaitingName => {
                let mut next = r.with_step(Step::AwaitingService);
                let reply = texts::ask_service(&text);
                next.name = Some(text);
                Transition::put(next).reply_text(reply)
            }
            Some(r) if r.step == Step::AwaitingService => {
                let mut next = r.with_step(Step::AwaitingSubmission);
                let reply = texts::ask_date_time(&text);
                next.service_item = Some(text);
                Transition::put(next).reply(vec![
                    OutboundMessage::Text(reply),
                    OutboundMessage::BookingForm,
                ])
            }
            _ => help(ctx),
        },

        Signal::DateSelected(date) => match record {
            Some(r) if r.step.accepts_date_time() => {
                let Some(date) = date else {
                    return Transition::keep();
                };
                let mut next = r.clone();
                next.date = Some(date);
                Transition::put(next).push_text(texts::date_selected(date))
            }
            _ => help(ctx),
        },

        Signal::TimeSelected(time) => match record {
            Some(r) if r.step.accepts_date_time() => {
                let Some(time) = time else {
                    return Transition::keep();
                };
                let mut next = r.clone();
                next.time = Some(time);
                Transition::put(next).push_text(texts::time_selected(time))
            }
            _ => help(ctx),
        },

        Signal::SubmitBooking => match record {
            Some(r) if r.step == Step::AwaitingSubmission => {
                // 字段不全时保留已选的日期 / 时间，方便用户补齐后重新送出
                let Some((name, service_item, date, time)) = r.booking_fields() else {
                    return Transition::keep().reply_text(texts::INCOMPLETE_FORM);
                };
                let request = BackendRequest::BookAppointment {
                    user_id: ctx.user_id.to_string(),
                    name: name.to_string(),
                    service_item: service_item.to_string(),
                    date: date.format("%Y-%m-%d").to_string(),
                    time: time.format("%H:%M").to_string(),
                };
                Transition::put(r.with_step(Step::Processing))
                    .reply_text(texts::PROCESSING)
                    .call(request, Completion::Booking)
            }
            Some(r) if r.step == Step::Processing => busy(),
            _ => help(ctx),
        },

        Signal::BookingCompleted(result) => {
            finish_if(record, Step::Processing).push_text(result_text(&result))
        }

        // ============================================================
        // 查询
        // ============================================================
        Signal::QueryRequest => {
            if step == Some(Step::Processing) {
                return busy();
            }
            Transition::put(SessionRecord::new(Step::Querying))
                .reply_text(texts::QUERYING)
                .call(
                    BackendRequest::QueryAppointments {
                        user_id: ctx.user_id.to_string(),
                    },
                    Completion::Query,
                )
        }

        Signal::QueryCompleted(result) => {
            let done = finish_if(record, Step::Querying);
            match result {
                BackendResult::Success { data, .. } if data.is_empty() => {
                    done.push_text(texts::NO_APPOINTMENTS)
                }
                BackendResult::Success { data, .. } => {
                    done.push(vec![OutboundMessage::AppointmentList {
                        appointments: data,
                        cancellable: false,
                    }])
                }
                failure => done.push_text(result_text(&failure)),
            }
        }

        // ============================================================
        // 取消
        // ============================================================
        Signal::CancelRequest => {
            if step == Some(Step::Processing) {
                return busy();
            }
            Transition::put(SessionRecord::new(Step::InitiatingCancellation))
                .reply_text(texts::QUERYING_FOR_CANCELLATION)
                .call(
                    BackendRequest::QueryAppointments {
                        user_id: ctx.user_id.to_string(),
                    },
                    Completion::CancellationList,
                )
        }

        Signal::CancellationListCompleted(result) => match result {
            // 查询期间用户已放弃或换了流程：按钮只会导向说明文字，不再展示
            _ if step != Some(Step::InitiatingCancellation) => Transition::keep(),
            // 列表已展示，保留记录等待用户挑选
            BackendResult::Success { data, .. } if !data.is_empty() => {
                Transition::keep().push(vec![OutboundMessage::AppointmentList {
                    appointments: data,
                    cancellable: true,
                }])
            }
            BackendResult::Success { .. } => Transition::delete().push_text(texts::NO_APPOINTMENTS),
            failure => Transition::delete().push_text(result_text(&failure)),
        },

        Signal::SelectAppointmentForCancellation(id) => match record {
            Some(r)
                if matches!(
                    r.step,
                    Step::InitiatingCancellation | Step::ConfirmingCancellation
                ) =>
            {
                let mut next = r.with_step(Step::ConfirmingCancellation);
                next.appointment_to_cancel_id = Some(id.clone());
                Transition::put(next).reply(vec![OutboundMessage::CancelConfirmation {
                    appointment_id: id,
                }])
            }
            _ => help(ctx),
        },

        Signal::ConfirmCancellation(id) => match record {
            Some(r)
                if r.step == Step::ConfirmingCancellation
                    && r.appointment_to_cancel_id.as_deref() == Some(id.as_str()) =>
            {
                Transition::put(r.with_step(Step::Processing))
                    .reply_text(texts::CANCELLING)
                    .call(
                        BackendRequest::CancelAppointment {
                            user_id: ctx.user_id.to_string(),
                            appointment_id: id,
                        },
                        Completion::Cancellation,
                    )
            }
            _ => Transition::keep().reply_text(texts::INVALID_REQUEST),
        },

        Signal::CancellationCompleted(result) => {
            finish_if(record, Step::Processing).push_text(result_text(&result))
        }

        // ============================================================
        // 放弃
        // ============================================================
        Signal::AbortRequest => match step {
            Some(s) if s.is_busy() => busy(),
            Some(_) => Transition::delete().reply_text(texts::OPERATION_CANCELLED),
            None => help(ctx),
        },
    }
}

/// 后端结束后清理记录；记录已被新流程替换时不动它
fn finish_if(record: Option<&SessionRecord>, expected: Step) -> Transition {
    match record {
        Some(r) if r.step != expected => Transition::keep(),
        _ => Transition::delete(),
    }
}

fn result_text(result: &BackendResult) -> String {
    match result {
        BackendResult::Success { message, .. } if !message.is_empty() => message.clone(),
        BackendResult::Success { .. } => texts::DONE.to_string(),
        BackendResult::Failure {
            message: Some(message),
        } if !message.is_empty() => message.clone(),
        BackendResult::Failure { .. } => texts::BACKEND_FAILURE.to_string(),
    }
}

fn busy() -> Transition {
    Transition::keep().reply_text(texts::ALREADY_PROCESSING)
}

fn help(ctx: &DialogueContext<'_>) -> Transition {
    Transition::keep().reply_text(texts::help(ctx.keywords))
}
