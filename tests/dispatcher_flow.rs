//! 分发器端到端流程测试：Mock 后端 + 记录型通道 + 内存会话

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use booking::backend::{Appointment, BackendRequest, BackendResult, MockBackend};
    use booking::dialogue::texts;
    use booking::dialogue::{Keywords, OutboundMessage, Step};
    use booking::line::{Delivery, RecordingChannel, WebhookEvent};
    use booking::session::{MemorySessionStore, SessionStore};
    use booking::{Dispatcher, EventOutcome};
    use serde_json::json;

    struct Harness {
        dispatcher: Dispatcher,
        backend: Arc<MockBackend>,
        channel: Arc<RecordingChannel>,
        store: Arc<MemorySessionStore>,
    }

    fn harness(backend: MockBackend, channel: RecordingChannel) -> Harness {
        let backend = Arc::new(backend);
        let channel = Arc::new(channel);
        let store = Arc::new(MemorySessionStore::default());
        let dispatcher = Dispatcher::new(
            store.clone(),
            backend.clone(),
            channel.clone(),
            Keywords::default(),
        );
        Harness {
            dispatcher,
            backend,
            channel,
            store,
        }
    }

    fn text_event(user: &str, text: &str) -> WebhookEvent {
        serde_json::from_value(json!({
            "type": "message",
            "replyToken": format!("rt-{text}"),
            "source": { "type": "user", "userId": user },
            "message": { "type": "text", "id": "m1", "text": text }
        }))
        .unwrap()
    }

    fn postback_event(user: &str, data: &str, params: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(json!({
            "type": "postback",
            "replyToken": format!("rt-{data}"),
            "source": { "type": "user", "userId": user },
            "postback": { "data": data, "params": params }
        }))
        .unwrap()
    }

    fn appt(id: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            name: "Alice".to_string(),
            service_item: "cleaning".to_string(),
            date: "2025-06-20".to_string(),
            time: "14:00".to_string(),
        }
    }

    async fn step_of(h: &Harness, user: &str) -> Option<Step> {
        h.store.get(user).await.map(|r| r.step)
    }

    async fn fill_booking_form(h: &Harness, user: &str) {
        for event in [
            text_event(user, "我要預約"),
            text_event(user, "Alice"),
            text_event(user, "cleaning"),
            postback_event(user, "action=select_date", json!({ "date": "2025-06-20" })),
            postback_event(user, "action=select_time", json!({ "time": "14:00" })),
        ] {
            assert_eq!(
                h.dispatcher.handle_event(&event).await.unwrap(),
                EventOutcome::Handled
            );
        }
        assert_eq!(step_of(h, user).await, Some(Step::AwaitingSubmission));
    }

    #[tokio::test]
    async fn test_full_booking_flow() {
        let h = harness(
            MockBackend::new().respond(BackendResult::success("Booked!")),
            RecordingChannel::new(),
        );
        fill_booking_form(&h, "U1").await;

        let record = h.store.get("U1").await.unwrap();
        assert_eq!(record.name.as_deref(), Some("Alice"));
        assert_eq!(record.service_item.as_deref(), Some("cleaning"));

        let submit = postback_event("U1", "action=submit_booking", json!(null));
        h.dispatcher.handle_event(&submit).await.unwrap();

        assert_eq!(
            h.backend.requests(),
            vec![BackendRequest::BookAppointment {
                user_id: "U1".into(),
                name: "Alice".into(),
                service_item: "cleaning".into(),
                date: "2025-06-20".into(),
                time: "14:00".into(),
            }]
        );

        let deliveries = h.channel.deliveries();
        let last_two = &deliveries[deliveries.len() - 2..];
        assert!(matches!(&last_two[0], Delivery::Reply { reply_token, .. } if reply_token == "rt-action=submit_booking"));
        assert_eq!(last_two[0].messages(), &[OutboundMessage::text(texts::PROCESSING)]);
        assert!(matches!(&last_two[1], Delivery::Push { user_id, .. } if user_id == "U1"));
        assert_eq!(last_two[1].messages(), &[OutboundMessage::text("Booked!")]);

        assert!(h.store.get("U1").await.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_submission_never_reaches_backend() {
        let h = harness(MockBackend::new(), RecordingChannel::new());
        for event in [
            text_event("U1", "我要預約"),
            text_event("U1", "Alice"),
            text_event("U1", "cleaning"),
            postback_event("U1", "action=select_date", json!({ "date": "2025-06-20" })),
            postback_event("U1", "action=submit_booking", json!(null)),
        ] {
            h.dispatcher.handle_event(&event).await.unwrap();
        }

        assert_eq!(h.backend.call_count(), 0);
        assert_eq!(h.channel.texts().last().map(String::as_str), Some(texts::INCOMPLETE_FORM));
        let record = h.store.get("U1").await.unwrap();
        assert_eq!(record.step, Step::AwaitingSubmission);
        assert!(record.date.is_some());
        assert!(record.time.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_call_backend_once() {
        let h = harness(
            MockBackend::new()
                .with_delay(Duration::from_millis(50))
                .respond(BackendResult::success("Booked!")),
            RecordingChannel::new(),
        );
        fill_booking_form(&h, "U1").await;

        let submit = postback_event("U1", "action=submit_booking", json!(null));
        let report = h.dispatcher.dispatch(&[submit.clone(), submit]).await;

        assert_eq!(report.handled, 2);
        assert_eq!(h.backend.call_count(), 1);
        let sent = h.channel.texts();
        assert!(sent.iter().any(|t| t == texts::ALREADY_PROCESSING));
        assert!(sent.iter().any(|t| t == "Booked!"));
        assert!(h.store.get("U1").await.is_none());
    }

    #[tokio::test]
    async fn test_backend_failure_still_ends_dialogue() {
        let h = harness(
            MockBackend::new().respond(BackendResult::generic_failure()),
            RecordingChannel::new(),
        );
        fill_booking_form(&h, "U1").await;
        let submit = postback_event("U1", "action=submit_booking", json!(null));
        h.dispatcher.handle_event(&submit).await.unwrap();

        assert_eq!(h.channel.texts().last().map(String::as_str), Some(texts::BACKEND_FAILURE));
        assert!(h.store.get("U1").await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_flow() {
        let h = harness(
            MockBackend::new()
                .respond(BackendResult::with_data("ok", vec![appt("A1"), appt("A2")]))
                .respond(BackendResult::success("已取消")),
            RecordingChannel::new(),
        );

        h.dispatcher.handle_event(&text_event("U1", "取消預約")).await.unwrap();
        assert_eq!(step_of(&h, "U1").await, Some(Step::InitiatingCancellation));
        let list = h.channel.deliveries().last().cloned().unwrap();
        assert!(list.is_push());
        assert!(matches!(
            &list.messages()[0],
            OutboundMessage::AppointmentList { appointments, cancellable: true } if appointments.len() == 2
        ));

        let select = postback_event("U1", "action=select_cancel&id=A1", json!(null));
        h.dispatcher.handle_event(&select).await.unwrap();
        let record = h.store.get("U1").await.unwrap();
        assert_eq!(record.step, Step::ConfirmingCancellation);
        assert_eq!(record.appointment_to_cancel_id.as_deref(), Some("A1"));

        // 确认的不是刚选的那一笔
        let wrong = postback_event("U1", "action=confirm_cancel&id=A2", json!(null));
        h.dispatcher.handle_event(&wrong).await.unwrap();
        assert_eq!(h.channel.texts().last().map(String::as_str), Some(texts::INVALID_REQUEST));
        assert_eq!(h.backend.call_count(), 1);

        let confirm = postback_event("U1", "action=confirm_cancel&id=A1", json!(null));
        h.dispatcher.handle_event(&confirm).await.unwrap();
        assert_eq!(
            h.backend.requests().last(),
            Some(&BackendRequest::CancelAppointment {
                user_id: "U1".into(),
                appointment_id: "A1".into(),
            })
        );
        assert_eq!(h.channel.texts().last().map(String::as_str), Some("已取消"));
        assert!(h.store.get("U1").await.is_none());
    }

    #[tokio::test]
    async fn test_query_without_appointments() {
        let h = harness(
            MockBackend::new().respond(BackendResult::success("ok")),
            RecordingChannel::new(),
        );
        h.dispatcher.handle_event(&text_event("U1", "查詢預約")).await.unwrap();
        assert_eq!(
            h.channel.texts(),
            vec![texts::QUERYING.to_string(), texts::NO_APPOINTMENTS.to_string()]
        );
        assert!(h.store.get("U1").await.is_none());
    }

    #[tokio::test]
    async fn test_abort_mid_booking() {
        let h = harness(MockBackend::new(), RecordingChannel::new());
        h.dispatcher.handle_event(&text_event("U1", "我要預約")).await.unwrap();
        h.dispatcher.handle_event(&text_event("U1", "放棄")).await.unwrap();
        assert!(h.store.get("U1").await.is_none());
        assert_eq!(
            h.channel.texts().last().map(String::as_str),
            Some(texts::OPERATION_CANCELLED)
        );
    }

    #[tokio::test]
    async fn test_failed_push_does_not_affect_other_events() {
        let h = harness(
            MockBackend::new().respond(BackendResult::success("Booked!")),
            RecordingChannel::new(),
        );
        fill_booking_form(&h, "U2").await;
        h.channel.set_failing_pushes(true);

        let events = [
            postback_event("U2", "action=submit_booking", json!(null)),
            text_event("U1", "常見問題"),
        ];
        let report = h.dispatcher.dispatch(&events).await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.handled, 1);
        // 结果推送失败，但记录照样清理
        assert!(h.store.get("U2").await.is_none());
        assert!(h
            .channel
            .deliveries()
            .iter()
            .any(|d| d.messages() == [OutboundMessage::Faq]));
    }

    #[tokio::test]
    async fn test_redelivered_event_is_skipped() {
        let h = harness(MockBackend::new(), RecordingChannel::new());
        let event: WebhookEvent = serde_json::from_value(json!({
            "type": "message",
            "replyToken": "rt",
            "webhookEventId": "01H000000000000000000000",
            "deliveryContext": { "isRedelivery": true },
            "source": { "type": "user", "userId": "U1" },
            "message": { "type": "text", "id": "m1", "text": "我要預約" }
        }))
        .unwrap();

        let report = h.dispatcher.dispatch(&[event.clone(), event]).await;
        assert_eq!(report.handled, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(h.channel.deliveries().len(), 1);
    }

    #[tokio::test]
    async fn test_non_text_events_are_ignored() {
        let h = harness(MockBackend::new(), RecordingChannel::new());
        let sticker: WebhookEvent = serde_json::from_value(json!({
            "type": "message",
            "replyToken": "rt",
            "source": { "type": "user", "userId": "U1" },
            "message": { "type": "sticker", "id": "m1", "packageId": "1", "stickerId": "1" }
        }))
        .unwrap();
        let follow: WebhookEvent = serde_json::from_value(json!({
            "type": "follow",
            "replyToken": "rt2",
            "source": { "type": "user", "userId": "U1" }
        }))
        .unwrap();

        let report = h.dispatcher.dispatch(&[sticker, follow]).await;
        assert_eq!(report.ignored, 2);
        assert!(h.channel.deliveries().is_empty());
        assert!(h.store.get("U1").await.is_none());
    }
}
