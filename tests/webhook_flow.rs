mod common;

use common::client;
use rtms::{Client, JoinRequest, PollMode, SessionState, WebhookHandler};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use testing_tools::{rtms_started_payload, Call, WebhookClient};

fn webhook_client(client: &Client) -> WebhookClient {
    let addr = client.webhook_addr().expect("webhook server is running");
    WebhookClient::new(format!("http://{addr}/"))
}

fn join_on_started(joiner: Client) -> WebhookHandler {
    WebhookHandler::simple(move |payload| {
        if payload["event"] == "meeting.rtms_started" {
            joiner.join(JoinRequest::from_webhook_payload(payload)?)?;
        }
        Ok(())
    })
}

#[tokio::test]
async fn started_notification_joins_on_next_pump() {
    let (client, probe) = client(PollMode::External);
    client.on_webhook_event(join_on_started(client.clone())).unwrap();

    let reply = webhook_client(&client)
        .post_json(&rtms_started_payload("meeting-uuid", "stream-id", "wss://a,wss://b"))
        .await
        .unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.json().unwrap(), json!({"status": "ok"}));
    assert_eq!(probe.count(|call| matches!(call, Call::Join(_))), 0);

    client.pump().unwrap();
    assert_eq!(client.state(), SessionState::Active);
    let joined = probe.joined().unwrap();
    assert_eq!(joined.meeting_uuid, "meeting-uuid");
    assert_eq!(joined.server_urls, "wss://a,wss://b");
    assert_eq!(probe.threads(), HashSet::from([thread::current().id()]));

    assert!(client.stop_webhook());
    client.leave().unwrap();
}

#[tokio::test]
async fn payload_is_forwarded_to_the_owner_thread() {
    let (client, _) = client(PollMode::External);
    let received: Arc<Mutex<Vec<(Value, thread::ThreadId)>>> = Arc::default();
    let sink = Arc::clone(&received);
    client.on_webhook_received(move |payload| {
        sink.lock()
            .unwrap()
            .push((payload.clone(), thread::current().id()));
    });
    client
        .on_webhook_event(WebhookHandler::simple(|_| Ok(())))
        .unwrap();

    let payload = json!({"event": "meeting.participant_joined", "payload": {"id": 1}});
    let reply = webhook_client(&client).post_json(&payload).await.unwrap();
    assert_eq!(reply.status, 200);
    assert!(received.lock().unwrap().is_empty());

    client.pump().unwrap();
    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, payload);
    assert_eq!(received[0].1, thread::current().id());
}

#[tokio::test]
async fn failed_handler_is_not_forwarded() {
    let (client, _) = client(PollMode::External);
    let received = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&received);
    client.on_webhook_received(move |_| {
        *counter.lock().unwrap() += 1;
    });
    client
        .on_webhook_event(WebhookHandler::simple(|_| Err("unsupported event".into())))
        .unwrap();

    let reply = webhook_client(&client)
        .post_json(&json!({"event": "unknown"}))
        .await
        .unwrap();
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, "Error: unsupported event");

    client.pump().unwrap();
    assert_eq!(*received.lock().unwrap(), 0);
}

#[tokio::test]
async fn invalid_join_payload_fails_the_request() {
    let (client, probe) = client(PollMode::External);
    client.on_webhook_event(join_on_started(client.clone())).unwrap();

    let mut payload = rtms_started_payload("meeting-uuid", "stream-id", "wss://a");
    payload["payload"]["rtms_stream_id"] = json!("");
    let reply = webhook_client(&client).post_json(&payload).await.unwrap();
    assert_eq!(reply.status, 500);

    client.pump().unwrap();
    assert_eq!(probe.count(|call| matches!(call, Call::Join(_))), 0);
}

#[test]
fn background_mode_picks_up_webhook_joins() {
    let (client, probe) = client(PollMode::Background);
    client.on_webhook_event(join_on_started(client.clone())).unwrap();
    assert!(client.is_polling());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let reply = runtime
        .block_on(
            webhook_client(&client)
                .post_json(&rtms_started_payload("meeting-uuid", "stream-id", "wss://a")),
        )
        .unwrap();
    assert_eq!(reply.status, 200);

    assert!(common::wait_for(|| client.state() == SessionState::Active));
    assert!(client.leave().unwrap());
    assert_eq!(probe.count(|call| *call == Call::Release), 1);
}
