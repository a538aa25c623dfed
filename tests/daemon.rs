use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

use countdown_bot::daemon::{build_router, AppState, BroadcastMessenger};
use countdown_bot::interfaces::messenger::Messenger;
use countdown_bot::services::bot::ReminderBot;
use countdown_bot::store::ScheduleStore;

fn make_state(dir: &tempfile::TempDir) -> AppState {
    let store = Arc::new(ScheduleStore::open(dir.path().join("schedules.json")).unwrap());
    let messenger = Arc::new(BroadcastMessenger::new(16));
    let bot = Arc::new(ReminderBot::new(store, messenger.clone()));
    AppState { bot, messenger }
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_fixed_status() {
    let dir = tempdir().unwrap();
    let app = build_router(make_state(&dir));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response.into_body()).await;
    assert_eq!(value["status"], "Bot is running!");
}

#[tokio::test]
async fn command_endpoint_drives_the_bot() {
    let dir = tempdir().unwrap();
    let state = make_state(&dir);
    let app = build_router(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/command")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"user_id": 1, "username": "ada", "text": "/set 1 2"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response.into_body()).await;
    let reply = value["reply"].as_str().unwrap();
    assert!(reply.starts_with("Schedule set for ada at "));

    assert!(state.bot.store().get(1).await.is_some());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/command")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"user_id": 1, "username": "ada", "text": "hi there"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let value = body_json(response.into_body()).await;
    assert_eq!(value["reply"], "Hello, ada!");
}

#[tokio::test]
async fn messages_route_streams_outbound_messages() {
    let dir = tempdir().unwrap();
    let state = make_state(&dir);
    let app = build_router(state.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/messages?user_id=7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );

    // The first message goes to another user and must be filtered out.
    state.messenger.send_message(8, "not for you").await.unwrap();
    state
        .messenger
        .send_message(7, "Reminder: 1 days 0 hours 0 minutes left!")
        .await
        .unwrap();

    let mut body = response.into_body();
    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), body.frame())
        .await
        .expect("stream produced no frame")
        .unwrap()
        .unwrap();
    let bytes = frame.into_data().unwrap();
    let line = std::str::from_utf8(&bytes).unwrap();
    assert!(line.starts_with("data: "));
    let value: Value = serde_json::from_str(line.trim_start_matches("data: ").trim()).unwrap();
    assert_eq!(value["user_id"], 7);
    assert_eq!(value["text"], "Reminder: 1 days 0 hours 0 minutes left!");
}

#[tokio::test]
async fn broadcast_messenger_reaches_subscribers() {
    let messenger = BroadcastMessenger::new(16);
    let mut receiver = messenger.subscribe();

    messenger.send_message(7, "Reminder: soon!").await.unwrap();
    let message = receiver.recv().await.unwrap();
    assert_eq!(message.user_id, 7);
    assert_eq!(message.text, "Reminder: soon!");

    // No subscribers is not an error.
    drop(receiver);
    messenger.send_message(7, "dropped").await.unwrap();
}
