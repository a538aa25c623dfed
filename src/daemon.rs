use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{CountdownBotError, Result};
use crate::interfaces::messenger::Messenger;
use crate::services::bot::ReminderBot;
use crate::store::ScheduleStore;

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub user_id: i64,
    pub text: String,
}

/// Messenger backed by a broadcast channel; subscribers receive notifier
/// output over the `/messages` event stream. Sending with no subscribers
/// drops the message, which is fine for a liveness-only transport.
pub struct BroadcastMessenger {
    sender: broadcast::Sender<OutboundMessage>,
}

impl BroadcastMessenger {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.sender.subscribe()
    }
}

#[async_trait::async_trait]
impl Messenger for BroadcastMessenger {
    async fn send_message(&self, user_id: i64, text: &str) -> Result<()> {
        let _ = self.sender.send(OutboundMessage {
            user_id,
            text: text.to_string(),
        });
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<ReminderBot>,
    pub messenger: Arc<BroadcastMessenger>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Deserialize)]
struct CommandRequest {
    user_id: i64,
    username: String,
    text: String,
}

#[derive(Serialize)]
struct CommandResponse {
    reply: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct MessageStreamQuery {
    user_id: Option<i64>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/command", post(command))
        .route("/messages", get(messages))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Bot is running!".to_string(),
    })
}

async fn command(
    State(state): State<AppState>,
    Json(payload): Json<CommandRequest>,
) -> impl IntoResponse {
    let result = state
        .bot
        .dispatch(payload.user_id, &payload.username, &payload.text)
        .await;

    match result {
        Ok(reply) => (StatusCode::OK, Json(CommandResponse { reply })).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn messages(
    State(state): State<AppState>,
    Query(query): Query<MessageStreamQuery>,
) -> impl IntoResponse {
    let mut receiver = state.messenger.subscribe();
    let filter_user = query.user_id;

    let body = Body::from_stream(async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(message) => {
                    if let Some(filter) = filter_user {
                        if message.user_id != filter {
                            continue;
                        }
                    }
                    let payload = serde_json::to_string(&message).unwrap_or_default();
                    let line = format!("data: {}\n\n", payload);
                    yield Ok::<Bytes, std::convert::Infallible>(Bytes::from(line));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    continue;
                }
                Err(_) => break,
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .body(body)
        .unwrap()
}

pub async fn run(host: &str, port: u16, data_path: &str) -> Result<()> {
    run_with_shutdown(host, port, data_path, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(host: &str, port: u16, data_path: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = Arc::new(ScheduleStore::open(data_path)?);
    let messenger = Arc::new(BroadcastMessenger::new(256));
    let bot = Arc::new(ReminderBot::new(store, messenger.clone()));

    let state = AppState {
        bot: bot.clone(),
        messenger,
    };
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CountdownBotError::Runtime(e.to_string()))?;
    tracing::info!(%addr, data_path, "countdown bot listening");

    let shutdown = async move {
        shutdown.await;
        bot.shutdown().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CountdownBotError::Runtime(e.to_string()))?;

    Ok(())
}
