use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chat::{ChatCoordinator, ChatError, SubscriberId};
use crate::event::{BusEventSource, MessageEvent, MessageSender};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ChatCoordinator>,
    pub bus: BusEventSource,
}

impl AppState {
    pub fn new(coordinator: Arc<ChatCoordinator>, bus: BusEventSource) -> Self {
        Self { coordinator, bus }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Chat unavailable: {0}")]
    Unavailable(#[from] ChatError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unavailable(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub sender_name: String,
    pub text: String,
    #[serde(default)]
    pub sender_id: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rooms/:room_id/events", get(stream_room))
        .route("/rooms/:room_id/messages", post(post_message))
        .with_state(state)
}

/// A live SSE subscription, released when the response stream is dropped
///
/// Dropping it cancels the connection token and unsubscribes right away,
/// without waiting for the room's next payload.
struct RoomSubscription {
    coordinator: Arc<ChatCoordinator>,
    room_id: String,
    subscriber_id: SubscriberId,
    _connection: DropGuard,
}

impl Drop for RoomSubscription {
    fn drop(&mut self) {
        match self.coordinator.unsubscribe(&self.room_id, self.subscriber_id) {
            Ok(()) => debug!(
                room_id = %self.room_id,
                subscriber_id = %self.subscriber_id,
                "Client left room events"
            ),
            // Shutdown already closes every subscriber
            Err(ChatError::Closed) => {}
        }
    }
}

/// Streams a room's payloads as Server-Sent Events
async fn stream_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let connection = CancellationToken::new();
    let (subscriber_id, receiver) = state
        .coordinator
        .subscribe_with_id(connection.clone(), &room_id)?;
    info!(room_id = %room_id, subscriber_id = %subscriber_id, "Client subscribed to room events");

    let subscription = RoomSubscription {
        coordinator: Arc::clone(&state.coordinator),
        room_id,
        subscriber_id,
        _connection: connection.drop_guard(),
    };
    let events = stream::unfold(
        (receiver, subscription),
        |(mut receiver, subscription)| async move {
            let payload = receiver.recv().await;
            payload.map(|payload| {
                let event = Event::default()
                    .event("message")
                    .data(String::from_utf8_lossy(&payload));
                (Ok::<_, Infallible>(event), (receiver, subscription))
            })
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Publishes a chat message onto the event bus
async fn post_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> Result<StatusCode, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }
    if state.coordinator.is_closed() {
        return Err(ChatError::Closed.into());
    }

    let sender_id = request
        .sender_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let event = MessageEvent::new(
        room_id,
        MessageSender::new(sender_id, request.sender_name),
        request.text,
    );

    debug!(room_id = %event.room_id, message_id = %event.id, "Publishing chat message");
    state.bus.publish(event);

    Ok(StatusCode::ACCEPTED)
}
