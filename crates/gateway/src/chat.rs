//! `POST /api/chat`: run one chat exchange and stream its events over SSE.

use std::convert::Infallible;

use askmycar_agent::StreamEvent;
use askmycar_core::{Conversation, Vehicle};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Json;
use axum::response::sse::{Event as SseEvent, Sse};
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{ApiError, SharedState, api_error};

pub(crate) const MISSING_FIELDS: &str = "Missing car or messages";

/// Request body. The browser sends its whole history on every call.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "vehicle")]
    pub car: Option<Vehicle>,

    #[serde(default, alias = "conversation")]
    pub messages: Option<Conversation>,
}

impl ChatRequest {
    /// Both fields, or `None` when either is absent or the history is empty.
    fn into_parts(self) -> Option<(Vehicle, Conversation)> {
        match (self.car, self.messages) {
            (Some(car), Some(messages)) if !messages.is_empty() => Some((car, messages)),
            _ => None,
        }
    }
}

pub(crate) async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected chat body");
        api_error(StatusCode::BAD_REQUEST, MISSING_FIELDS)
    })?;

    let (vehicle, conversation) = payload
        .into_parts()
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, MISSING_FIELDS))?;

    info!(vehicle = %vehicle, turns = conversation.len(), "Chat request");

    let cancel = CancellationToken::new();
    let rx = state.chat.clone().spawn(vehicle, conversation, cancel.clone());

    // Cancels the run when the response stream is dropped, including when
    // the client disconnects mid-answer.
    let guard = cancel.drop_guard();
    let stream = ReceiverStream::new(rx).map(move |event: StreamEvent| {
        let _guard = &guard;
        Ok(SseEvent::default().data(event.to_json()))
    });

    Ok(Sse::new(stream))
}
