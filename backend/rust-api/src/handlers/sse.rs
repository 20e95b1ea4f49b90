use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::metrics::SSE_CONNECTIONS_ACTIVE;
use crate::models::SurveyEvent;
use crate::services::AppState;

/// SSE endpoint delivering a flow's selection changes and its completion.
/// GET /api/v1/surveys/{id}/stream
pub async fn survey_stream(
    State(state): State<Arc<AppState>>,
    Path(survey_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let receiver = state
        .surveys
        .subscribe(&survey_id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;

    tracing::info!("Client connected to SSE stream: survey={}", survey_id);
    let stream = create_event_stream(receiver);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn create_event_stream(
    receiver: broadcast::Receiver<SurveyEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (receiver, ConnectionGuard::new()),
        |(mut receiver, guard)| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let sse_event = Event::default()
                            .event(event.event_name())
                            .data(event.to_sse_data());
                        return Some((Ok(sse_event), (receiver, guard)));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("SSE subscriber lagged, {} events dropped", skipped);
                        continue;
                    }
                    // The flow was abandoned; end the stream.
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        },
    )
}

struct ConnectionGuard;

impl ConnectionGuard {
    fn new() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}
