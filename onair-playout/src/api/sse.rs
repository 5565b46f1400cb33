//! Server-Sent Events (SSE) stream
//!
//! Streams playout events to connected clients, optionally narrowed to one
//! channel with `?channel_id=`.

use crate::api::server::AppContext;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    channel_id: Option<Uuid>,
}

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected (channel filter: {:?})", filter.channel_id);

    let rx = ctx.state.subscribe_events();
    let wanted = filter.channel_id;

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) => {
                if wanted.is_some_and(|id| id != event.channel_id()) {
                    return None;
                }
                match serde_json::to_string(&event) {
                    Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
                    Err(e) => {
                        warn!("Failed to serialize event: {}", e);
                        None
                    }
                }
            }
            Err(e) => {
                // Lagged receivers skip ahead
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
