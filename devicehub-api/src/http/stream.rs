//! Server-sent event relay for live device records
//!
//! Each connection holds exactly one broker subscription. The subscription is
//! owned by the response stream, so a client disconnect drops the stream and
//! deregisters it on every exit path.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};

use devicehub_broker::DeviceEvent;
use devicehub_core::config::StreamConfig;
use devicehub_core::models::DeviceId;
use devicehub_core::validation;

use super::{AppResult, AppState};

/// GET /api/telemetry/{device_id}/stream
pub async fn stream_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let device_id = DeviceId::from(device_id);
    validation::validate_device_id(&device_id)?;

    let subscription = state.broker.subscribe(device_id.clone()).await?;
    info!(
        device_id = %device_id,
        subscription_id = %subscription.id(),
        "Stream consumer connected"
    );

    let names = Arc::clone(&state.stream);
    let events = subscription
        .into_stream()
        .map(move |event| Ok(to_sse_event(&event, &names)));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

/// Encode one record under its configured event name; the payload is the bare record
fn to_sse_event(event: &DeviceEvent, names: &StreamConfig) -> Event {
    let encoded = match event {
        DeviceEvent::Telemetry(telemetry) => Event::default()
            .event(&names.telemetry_event_name)
            .json_data(telemetry),
        DeviceEvent::StatusChanged(status) => Event::default()
            .event(&names.status_event_name)
            .json_data(status),
    };

    encoded.unwrap_or_else(|e| {
        warn!(
            device_id = %event.device_id(),
            event_type = event.event_type(),
            error = %e,
            "Failed to encode stream event"
        );
        Event::default().comment("encoding error")
    })
}

