//! Echo handler
//!
//! Simulates work by sleeping a bounded interval, records the slept time,
//! then echoes the request body back. An empty body gets a small JSON
//! acknowledgement instead.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use rand::Rng;
use tracing::debug;

use crate::metrics::RequestMetricsRecorder;

/// Request header overriding the random sleep interval, in milliseconds.
pub const SLEEP_HEADER: &str = "x-sleep-ms";

/// Shared state for the echo service
#[derive(Clone)]
pub struct ServiceState {
    pub recorder: Arc<RequestMetricsRecorder>,
    /// Upper bound for the simulated work interval, in milliseconds
    pub max_sleep_ms: u64,
}

pub async fn echo(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let sleep_ms = sleep_interval(&headers, state.max_sleep_ms);
    if sleep_ms > 0 {
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
    }
    state.recorder.sleep_time().record(sleep_ms as f64 / 1000.0);
    debug!(slept_ms = sleep_ms, bytes = body.len(), "Echoing request");

    let (payload, content_type) = if body.is_empty() {
        let ack = serde_json::json!({ "status": "ok", "slept_ms": sleep_ms });
        (
            Bytes::from(ack.to_string()),
            HeaderValue::from_static("application/json"),
        )
    } else {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
        (body, content_type)
    };

    let len = payload.len();
    let mut response = payload.into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
        .headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    response
}

/// Sleep interval for a request: the `x-sleep-ms` header if present, otherwise
/// uniformly random; always capped at `max_sleep_ms`.
fn sleep_interval(headers: &HeaderMap, max_sleep_ms: u64) -> u64 {
    let requested = headers
        .get(SLEEP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    match requested {
        Some(ms) => ms.min(max_sleep_ms),
        None => rand::thread_rng().gen_range(0..=max_sleep_ms),
    }
}
