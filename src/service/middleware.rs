//! Request metrics middleware
//!
//! Performs the per-request instrument observations for every request passing
//! through the service router: the request counter, the in-progress gauge,
//! the latency histogram and summary, the size summaries, and the one
//! status-class count per completed response.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ServiceState;

pub async fn request_metrics_middleware(
    State(state): State<ServiceState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let uri = request.uri().path().to_string();
    let request_bytes = content_length(request.headers());
    let recorder = &state.recorder;

    recorder.total_requests(&method, &uri).increment(1);
    let inprogress = recorder.inprogress_requests(&method, &uri);
    inprogress.increment(1.0);

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    inprogress.decrement(1.0);
    recorder.latency_histogram(&method, &uri).record(elapsed);
    recorder.latency_summary(&method, &uri).record(elapsed);
    recorder.request_size().record(request_bytes as f64);
    recorder
        .response_size()
        .record(content_length(response.headers()) as f64);
    recorder.classify_and_count(response.status().as_u16());

    response
}

fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
