//! Server-Sent Events (SSE) utilities
//!
//! Shared streaming-response helpers for catalog services.

use axum::http::header::{HeaderName, CACHE_CONTROL, CONNECTION};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

/// Keep-alive comment interval for long-lived streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Header telling reverse proxies (nginx) not to buffer the response
pub const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Wrap an event stream into a streaming HTTP response
///
/// Each event is flushed as it is produced. The response carries headers
/// that disable intermediary buffering and caching and keep the connection
/// open; keep-alive comments are sent while the stream is idle.
///
/// # Example
/// ```rust,ignore
/// pub async fn events(State(state): State<AppState>) -> Response {
///     mcat_common::sse::event_stream_response(state.subscribe())
/// }
/// ```
pub fn event_stream_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("heartbeat"),
    );

    (
        [
            (CACHE_CONTROL, "no-cache, no-transform"),
            (CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        sse,
    )
        .into_response()
}
