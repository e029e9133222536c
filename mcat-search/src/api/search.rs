//! Search endpoints
//!
//! - `GET /api/search/stream?q=` streams one event per provider as it settles
//! - `GET /api/search?q=` waits for every provider and returns one document
//! - `GET /api/search/resources` lists the providers the caller may search

use axum::{
    extract::{Query, State},
    response::{sse::Event, Response},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use super::identity::RequestIdentity;
use crate::aggregator::{CollectedSearch, EventSink, SearchRequest};
use crate::error::ApiResult;
use crate::AppState;

/// Query parameters for the search endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Search text; missing and blank are both rejected
    #[serde(default)]
    pub q: Option<String>,
}

/// One searchable provider, as exposed to clients
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSummary {
    pub key: String,
    pub name: String,
}

/// Provider listing response
#[derive(Debug, Serialize)]
pub struct ResourcesResponse {
    pub providers: Vec<ResourceSummary>,
    pub provider_timeout_secs: u64,
}

/// GET /api/search/stream?q=
///
/// Validation happens before the stream opens, so identity and query
/// errors are plain JSON error responses. Once the stream is open every
/// further failure travels as an event.
pub async fn search_stream(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    let request = SearchRequest::new(identity, params.q.as_deref().unwrap_or_default())?;

    let (sink, rx) = EventSink::channel();
    let aggregator = Arc::clone(&state.aggregator);

    // Runs to completion even if the client goes away mid-stream
    tokio::spawn(async move {
        let summary = aggregator.run(request, sink).await;
        debug!(
            search_id = %summary.search_id,
            delivered = summary.counts.terminal_delivered,
            "Search stream task finished"
        );
    });

    let stream = UnboundedReceiverStream::new(rx).filter_map(|event| async move {
        match Event::default().json_data(&event) {
            Ok(sse_event) => Some(Ok::<Event, Infallible>(sse_event)),
            Err(e) => {
                warn!(event = event.kind(), error = %e, "Failed to serialize search event");
                None
            }
        }
    });

    Ok(mcat_common::sse::event_stream_response(stream))
}

/// GET /api/search?q=
pub async fn search_collect(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<CollectedSearch>> {
    let request = SearchRequest::new(identity, params.q.as_deref().unwrap_or_default())?;
    let collected = state.aggregator.collect(request).await?;
    Ok(Json(collected))
}

/// GET /api/search/resources
pub async fn search_resources(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
) -> ApiResult<Json<ResourcesResponse>> {
    let providers = state
        .aggregator
        .providers_for(&identity)
        .await?
        .into_iter()
        .map(|p| ResourceSummary {
            key: p.key,
            name: p.name,
        })
        .collect();

    Ok(Json(ResourcesResponse {
        providers,
        provider_timeout_secs: state.aggregator.provider_timeout().as_secs(),
    }))
}
