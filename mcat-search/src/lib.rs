//! mcat-search library - streaming multi-source search
//!
//! Fans a query out to every provider the caller may search and streams the
//! results back one provider at a time as each settles.

use axum::Router;
use chrono::{DateTime, Utc};
use mcat_common::config::TomlConfig;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod aggregator;
pub mod api;
pub mod catalog;
pub mod error;
pub mod filter;
pub mod identity;
pub mod providers;

use aggregator::SearchAggregator;
use catalog::ConfigCatalog;
use providers::{HttpQueryExecutor, QueryError};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Search aggregator (shared by every request)
    pub aggregator: Arc<SearchAggregator>,
    /// Server startup time, reported by /health
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(aggregator: Arc<SearchAggregator>) -> Self {
        Self {
            aggregator,
            startup_time: Utc::now(),
        }
    }

    /// Wire the config-backed catalog and HTTP executor together
    pub fn from_config(config: TomlConfig) -> Result<Self, QueryError> {
        let executor = HttpQueryExecutor::new(
            config.search.request_timeout(),
            config.search.max_pages,
        )?;
        let provider_timeout = config.search.provider_timeout();
        let catalog = Arc::new(ConfigCatalog::new(config));

        let aggregator = SearchAggregator::new(
            catalog.clone(),
            Arc::new(executor),
            catalog.clone(),
            catalog,
            provider_timeout,
        );

        Ok(Self::new(Arc::new(aggregator)))
    }
}

/// Build application router
///
/// `/health` needs no identity; every `/api` route does.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let search = Router::new()
        .route("/api/search", get(api::search_collect))
        .route("/api/search/stream", get(api::search_stream))
        .route("/api/search/resources", get(api::search_resources));

    Router::new()
        .merge(search)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
