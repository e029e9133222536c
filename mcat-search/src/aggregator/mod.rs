//! Multi-source streaming search aggregator
//!
//! Given a user and a query, resolves the providers the user may query,
//! derives the user's content filter policy once, fans the query out to
//! every provider concurrently and streams one event per provider as each
//! settles.
//!
//! # Architecture
//! - [`dispatcher`]: one spawned, individually timed-out task per provider
//! - [`lifecycle`]: single writer to the sink, counters and state machine
//! - [`sink`]: the output channel, fail-soft after closure
//! - [`events`]: wire event types
//!
//! Settlement accounting happens in one place: `run` drains the pending
//! settlements and hands each to the guard, so every provider is counted
//! exactly once no matter how concurrently they finish.
//!
//! # Failure isolation
//! - Registry or policy lookup failure → one `error` event, nothing dispatched
//! - Provider error, timeout or panic → `provider_error` for that provider only
//! - Client disconnect → writes stop; in-flight provider tasks run to
//!   completion and their outcomes are discarded

pub mod dispatcher;
pub mod events;
pub mod lifecycle;
pub mod sink;

pub use dispatcher::{Dispatcher, ProviderOutcome, SearchContext, Settlement};
pub use events::SearchEvent;
pub use lifecycle::{LifecycleCounts, LifecycleGuard, LifecycleState};
pub use sink::{EventReceiver, EventSink};

use futures::StreamExt;
use mcat_common::{ProviderDescriptor, ResultRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::filter::{FilterPolicy, FilterWordSource, PolicyError, PolicySource};
use crate::identity::UserIdentity;
use crate::providers::{ProviderRegistry, QueryExecutor, RegistryError};

/// Invalid search requests (rejected before anything runs)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// Query missing or blank
    #[error("Search query must not be empty")]
    EmptyQuery,
}

/// Request-level failures detected before dispatch
#[derive(Debug, Error)]
pub enum SearchRejection {
    /// Provider registry lookup failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Policy lookup failed
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// One validated search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    identity: UserIdentity,
    query: String,
}

impl SearchRequest {
    /// Validate and build a request; the query is trimmed
    pub fn new(identity: UserIdentity, query: &str) -> Result<Self, RequestError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RequestError::EmptyQuery);
        }
        Ok(Self {
            identity,
            query: query.to_string(),
        })
    }

    /// Requesting user
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Trimmed query string
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// What happened to one search
#[derive(Debug)]
pub struct AggregationSummary {
    /// Correlation id (also carried by the `start` event)
    pub search_id: Uuid,
    /// Final counters and state
    pub counts: LifecycleCounts,
    /// Set when the search failed before dispatch
    pub rejection: Option<SearchRejection>,
    /// Wall-clock duration
    pub elapsed: Duration,
}

/// A provider that failed in a collected search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSource {
    /// Provider key
    pub provider: String,
    /// Provider display name
    pub provider_name: String,
    /// Reason
    pub error: String,
}

/// Whole-search result for non-streaming callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedSearch {
    /// Query as searched
    pub query: String,
    /// Records in settlement order
    pub results: Vec<ResultRecord>,
    /// Providers that failed or timed out
    pub failed_sources: Vec<FailedSource>,
    /// Number of records
    pub total_results: usize,
    /// Number of settled providers
    pub settled_providers: usize,
}

/// Streaming search aggregator
pub struct SearchAggregator {
    registry: Arc<dyn ProviderRegistry>,
    policy_source: Arc<dyn PolicySource>,
    word_source: Arc<dyn FilterWordSource>,
    dispatcher: Dispatcher,
}

impl SearchAggregator {
    /// Create an aggregator over its collaborators
    ///
    /// # Arguments
    /// * `registry` - Resolves authorized providers per user
    /// * `executor` - Runs one query against one provider
    /// * `policy_source` - Supplies filter policy inputs per user
    /// * `word_source` - Supplies the filter word list
    /// * `provider_timeout` - Upper bound for each provider query
    pub fn new(
        registry: Arc<dyn ProviderRegistry>,
        executor: Arc<dyn QueryExecutor>,
        policy_source: Arc<dyn PolicySource>,
        word_source: Arc<dyn FilterWordSource>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            policy_source,
            word_source,
            dispatcher: Dispatcher::new(executor, provider_timeout),
        }
    }

    /// Providers the user may query, in registry order
    pub async fn providers_for(
        &self,
        identity: &UserIdentity,
    ) -> Result<Vec<ProviderDescriptor>, RegistryError> {
        self.registry.resolve_providers(identity).await
    }

    /// Per-provider timeout
    pub fn provider_timeout(&self) -> Duration {
        self.dispatcher.provider_timeout()
    }

    /// Run one search, writing its events to `sink`
    ///
    /// Returns once every dispatched provider has settled (or immediately
    /// after the `error` event for a request-level failure). The caller
    /// disconnecting does not shorten the run.
    pub async fn run(&self, request: SearchRequest, sink: EventSink) -> AggregationSummary {
        let search_id = Uuid::new_v4();
        let started = Instant::now();

        info!(
            search_id = %search_id,
            user = %request.identity,
            query = %request.query,
            "Search accepted"
        );

        let (providers, policy) = match self.prepare(&request).await {
            Ok(prepared) => prepared,
            Err(rejection) => {
                let counts = LifecycleGuard::reject(search_id, sink, &rejection.to_string());
                return AggregationSummary {
                    search_id,
                    counts,
                    rejection: Some(rejection),
                    elapsed: started.elapsed(),
                };
            }
        };

        let ctx = Arc::new(SearchContext {
            search_id,
            query: request.query.clone(),
            policy,
        });

        let mut guard = LifecycleGuard::start(search_id, sink, &request.query, providers.len());
        let mut pending = self.dispatcher.dispatch(ctx, providers);

        while let Some(outcome) = pending.next().await {
            guard.settle(outcome);
        }

        let counts = guard.finish();
        let elapsed = started.elapsed();

        info!(
            search_id = %search_id,
            providers = counts.dispatched,
            results = counts.total_results,
            delivered = counts.terminal_delivered,
            elapsed_ms = elapsed.as_millis() as u64,
            "Search finished"
        );

        AggregationSummary {
            search_id,
            counts,
            rejection: None,
            elapsed,
        }
    }

    /// Run one search and gather every event into a single result
    pub async fn collect(&self, request: SearchRequest) -> Result<CollectedSearch, SearchRejection> {
        let query = request.query.clone();
        let (sink, mut rx) = EventSink::channel();

        let summary = self.run(request, sink).await;
        if let Some(rejection) = summary.rejection {
            return Err(rejection);
        }

        let mut collected = CollectedSearch {
            query,
            results: Vec::new(),
            failed_sources: Vec::new(),
            total_results: 0,
            settled_providers: 0,
        };

        while let Some(event) = rx.recv().await {
            match event {
                SearchEvent::ProviderResult { results, .. } => collected.results.extend(results),
                SearchEvent::ProviderError {
                    provider,
                    provider_name,
                    error,
                    ..
                } => collected.failed_sources.push(FailedSource {
                    provider,
                    provider_name,
                    error,
                }),
                SearchEvent::Complete {
                    total_results,
                    settled_providers,
                    ..
                } => {
                    collected.total_results = total_results;
                    collected.settled_providers = settled_providers;
                }
                SearchEvent::Start { .. } | SearchEvent::Error { .. } => {}
            }
        }

        Ok(collected)
    }

    /// Resolve providers and derive the filter policy snapshot
    async fn prepare(
        &self,
        request: &SearchRequest,
    ) -> Result<(Vec<ProviderDescriptor>, FilterPolicy), SearchRejection> {
        let providers = self.registry.resolve_providers(&request.identity).await?;

        let inputs = self.policy_source.policy_inputs(&request.identity).await?;
        let words = self.word_source.words();
        let policy = FilterPolicy::derive(&inputs, &words);

        info!(
            user = %request.identity,
            providers = providers.len(),
            filtered = policy.is_active(),
            "Resolved search plan"
        );

        Ok((providers, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_query_trimmed() {
        let identity = UserIdentity::new("alice").unwrap();
        let request = SearchRequest::new(identity, "  night train ").unwrap();
        assert_eq!(request.query(), "night train");
        assert_eq!(request.identity().username(), "alice");
    }

    #[test]
    fn test_blank_query_rejected() {
        let identity = UserIdentity::new("alice").unwrap();
        assert_eq!(
            SearchRequest::new(identity.clone(), "").unwrap_err(),
            RequestError::EmptyQuery
        );
        assert_eq!(
            SearchRequest::new(identity, " \t ").unwrap_err(),
            RequestError::EmptyQuery
        );
    }
}
