//! Fan-Out Dispatcher
//!
//! Starts one independently spawned task per provider. Each task owns its
//! provider query, races it against its own timeout and filters the records
//! with the request's policy snapshot before handing back a single
//! [`ProviderOutcome`].
//!
//! The returned [`PendingSettlements`] yields outcomes in settlement order.
//! A task that panics or is aborted still yields exactly one outcome (a
//! failure), so every dispatched provider is accounted for once.

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use mcat_common::{ProviderDescriptor, ResultRecord};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::filter::FilterPolicy;
use crate::providers::QueryExecutor;

/// Request-scoped, read-only context handed to every provider task
#[derive(Debug)]
pub struct SearchContext {
    /// Correlation id
    pub search_id: Uuid,
    /// Query string
    pub query: String,
    /// Filter policy snapshot for the requesting user
    pub policy: FilterPolicy,
}

/// Final state of one provider query
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Query succeeded; records already filtered
    Results(Vec<ResultRecord>),
    /// Query failed
    Failed(String),
    /// Query exceeded its timeout
    TimedOut(Duration),
}

/// Outcome of one dispatched provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutcome {
    /// Provider key
    pub provider: String,
    /// Provider display name
    pub provider_name: String,
    /// How the query ended
    pub settlement: Settlement,
    /// Time from dispatch to settlement
    pub elapsed: Duration,
}

impl ProviderOutcome {
    /// Human-readable reason for failed settlements
    pub fn failure_reason(&self) -> Option<String> {
        match &self.settlement {
            Settlement::Results(_) => None,
            Settlement::Failed(reason) => Some(reason.clone()),
            Settlement::TimedOut(limit) => Some(format!("Timed out after {}", format_duration(*limit))),
        }
    }
}

/// Outcomes of in-flight provider queries, yielded as they settle
pub type PendingSettlements = FuturesUnordered<BoxFuture<'static, ProviderOutcome>>;

/// Issues one bounded query per provider
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn QueryExecutor>,
    provider_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher
    ///
    /// # Arguments
    /// * `executor` - Query executor shared by all provider tasks
    /// * `provider_timeout` - Upper bound for each provider query
    pub fn new(executor: Arc<dyn QueryExecutor>, provider_timeout: Duration) -> Self {
        Self {
            executor,
            provider_timeout,
        }
    }

    /// Configured per-provider timeout
    pub fn provider_timeout(&self) -> Duration {
        self.provider_timeout
    }

    /// Spawn one task per provider
    ///
    /// Tasks are independent: none waits on another, and a slow or failing
    /// provider never affects its siblings.
    pub fn dispatch(
        &self,
        ctx: Arc<SearchContext>,
        providers: Vec<ProviderDescriptor>,
    ) -> PendingSettlements {
        providers
            .into_iter()
            .map(|provider| self.spawn_provider(Arc::clone(&ctx), provider))
            .collect()
    }

    fn spawn_provider(
        &self,
        ctx: Arc<SearchContext>,
        provider: ProviderDescriptor,
    ) -> BoxFuture<'static, ProviderOutcome> {
        let executor = Arc::clone(&self.executor);
        let timeout = self.provider_timeout;
        let key = provider.key.clone();
        let name = provider.name.clone();
        let dispatched_at = Instant::now();

        debug!(search_id = %ctx.search_id, provider = %key, "Dispatching provider query");

        let handle = tokio::spawn(async move {
            let settlement =
                match tokio::time::timeout(timeout, executor.query(&provider, &ctx.query)).await {
                    Ok(Ok(records)) => {
                        let received = records.len();
                        let kept = ctx.policy.apply(records);
                        if kept.len() < received {
                            debug!(
                                search_id = %ctx.search_id,
                                provider = %provider.key,
                                suppressed = received - kept.len(),
                                "Content filter suppressed records"
                            );
                        }
                        Settlement::Results(kept)
                    }
                    Ok(Err(e)) => Settlement::Failed(e.to_string()),
                    Err(_) => Settlement::TimedOut(timeout),
                };

            ProviderOutcome {
                provider: provider.key,
                provider_name: provider.name,
                settlement,
                elapsed: dispatched_at.elapsed(),
            }
        });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let reason = if e.is_panic() {
                        "Provider query panicked".to_string()
                    } else {
                        "Provider query was cancelled".to_string()
                    };
                    warn!(provider = %key, error = %e, "Provider task did not complete");
                    ProviderOutcome {
                        provider: key,
                        provider_name: name,
                        settlement: Settlement::Failed(reason),
                        elapsed: dispatched_at.elapsed(),
                    }
                }
            }
        }
        .boxed()
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_millis() % 1000 == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
