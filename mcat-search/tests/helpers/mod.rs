//! Test Helper Utilities
//!
//! In-memory collaborators for driving the aggregator without a network.

#![allow(dead_code)]

use async_trait::async_trait;
use mcat_common::{ProviderDescriptor, ResultRecord, UserRole};
use mcat_search::aggregator::{EventSink, SearchAggregator, SearchEvent, SearchRequest};
use mcat_search::filter::{
    FilterWordSource, PolicyError, PolicyInputs, PolicySource, StaticWordSource, TagPolicy,
};
use mcat_search::identity::UserIdentity;
use mcat_search::providers::{ProviderRegistry, QueryError, QueryExecutor, RegistryError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Registry returning the same providers for every user
pub struct StaticRegistry {
    pub providers: Vec<ProviderDescriptor>,
}

impl StaticRegistry {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            providers: keys.iter().map(|key| provider(key)).collect(),
        }
    }
}

#[async_trait]
impl ProviderRegistry for StaticRegistry {
    async fn resolve_providers(
        &self,
        _identity: &UserIdentity,
    ) -> Result<Vec<ProviderDescriptor>, RegistryError> {
        Ok(self.providers.clone())
    }
}

/// Registry that always fails
pub struct FailingRegistry;

#[async_trait]
impl ProviderRegistry for FailingRegistry {
    async fn resolve_providers(
        &self,
        identity: &UserIdentity,
    ) -> Result<Vec<ProviderDescriptor>, RegistryError> {
        Err(RegistryError::UnknownUser(identity.username().to_string()))
    }
}

/// Scripted behaviour for one provider
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return these records after an optional delay
    Records(Vec<ResultRecord>, Duration),
    /// Fail with a network error
    Fail(String),
    /// Never answer within any reasonable timeout
    Hang,
    /// Panic inside the query
    Panic,
}

/// Executor with per-provider scripted behaviour
#[derive(Default)]
pub struct MockExecutor {
    behaviors: HashMap<String, Behavior>,
    calls: AtomicUsize,
    finished: AtomicUsize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(key.to_string(), behavior);
        self
    }

    /// Number of queries started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of queries that ran to the end (successfully or not)
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn query(
        &self,
        provider: &ProviderDescriptor,
        _query: &str,
    ) -> Result<Vec<ResultRecord>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let behavior = self
            .behaviors
            .get(&provider.key)
            .cloned()
            .unwrap_or(Behavior::Records(Vec::new(), Duration::ZERO));

        let result = match behavior {
            Behavior::Records(records, delay) => {
                tokio::time::sleep(delay).await;
                Ok(records)
            }
            Behavior::Fail(reason) => Err(QueryError::Network(reason)),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            Behavior::Panic => panic!("provider {} exploded", provider.key),
        };

        self.finished.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// Policy source with fixed inputs
pub struct StaticPolicy {
    pub inputs: PolicyInputs,
}

impl StaticPolicy {
    /// Filtering enabled through a `restricted` tag
    pub fn filtered(role: UserRole) -> Self {
        let mut tag_policies = HashMap::new();
        tag_policies.insert(
            "restricted".to_string(),
            TagPolicy {
                content_filter: true,
            },
        );
        Self {
            inputs: PolicyInputs {
                global_enabled: true,
                role,
                tags: vec!["restricted".to_string()],
                tag_policies,
            },
        }
    }

    /// No filtering at all
    pub fn unfiltered() -> Self {
        Self {
            inputs: PolicyInputs {
                global_enabled: true,
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl PolicySource for StaticPolicy {
    async fn policy_inputs(&self, _identity: &UserIdentity) -> Result<PolicyInputs, PolicyError> {
        Ok(self.inputs.clone())
    }
}

/// Policy source that always fails
pub struct FailingPolicy;

#[async_trait]
impl PolicySource for FailingPolicy {
    async fn policy_inputs(&self, _identity: &UserIdentity) -> Result<PolicyInputs, PolicyError> {
        Err(PolicyError::Unavailable("store offline".to_string()))
    }
}

pub fn provider(key: &str) -> ProviderDescriptor {
    ProviderDescriptor::new(key, key.to_uppercase(), format!("http://{}.invalid/api", key))
}

pub fn record(id: &str, title: &str, category: &str) -> ResultRecord {
    ResultRecord {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        ..Default::default()
    }
}

pub fn words(list: &[&str]) -> Arc<dyn FilterWordSource> {
    Arc::new(StaticWordSource::new(list.iter().copied()))
}

pub fn aggregator(
    registry: impl ProviderRegistry + 'static,
    executor: Arc<MockExecutor>,
    policy: impl PolicySource + 'static,
    filter_words: &[&str],
    timeout: Duration,
) -> SearchAggregator {
    SearchAggregator::new(
        Arc::new(registry),
        executor,
        Arc::new(policy),
        words(filter_words),
        timeout,
    )
}

pub fn request(query: &str) -> SearchRequest {
    SearchRequest::new(UserIdentity::new("alice").unwrap(), query).unwrap()
}

/// Drain every event currently buffered (the sink must already be closed)
pub async fn drain(mut rx: UnboundedReceiver<SearchEvent>) -> Vec<SearchEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Run a search to completion and return its events
pub async fn run_to_events(aggregator: &SearchAggregator, query: &str) -> Vec<SearchEvent> {
    let (sink, rx) = EventSink::channel();
    aggregator.run(request(query), sink).await;
    drain(rx).await
}

pub fn kinds(events: &[SearchEvent]) -> Vec<&'static str> {
    events.iter().map(SearchEvent::kind).collect()
}
