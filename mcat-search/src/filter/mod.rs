//! Content Filter Pipeline
//!
//! Decides, per requesting user and per result record, whether a record
//! must be suppressed.
//!
//! # Policy derivation
//! Evaluated once per request, before any provider is dispatched:
//! 1. Global switch off → inactive
//! 2. Requesting user is the owner → inactive (owners are always exempt)
//! 3. Any of the user's tags explicitly enables filtering → active
//! 4. Otherwise (including no tags at all) → inactive
//!
//! Filtering is opt-in at the tag level. The short-circuit order above is
//! part of the contract.
//!
//! # Matching rule
//! A record is suppressed when any filter word occurs, case-insensitively,
//! as a substring of its title or of its category label. Nothing more.

pub mod words;

pub use words::{normalize_words, FilterWordSource, StaticWordSource};

use async_trait::async_trait;
use mcat_common::{ResultRecord, UserRole};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::identity::UserIdentity;

/// Policy source errors
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The identity is not known to the policy store
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The policy store could not be read
    #[error("Policy store unavailable: {0}")]
    Unavailable(String),
}

/// Filter-relevant policy attached to one tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagPolicy {
    /// Members of this tag get content filtering
    pub content_filter: bool,
}

/// Everything the policy derivation depends on
///
/// Derivation is a pure function of this value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyInputs {
    /// Global filter switch
    pub global_enabled: bool,
    /// Role of the requesting user
    pub role: UserRole,
    /// Tags the requesting user belongs to
    pub tags: Vec<String>,
    /// Tag name → policy
    pub tag_policies: HashMap<String, TagPolicy>,
}

/// Resolves policy inputs for a user
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Collect global switch, role, tags and tag policies for `identity`
    async fn policy_inputs(&self, identity: &UserIdentity) -> Result<PolicyInputs, PolicyError>;
}

/// Decide whether filtering is active for the given inputs
pub fn derive_filter_active(inputs: &PolicyInputs) -> bool {
    if !inputs.global_enabled {
        return false;
    }

    if inputs.role.is_owner() {
        return false;
    }

    inputs.tags.iter().any(|tag| {
        inputs
            .tag_policies
            .get(tag)
            .is_some_and(|policy| policy.content_filter)
    })
}

/// Per-request filter policy snapshot
///
/// Computed once per request and shared read-only with every provider task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    active: bool,
    /// Lowercased filter words; empty when inactive
    words: Arc<[String]>,
}

impl FilterPolicy {
    /// A policy that never suppresses anything
    pub fn inactive() -> Self {
        Self {
            active: false,
            words: Arc::from(Vec::new()),
        }
    }

    /// Build a snapshot from policy inputs and the filter word list
    pub fn derive(inputs: &PolicyInputs, words: &[String]) -> Self {
        if derive_filter_active(inputs) {
            Self::active(words)
        } else {
            Self::inactive()
        }
    }

    /// An active policy over the given words
    pub fn active(words: &[String]) -> Self {
        let words: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        Self {
            active: true,
            words: words.into(),
        }
    }

    /// Whether filtering applies to this request
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether `record` must be suppressed under this policy
    pub fn suppresses(&self, record: &ResultRecord) -> bool {
        self.active && record_matches(record, &self.words)
    }

    /// Drop suppressed records; identity when the policy is inactive
    pub fn apply(&self, records: Vec<ResultRecord>) -> Vec<ResultRecord> {
        if !self.active {
            return records;
        }
        records
            .into_iter()
            .filter(|record| !self.suppresses(record))
            .collect()
    }
}

/// Matching rule: any lowercased word is a substring of the lowercased
/// title or category
fn record_matches(record: &ResultRecord, lowercase_words: &[String]) -> bool {
    if lowercase_words.is_empty() {
        return false;
    }
    let title = record.title.to_lowercase();
    let category = record.category.to_lowercase();
    lowercase_words
        .iter()
        .any(|word| title.contains(word.as_str()) || category.contains(word.as_str()))
}
