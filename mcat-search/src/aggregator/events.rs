//! Search stream event types
//!
//! Every event is serialized as one JSON object with a `type` discriminator
//! and framed as a single line on the stream.
//!
//! Ordering on the wire:
//! - `start` is always first
//! - `provider_result` / `provider_error` follow in settlement order, one per
//!   dispatched provider
//! - `complete` is always last, sent once every provider has settled
//! - `error` replaces the whole stream when the request fails before dispatch

use chrono::{DateTime, Utc};
use mcat_common::ResultRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One event on a search stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    /// Search accepted and providers dispatched
    Start {
        /// Correlation id of this search
        search_id: Uuid,
        /// Query as submitted
        query: String,
        /// Number of providers dispatched
        total_providers: usize,
        /// When the search started
        timestamp: DateTime<Utc>,
    },

    /// One provider finished without error
    ProviderResult {
        /// Provider key
        provider: String,
        /// Provider display name
        provider_name: String,
        /// Records that survived content filtering (possibly empty)
        results: Vec<ResultRecord>,
        /// When the provider settled
        timestamp: DateTime<Utc>,
    },

    /// One provider failed or timed out
    ProviderError {
        /// Provider key
        provider: String,
        /// Provider display name
        provider_name: String,
        /// Human-readable reason
        error: String,
        /// When the provider settled
        timestamp: DateTime<Utc>,
    },

    /// All providers settled
    Complete {
        /// Records delivered across all `provider_result` events
        total_results: usize,
        /// Providers that settled (equals `total_providers`)
        settled_providers: usize,
        /// When the search completed
        timestamp: DateTime<Utc>,
    },

    /// Request-level failure before any provider was dispatched
    Error {
        /// Human-readable reason
        error: String,
        /// When the failure was detected
        timestamp: DateTime<Utc>,
    },
}

impl SearchEvent {
    /// Wire name of this event's type
    pub fn kind(&self) -> &'static str {
        match self {
            SearchEvent::Start { .. } => "start",
            SearchEvent::ProviderResult { .. } => "provider_result",
            SearchEvent::ProviderError { .. } => "provider_error",
            SearchEvent::Complete { .. } => "complete",
            SearchEvent::Error { .. } => "error",
        }
    }

    /// Provider key for provider-scoped events
    pub fn provider(&self) -> Option<&str> {
        match self {
            SearchEvent::ProviderResult { provider, .. }
            | SearchEvent::ProviderError { provider, .. } => Some(provider),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_discriminator() {
        let event = SearchEvent::ProviderError {
            provider: "beta".to_string(),
            provider_name: "Beta".to_string(),
            error: "timed out".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "provider_error");
        assert_eq!(json["provider"], "beta");
        assert_eq!(json["error"], "timed out");
        assert_eq!(event.kind(), "provider_error");
        assert_eq!(event.provider(), Some("beta"));
    }

    #[test]
    fn test_complete_serializes_counts() {
        let event = SearchEvent::Complete {
            total_results: 4,
            settled_providers: 3,
            timestamp: Utc::now(),
        };

        let line = serde_json::to_string(&event).unwrap();
        assert!(!line.contains('\n'));

        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["total_results"], 4);
        assert_eq!(json["settled_providers"], 3);
        assert_eq!(event.provider(), None);
    }
}
