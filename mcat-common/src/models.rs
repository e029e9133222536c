//! Catalog domain model
//!
//! Value types shared between the configuration layer and the search
//! aggregator. Everything here is read-only for the lifetime of a request.

use serde::{Deserialize, Serialize};

/// Role of a catalog user
///
/// `Owner` is the privileged role: it is exempt from content filtering and
/// cannot be banned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Site owner (single privileged account)
    Owner,
    /// Administrator
    Admin,
    /// Regular user
    #[default]
    User,
}

impl UserRole {
    /// Whether this role is the privileged owner role
    pub fn is_owner(self) -> bool {
        matches!(self, UserRole::Owner)
    }
}

/// Upstream content provider as seen by the aggregator
///
/// The `key` is stable and correlates every event emitted for this provider.
/// `api` and `detail` are connection parameters for the query executor and
/// are opaque to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Stable provider key
    pub key: String,
    /// Display name
    pub name: String,
    /// Search API base URL
    pub api: String,
    /// Optional detail page base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProviderDescriptor {
    /// Create a descriptor with no detail URL
    pub fn new(key: impl Into<String>, name: impl Into<String>, api: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            api: api.into(),
            detail: None,
        }
    }
}

/// One piece of content returned by one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResultRecord {
    /// Provider-local content id
    pub id: String,
    /// Content title
    pub title: String,
    /// Type/category label (e.g. "Movie", "Documentary")
    pub category: String,
    /// Release year, "unknown" when the provider has none
    pub year: String,
    /// Poster image URL
    #[serde(default)]
    pub poster: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Provider remarks (episode count, quality tag, ...)
    #[serde(default)]
    pub remarks: String,
    /// Playable episode URLs in provider order
    #[serde(default)]
    pub episodes: Vec<String>,
    /// Key of the provider that returned this record
    pub source: String,
    /// Display name of the provider that returned this record
    pub source_name: String,
}
