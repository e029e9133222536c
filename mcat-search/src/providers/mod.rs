//! Upstream provider collaborators
//!
//! Two seams sit between the aggregator and the outside world:
//! - [`ProviderRegistry`] returns the ordered providers a user may query
//! - [`QueryExecutor`] runs one query against one provider
//!
//! The aggregator only ever sees these traits; [`http::HttpQueryExecutor`]
//! and [`crate::catalog::ConfigCatalog`] are the production adapters.

pub mod http;

pub use http::HttpQueryExecutor;

use async_trait::async_trait;
use mcat_common::{ProviderDescriptor, ResultRecord};
use thiserror::Error;

use crate::identity::UserIdentity;

/// Provider registry errors (request-level)
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The identity is not a known user
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The user is banned from searching
    #[error("User is banned: {0}")]
    Banned(String),

    /// The registry backend failed
    #[error("Provider registry unavailable: {0}")]
    Unavailable(String),
}

/// Provider query errors (provider-level, never escalated)
#[derive(Debug, Error)]
pub enum QueryError {
    /// Network or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered with a non-success status
    #[error("Provider returned HTTP {0}")]
    Status(u16),

    /// Provider payload could not be understood
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// Descriptor carries unusable connection parameters
    #[error("Invalid provider configuration: {0}")]
    InvalidProvider(String),
}

/// Resolves which providers a user may query
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Ordered providers authorized for `identity`; may be empty
    async fn resolve_providers(
        &self,
        identity: &UserIdentity,
    ) -> Result<Vec<ProviderDescriptor>, RegistryError>;
}

/// Runs one query against one provider
///
/// Implementations may be slow or fail; callers bound every call with their
/// own timeout.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Query `provider` for `query`, returning normalized records
    async fn query(
        &self,
        provider: &ProviderDescriptor,
        query: &str,
    ) -> Result<Vec<ResultRecord>, QueryError>;
}
