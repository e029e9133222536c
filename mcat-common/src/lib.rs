//! # Media Catalog Common Library
//!
//! Shared code for the media catalog services including:
//! - Catalog domain model (providers, result records, user roles)
//! - TOML configuration loading and config file resolution
//! - Error types
//! - Streaming (SSE) response helpers

pub mod config;
pub mod error;
pub mod models;
pub mod sse;

pub use error::{Error, Result};
pub use models::{ProviderDescriptor, ResultRecord, UserRole};
