//! HTTP API handlers for mcat-search

pub mod health;
pub mod identity;
pub mod search;

pub use health::health_routes;
pub use identity::{RequestIdentity, USER_HEADER};
pub use search::{search_collect, search_resources, search_stream};
