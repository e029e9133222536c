//! Requesting identity
//!
//! The identity is resolved by the authentication layer in front of this
//! service and arrives as a plain username. It is not re-validated here.

use serde::Serialize;
use std::fmt;

/// Opaque reference to the requesting user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserIdentity(String);

impl UserIdentity {
    /// Build an identity from a username; blank names are rejected
    pub fn new(username: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let trimmed = username.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Username as resolved upstream
    pub fn username(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
