//! Config-backed collaborators
//!
//! [`ConfigCatalog`] serves provider authorization, filter policy inputs and
//! the filter word list from the loaded TOML configuration.
//!
//! Provider authorization for a user:
//! 1. Unknown or banned users are rejected
//! 2. Disabled providers are never returned
//! 3. A non-empty per-user `enabled_sources` list wins
//! 4. Otherwise the union of the user's tags' `enabled_sources`, if any
//! 5. Otherwise every enabled provider
//!
//! Registry order is preserved in every case.

use async_trait::async_trait;
use mcat_common::config::{TomlConfig, UserConfig};
use mcat_common::ProviderDescriptor;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::filter::{
    FilterWordSource, PolicyError, PolicyInputs, PolicySource, StaticWordSource, TagPolicy,
};
use crate::identity::UserIdentity;
use crate::providers::{ProviderRegistry, RegistryError};

/// Catalog view over an immutable configuration snapshot
#[derive(Clone)]
pub struct ConfigCatalog {
    config: Arc<TomlConfig>,
    words: StaticWordSource,
}

impl ConfigCatalog {
    /// Wrap a loaded configuration
    pub fn new(config: TomlConfig) -> Self {
        let words = StaticWordSource::new(&config.content_filter.words);
        Self {
            config: Arc::new(config),
            words,
        }
    }

    fn user(&self, identity: &UserIdentity) -> Option<&UserConfig> {
        self.config.user(identity.username())
    }

    /// Provider keys the user is restricted to, `None` for unrestricted
    fn allowed_sources<'a>(&'a self, user: &'a UserConfig) -> Option<HashSet<&'a str>> {
        if let Some(sources) = user.enabled_sources.as_ref().filter(|s| !s.is_empty()) {
            return Some(sources.iter().map(String::as_str).collect());
        }

        let from_tags: HashSet<&str> = user
            .tags
            .iter()
            .filter_map(|tag| self.config.tag(tag))
            .flat_map(|tag| tag.enabled_sources.iter().map(String::as_str))
            .collect();

        if from_tags.is_empty() {
            None
        } else {
            Some(from_tags)
        }
    }
}

#[async_trait]
impl ProviderRegistry for ConfigCatalog {
    async fn resolve_providers(
        &self,
        identity: &UserIdentity,
    ) -> Result<Vec<ProviderDescriptor>, RegistryError> {
        let user = self
            .user(identity)
            .ok_or_else(|| RegistryError::UnknownUser(identity.to_string()))?;

        if user.banned && !user.role.is_owner() {
            return Err(RegistryError::Banned(identity.to_string()));
        }

        let allowed = self.allowed_sources(user);

        Ok(self
            .config
            .providers
            .iter()
            .filter(|p| !p.disabled)
            .filter(|p| allowed.as_ref().map_or(true, |a| a.contains(p.key.as_str())))
            .map(|p| p.descriptor())
            .collect())
    }
}

#[async_trait]
impl PolicySource for ConfigCatalog {
    async fn policy_inputs(&self, identity: &UserIdentity) -> Result<PolicyInputs, PolicyError> {
        let user = self
            .user(identity)
            .ok_or_else(|| PolicyError::UnknownUser(identity.to_string()))?;

        let tag_policies: HashMap<String, TagPolicy> = self
            .config
            .tags
            .iter()
            .map(|tag| {
                (
                    tag.name.clone(),
                    TagPolicy {
                        content_filter: tag.content_filter,
                    },
                )
            })
            .collect();

        Ok(PolicyInputs {
            global_enabled: self.config.content_filter.enabled,
            role: user.role,
            tags: user.tags.clone(),
            tag_policies,
        })
    }
}

impl FilterWordSource for ConfigCatalog {
    fn words(&self) -> Arc<[String]> {
        self.words.words()
    }
}
