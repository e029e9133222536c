//! Configuration loading and config file resolution
//!
//! All catalog services read one TOML file. Resolution follows this
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MCAT_CONFIG`)
//! 3. Per-user config file (`~/.config/mcat/config.toml` on Linux)
//! 4. System-wide config file (`/etc/mcat/config.toml`, Linux only)
//! 5. Built-in defaults (no file)
//!
//! A missing config file is never fatal: the service logs a warning and
//! starts with defaults. A config file that exists but does not parse or
//! validate is an error.

use crate::models::{ProviderDescriptor, UserRole};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MCAT_CONFIG";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Search aggregation tuning
    #[serde(default)]
    pub search: SearchSettings,

    /// Global content filter switch and word list
    #[serde(default)]
    pub content_filter: ContentFilterConfig,

    /// Upstream providers, in registry order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Known users
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// User groups (tags) and their policies
    #[serde(default)]
    pub tags: Vec<TagConfig>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Search aggregation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Upper bound for one provider's whole query, in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Maximum result pages fetched from one provider
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Timeout for a single HTTP request to a provider, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl SearchSettings {
    /// Per-provider timeout as a `Duration`
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Per-request HTTP timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_provider_timeout_secs(),
            max_pages: default_max_pages(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Global content filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFilterConfig {
    /// Global filter switch
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Words matched (case-insensitively) against titles and categories
    #[serde(default)]
    pub words: Vec<String>,
}

impl Default for ContentFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            words: Vec::new(),
        }
    }
}

/// One upstream provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable key
    pub key: String,

    /// Display name
    pub name: String,

    /// Search API base URL
    pub api: String,

    /// Optional detail page base URL
    #[serde(default)]
    pub detail: Option<String>,

    /// Disabled providers are never queried
    #[serde(default)]
    pub disabled: bool,
}

impl ProviderConfig {
    /// Descriptor handed to the aggregator
    pub fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            key: self.key.clone(),
            name: self.name.clone(),
            api: self.api.clone(),
            detail: self.detail.clone(),
        }
    }
}

/// One known user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Login name (matches the identity resolved by the auth layer)
    pub username: String,

    /// Role
    #[serde(default)]
    pub role: UserRole,

    /// Banned users may not search
    #[serde(default)]
    pub banned: bool,

    /// Group memberships
    #[serde(default)]
    pub tags: Vec<String>,

    /// Per-user provider allow-list (overrides tag allow-lists when non-empty)
    #[serde(default)]
    pub enabled_sources: Option<Vec<String>>,
}

/// One user group and its policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    /// Tag name
    pub name: String,

    /// Providers members of this tag may query
    #[serde(default)]
    pub enabled_sources: Vec<String>,

    /// Whether this tag turns content filtering on for its members
    #[serde(default)]
    pub content_filter: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    20
}

fn default_max_pages() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// Hard errors: empty or duplicate provider keys, empty or duplicate
    /// usernames (compared trimmed), zero timeouts, zero page limit.
    /// Dangling tag/provider references only warn.
    pub fn validate(&self) -> Result<()> {
        if self.search.provider_timeout_secs == 0 {
            return Err(Error::Config(
                "search.provider_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.search.request_timeout_secs == 0 {
            return Err(Error::Config(
                "search.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.search.max_pages == 0 {
            return Err(Error::Config(
                "search.max_pages must be greater than 0".to_string(),
            ));
        }

        let mut keys = HashSet::new();
        for provider in &self.providers {
            if provider.key.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Provider '{}' has an empty key",
                    provider.name
                )));
            }
            if !keys.insert(provider.key.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate provider key: {}",
                    provider.key
                )));
            }
        }

        let mut usernames = HashSet::new();
        for user in &self.users {
            let username = user.username.trim();
            if username.is_empty() {
                return Err(Error::Config("User with an empty username".to_string()));
            }
            if !usernames.insert(username) {
                return Err(Error::Config(format!("Duplicate username: {}", username)));
            }
        }

        let tag_names: HashSet<&str> = self.tags.iter().map(|t| t.name.as_str()).collect();
        for user in &self.users {
            for tag in &user.tags {
                if !tag_names.contains(tag.as_str()) {
                    warn!(user = %user.username, tag = %tag, "User references unknown tag");
                }
            }
            for source in user.enabled_sources.iter().flatten() {
                if !keys.contains(source.as_str()) {
                    warn!(user = %user.username, provider = %source, "User references unknown provider");
                }
            }
        }
        for tag in &self.tags {
            for source in &tag.enabled_sources {
                if !keys.contains(source.as_str()) {
                    warn!(tag = %tag.name, provider = %source, "Tag references unknown provider");
                }
            }
        }

        Ok(())
    }

    /// Look up a user by name; surrounding whitespace is ignored on both sides
    pub fn user(&self, username: &str) -> Option<&UserConfig> {
        let username = username.trim();
        self.users.iter().find(|u| u.username.trim() == username)
    }

    /// Look up a tag by name
    pub fn tag(&self, name: &str) -> Option<&TagConfig> {
        self.tags.iter().find(|t| t.name == name)
    }
}

/// Resolve the config file path
///
/// Returns `None` when no candidate exists; callers then run on defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3/4: Platform config locations
    default_config_locations()
        .into_iter()
        .find(|candidate| candidate.exists())
}

/// Candidate config file locations for the current platform, in priority order
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("mcat").join("config.toml"));
    }

    if cfg!(target_os = "linux") {
        locations.push(PathBuf::from("/etc/mcat/config.toml"));
    }

    locations
}

/// Load configuration from an optional path
///
/// `None` yields defaults with a warning. An explicit path that does not
/// exist also yields defaults with a warning; an unreadable or invalid file
/// is an error.
pub fn load_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No config file found, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file not found: {}, using built-in defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = TomlConfig::from_toml_str(&content)?;
    info!(
        "Loaded config from {} ({} providers, {} users, {} tags)",
        path.display(),
        config.providers.len(),
        config.users.len(),
        config.tags.len()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.server.port, 5780);
        assert_eq!(config.search.provider_timeout(), Duration::from_secs(20));
        assert_eq!(config.search.max_pages, 5);
        assert!(config.content_filter.enabled);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.search.request_timeout_secs, 10);
    }

    #[test]
    fn test_zero_page_limit_rejected() {
        let err = TomlConfig::from_toml_str("[search]\nmax_pages = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
