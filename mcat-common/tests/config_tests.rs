//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests cover:
//! - Config path priority order (CLI → environment → platform locations)
//! - Missing config files fall back to defaults without failing
//! - Full TOML documents parse into providers, users and tags
//! - Validation rejects duplicate or empty provider keys and usernames
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate MCAT_CONFIG are marked with #[serial].

use mcat_common::config::{load_config, resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use mcat_common::{Error, UserRole};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

const FULL_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 8080

[logging]
level = "debug"

[search]
provider_timeout_secs = 15
max_pages = 3

[content_filter]
enabled = true
words = ["forbidden", "banned-word"]

[[providers]]
key = "alpha"
name = "Alpha Source"
api = "https://alpha.example/api.php/provide/vod"

[[providers]]
key = "beta"
name = "Beta Source"
api = "https://beta.example/api"
detail = "https://beta.example"
disabled = true

[[users]]
username = "root"
role = "owner"

[[users]]
username = "kid"
tags = ["family"]
enabled_sources = ["alpha"]

[[tags]]
name = "family"
enabled_sources = ["alpha"]
content_filter = true
"#;

fn write_temp_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Should create temp file");
    file.write_all(content.as_bytes()).expect("Should write config");
    file
}

#[test]
fn test_full_config_parses() {
    let config = TomlConfig::from_toml_str(FULL_CONFIG).unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.search.provider_timeout_secs, 15);
    assert_eq!(config.search.max_pages, 3);
    // Unspecified field keeps its default
    assert_eq!(config.search.request_timeout_secs, 10);

    assert_eq!(config.content_filter.words.len(), 2);
    assert_eq!(config.providers.len(), 2);
    assert!(config.providers[1].disabled);
    assert_eq!(config.providers[1].detail.as_deref(), Some("https://beta.example"));

    let root = config.user("root").unwrap();
    assert_eq!(root.role, UserRole::Owner);

    let kid = config.user("kid").unwrap();
    assert_eq!(kid.role, UserRole::User);
    assert_eq!(kid.tags, vec!["family".to_string()]);
    assert!(config.tag("family").unwrap().content_filter);
}

#[test]
fn test_duplicate_provider_key_rejected() {
    let content = r#"
[[providers]]
key = "alpha"
name = "One"
api = "https://one.example"

[[providers]]
key = "alpha"
name = "Two"
api = "https://two.example"
"#;

    let err = TomlConfig::from_toml_str(content).unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("Duplicate provider key")));
}

#[test]
fn test_empty_provider_key_rejected() {
    let content = r#"
[[providers]]
key = "  "
name = "Blank"
api = "https://blank.example"
"#;

    assert!(TomlConfig::from_toml_str(content).is_err());
}

#[test]
fn test_zero_provider_timeout_rejected() {
    let err = TomlConfig::from_toml_str("[search]\nprovider_timeout_secs = 0\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_unknown_tag_reference_only_warns() {
    let content = r#"
[[users]]
username = "someone"
tags = ["does-not-exist"]
"#;

    assert!(TomlConfig::from_toml_str(content).is_ok());
}

#[test]
fn test_username_lookup_ignores_surrounding_whitespace() {
    let content = r#"
[[users]]
username = " alice "
role = "admin"
"#;

    let config = TomlConfig::from_toml_str(content).unwrap();
    assert_eq!(config.user("alice").unwrap().role, UserRole::Admin);
    assert_eq!(config.user("  alice").unwrap().role, UserRole::Admin);
    assert!(config.user("bob").is_none());
}

#[test]
fn test_duplicate_username_rejected() {
    let content = r#"
[[users]]
username = "alice"

[[users]]
username = "alice "
banned = true
"#;

    let err = TomlConfig::from_toml_str(content).unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("Duplicate username: alice")));
}

#[test]
fn test_blank_username_rejected() {
    let content = r#"
[[users]]
username = "   "
"#;

    let err = TomlConfig::from_toml_str(content).unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("empty username")));
}

#[test]
fn test_invalid_toml_is_error() {
    let err = TomlConfig::from_toml_str("[server\nport = ").unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("Parse TOML failed")));
}

#[test]
fn test_load_config_without_path_uses_defaults() {
    let config = load_config(None).unwrap();
    assert_eq!(config.server.port, 5780);
    assert!(config.providers.is_empty());
}

#[test]
fn test_load_config_missing_file_uses_defaults() {
    let config = load_config(Some(Path::new("/nonexistent/mcat/config.toml"))).unwrap();
    assert_eq!(config.search.provider_timeout_secs, 20);
}

#[test]
fn test_load_config_from_file() {
    let file = write_temp_config(FULL_CONFIG);
    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.providers.len(), 2);
    assert_eq!(config.users.len(), 2);
}

#[test]
fn test_load_config_invalid_file_is_error() {
    let file = write_temp_config("[search]\nmax_pages = 0\n");
    assert!(load_config(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_resolve_cli_arg_has_priority() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/mcat-from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/mcat-from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/mcat-from-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolve_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/mcat-from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/mcat-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolve_blank_env_var_ignored() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    let resolved = resolve_config_path(None);
    assert_ne!(resolved, Some(PathBuf::from("   ")));

    env::remove_var(CONFIG_ENV_VAR);
}
