//! Tests for TOML config loading and config file resolution
//!
//! Covers graceful degradation (missing file → defaults), parse failures,
//! and the explicit path → environment → user config dir priority order.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate SOUNDRAISER_CONFIG are marked with #[serial].

use serial_test::serial;
use soundraiser_common::config::{
    load_toml_config, resolve_config_path, ConfigOverrides, ServiceConfig, CONFIG_ENV_VAR,
};
use soundraiser_common::Error;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_toml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

#[test]
fn test_missing_file_uses_defaults() {
    let path = PathBuf::from("/nonexistent/soundraiser/preview.toml");
    let config = load_toml_config(Some(&path)).expect("missing file must not fail");
    assert!(config.backend_url.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_no_path_uses_defaults() {
    let config = load_toml_config(None).expect("no path must not fail");
    assert!(config.site_origin.is_none());
}

#[test]
fn test_full_file_parsed() {
    let file = write_toml(
        r#"
backend_url = "sqlite://links.db"
site_origin = "https://example.test"
site_name = "Example"
port = 8080
cache_ttl_secs = 600
stale_while_revalidate_secs = 1200
redirect_delay_ms = 250
default_image = "https://cdn.example.test/card.png"
record_views = false
sitemap_page_size = 500

[logging]
level = "debug"
"#,
    );

    let toml = load_toml_config(Some(file.path())).expect("parse");
    let config = ServiceConfig::resolve(ConfigOverrides::default(), toml).expect("resolve");

    assert_eq!(config.origin_str(), "https://example.test");
    assert_eq!(config.site_name, "Example");
    assert_eq!(config.port, 8080);
    assert_eq!(config.cache_ttl, Duration::from_secs(600));
    assert_eq!(config.stale_while_revalidate, Duration::from_secs(1200));
    assert_eq!(config.redirect_delay, Duration::from_millis(250));
    assert_eq!(config.default_image, "https://cdn.example.test/card.png");
    assert!(!config.record_views);
    assert_eq!(config.sitemap_page_size, 500);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let file = write_toml("port = \"not a number\"");
    let err = load_toml_config(Some(file.path())).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_explicit_path_beats_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");
    let explicit = PathBuf::from("/tmp/explicit.toml");

    let resolved = resolve_config_path(Some(&explicit));
    assert_eq!(resolved, Some(explicit));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_path() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_var_ignored() {
    env::set_var(CONFIG_ENV_VAR, "  ");

    let resolved = resolve_config_path(None);
    assert_ne!(resolved, Some(PathBuf::from("  ")));

    env::remove_var(CONFIG_ENV_VAR);
}
