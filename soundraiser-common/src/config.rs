//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (merged into the command line by clap)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service logs a warning and
//! continues with defaults. Missing *required* settings (backend URL and
//! credential, site origin) are deployment errors and abort startup.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV_VAR: &str = "SOUNDRAISER_CONFIG";

/// Sitemap protocol limit on URLs per file
pub const MAX_SITEMAP_URLS: u64 = 50_000;

/// Bootstrap configuration as written in the TOML file
///
/// Every field is optional; absent fields fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Backend base URL: `https://<project>.supabase.co` or `sqlite://path`
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Backend credential (anon/service key) for HTTP backends
    #[serde(default)]
    pub backend_key: Option<String>,

    /// Public site origin used to build absolute URLs
    #[serde(default)]
    pub site_origin: Option<String>,

    #[serde(default)]
    pub site_name: Option<String>,

    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Response cache time-to-live in seconds
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,

    #[serde(default)]
    pub stale_while_revalidate_secs: Option<u64>,

    /// Delay before the browser variant navigates to the interactive page
    #[serde(default)]
    pub redirect_delay_ms: Option<u64>,

    /// Fallback artwork, absolute or site-relative
    #[serde(default)]
    pub default_image: Option<String>,

    #[serde(default)]
    pub record_views: Option<bool>,

    #[serde(default)]
    pub sitemap_page_size: Option<u64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults
pub mod defaults {
    pub const SITE_NAME: &str = "Soundraiser";
    pub const BIND_ADDRESS: &str = "0.0.0.0";
    pub const PORT: u16 = 5780;
    pub const CACHE_TTL_SECS: u64 = 3600;
    pub const STALE_WHILE_REVALIDATE_SECS: u64 = 86_400;
    pub const REDIRECT_DELAY_MS: u64 = 500;
    pub const DEFAULT_IMAGE: &str = "/og-image.png";
    pub const SITEMAP_PAGE_SIZE: u64 = 1000;
}

/// Command-line (and environment) overrides, highest priority
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub site_origin: Option<String>,
    pub site_name: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

/// Kind of data backend named by `backend_url`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Supabase / PostgREST over HTTP
    Rest,
    /// Local SQLite mirror
    Sqlite,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub backend_url: String,
    pub backend_kind: BackendKind,
    pub backend_key: Option<String>,
    pub site_origin: Url,
    pub site_name: String,
    pub bind_address: String,
    pub port: u16,
    pub cache_ttl: Duration,
    pub stale_while_revalidate: Duration,
    pub redirect_delay: Duration,
    pub default_image: String,
    pub record_views: bool,
    pub sitemap_page_size: u64,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge overrides over the TOML file over compiled defaults, then validate
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> Result<Self> {
        let backend_url = first_non_blank(overrides.backend_url, toml.backend_url)
            .ok_or_else(|| {
                Error::Config(
                    "Backend URL not configured. Set --backend-url, SUPABASE_URL, \
                     or backend_url in the TOML config"
                        .to_string(),
                )
            })?;
        let backend_kind = backend_kind(&backend_url)?;

        let backend_key = first_non_blank(overrides.backend_key, toml.backend_key);
        if backend_kind == BackendKind::Rest && backend_key.is_none() {
            return Err(Error::Config(
                "Backend key not configured. Set --backend-key, SUPABASE_ANON_KEY, \
                 or backend_key in the TOML config"
                    .to_string(),
            ));
        }

        let origin_raw = first_non_blank(overrides.site_origin, toml.site_origin).ok_or_else(|| {
            Error::Config(
                "Site origin not configured. Set --site-origin, SITE_URL, \
                 or site_origin in the TOML config"
                    .to_string(),
            )
        })?;
        let site_origin = parse_origin(&origin_raw)?;

        let cache_ttl_secs = toml.cache_ttl_secs.unwrap_or(defaults::CACHE_TTL_SECS);
        if cache_ttl_secs == 0 {
            return Err(Error::Config("cache_ttl_secs must be greater than 0".to_string()));
        }

        let requested_page_size = toml
            .sitemap_page_size
            .unwrap_or(defaults::SITEMAP_PAGE_SIZE);
        let sitemap_page_size = requested_page_size.clamp(1, MAX_SITEMAP_URLS);
        if sitemap_page_size != requested_page_size {
            warn!(
                "sitemap_page_size {} out of range, using {}",
                requested_page_size, sitemap_page_size
            );
        }

        Ok(Self {
            backend_url,
            backend_kind,
            backend_key,
            site_origin,
            site_name: first_non_blank(overrides.site_name, toml.site_name)
                .unwrap_or_else(|| defaults::SITE_NAME.to_string()),
            bind_address: first_non_blank(overrides.bind_address, toml.bind_address)
                .unwrap_or_else(|| defaults::BIND_ADDRESS.to_string()),
            port: overrides.port.or(toml.port).unwrap_or(defaults::PORT),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            stale_while_revalidate: Duration::from_secs(
                toml.stale_while_revalidate_secs
                    .unwrap_or(defaults::STALE_WHILE_REVALIDATE_SECS),
            ),
            redirect_delay: Duration::from_millis(
                toml.redirect_delay_ms.unwrap_or(defaults::REDIRECT_DELAY_MS),
            ),
            default_image: first_non_blank(None, toml.default_image)
                .unwrap_or_else(|| defaults::DEFAULT_IMAGE.to_string()),
            record_views: toml.record_views.unwrap_or(true),
            sitemap_page_size,
            log_level: toml.logging.level,
        })
    }

    /// Origin without trailing slash, e.g. `https://soundraiser.io`
    pub fn origin_str(&self) -> &str {
        self.site_origin.as_str().trim_end_matches('/')
    }

    /// `host:port` to bind the HTTP listener on
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn first_non_blank(primary: Option<String>, secondary: Option<String>) -> Option<String> {
    primary
        .filter(|s| !s.trim().is_empty())
        .or_else(|| secondary.filter(|s| !s.trim().is_empty()))
        .map(|s| s.trim().to_string())
}

fn backend_kind(url: &str) -> Result<BackendKind> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(BackendKind::Rest)
    } else if url.starts_with("sqlite:") {
        Ok(BackendKind::Sqlite)
    } else {
        Err(Error::Config(format!(
            "Unsupported backend URL scheme: {} (expected http(s):// or sqlite:)",
            url
        )))
    }
}

fn parse_origin(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("Invalid site origin {:?}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::Config(format!(
            "Site origin must be an absolute http(s) URL: {}",
            raw
        )));
    }
    Ok(url)
}

/// Locate the TOML config file
///
/// Priority: explicit path → `SOUNDRAISER_CONFIG` → user config dir
/// (`~/.config/soundraiser/preview.toml` on Linux) if that file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("soundraiser").join("preview.toml"))
        .filter(|p| p.exists())
}

/// Load the TOML config file, degrading to defaults when it does not exist
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using defaults and command-line settings");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using defaults and command-line settings",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config file {}", path.display());
    Ok(config)
}
