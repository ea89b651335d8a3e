//! Site configuration module.
//!
//! Handles loading and validating `config.toml`. Every table falls back to
//! its defaults, so a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! site_url = "https://example.com"  # Origin for sitemap and canonical hrefs
//!
//! [hubs]
//! base_path = "/hubs/"              # Prefix of every hub path
//!
//! [products]
//! path_prefix = "/product/"         # Prefix of product pages
//!
//! [registry]
//! refresh_interval_secs = 300       # Older snapshots are reported as stale
//!
//! [processing]
//! max_processes = 4                 # Aggregation workers (omit for auto = CPU cores)
//! ```
//!
//! The eligibility threshold, per-type cap and recognized formula set are
//! policy, not configuration, and live in [`crate::types`] and [`crate::slug`].
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute origin, e.g. `https://dealer.example`.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Hub URL layout.
    pub hubs: HubsConfig,
    /// Product URL layout.
    pub products: ProductsConfig,
    /// Snapshot refresh expectations.
    pub registry: RegistryConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

fn default_site_url() -> String {
    "https://example.com".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            hubs: HubsConfig::default(),
            products: ProductsConfig::default(),
            registry: RegistryConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.site_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "site_url must be an absolute http(s) URL, got {:?}",
                    self.site_url
                )));
            }
        }
        if !is_slash_wrapped(&self.hubs.base_path) {
            return Err(ConfigError::Validation(
                "hubs.base_path must start and end with '/'".into(),
            ));
        }
        if !is_slash_wrapped(&self.products.path_prefix) {
            return Err(ConfigError::Validation(
                "products.path_prefix must start and end with '/'".into(),
            ));
        }
        let (hubs, products) = (&self.hubs.base_path, &self.products.path_prefix);
        if hubs.starts_with(products.as_str()) || products.starts_with(hubs.as_str()) {
            return Err(ConfigError::Validation(format!(
                "products.path_prefix {products:?} and hubs.base_path {hubs:?} must differ \
                 and neither may contain the other"
            )));
        }
        if self.registry.refresh_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "registry.refresh_interval_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// The parsed site origin. Only valid after [`SiteConfig::validate`].
    pub fn site_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.site_url)
            .map_err(|e| ConfigError::Validation(format!("site_url: {e}")))
    }
}

fn is_slash_wrapped(path: &str) -> bool {
    path.starts_with('/') && path.ends_with('/')
}

/// Hub URL layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubsConfig {
    /// Prefix of every hub path, with leading and trailing slash.
    pub base_path: String,
}

impl Default for HubsConfig {
    fn default() -> Self {
        Self {
            base_path: "/hubs/".to_string(),
        }
    }
}

/// Product URL layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductsConfig {
    /// Prefix of product pages; a product lives at `{path_prefix}{slug}/`.
    pub path_prefix: String,
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/product/".to_string(),
        }
    }
}

/// Snapshot refresh expectations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Expected seconds between refreshes. A snapshot older than this is
    /// still served but reported as stale.
    pub refresh_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
        }
    }
}

impl RegistryConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of aggregation worker threads.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

impl ProcessingConfig {
    /// Worker threads for the aggregation pass: `max_processes` clamped to
    /// the available cores, or all cores when unset.
    pub fn worker_threads(&self) -> usize {
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        match self.max_processes {
            Some(n) => n.clamp(1, cores),
            None => cores,
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load `config.toml` from `root`, or the defaults when there is none.
///
/// Every table is `#[serde(default)]`, so the file only needs the keys it
/// changes. The result is validated before it is returned.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root.join("config.toml");
    let config = if path.exists() {
        toml::from_str(&fs::read_to_string(&path)?)?
    } else {
        SiteConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Catalog Hubs Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Absolute origin used for sitemap <loc> and canonical <link> hrefs.
site_url = "https://example.com"

# ---------------------------------------------------------------------------
# Hub pages
# ---------------------------------------------------------------------------
[hubs]
# Prefix of every hub path. Must start and end with '/'.
# Hubs live at e.g. /hubs/category/dump-trucks/formula/6x4/in-stock/
base_path = "/hubs/"

# ---------------------------------------------------------------------------
# Product pages
# ---------------------------------------------------------------------------
[products]
# Prefix of product pages; a product lives at {path_prefix}{slug}/.
# Must start and end with '/'. Neither prefix may contain the other.
path_prefix = "/product/"

# ---------------------------------------------------------------------------
# Registry refresh
# ---------------------------------------------------------------------------
[registry]
# Expected seconds between snapshot rebuilds. An older snapshot keeps
# serving requests but is reported as stale.
refresh_interval_secs = 300

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel aggregation workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
