//! Configuration loading
//!
//! Resolution order for every setting:
//! 1. Command-line argument or its environment variable (handled by the binary)
//! 2. TOML config file
//! 3. Compiled default
//!
//! A missing config file is not an error: the service logs a warning and
//! starts with defaults. A config file that exists but fails to parse is.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::store::WooCommerceConfig;
use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "GALLERY_CONFIG";

pub const DEFAULT_BIND: &str = "127.0.0.1:5780";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;

/// Which association store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    WooCommerce,
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "woocommerce" => Ok(Backend::WooCommerce),
            other => Err(Error::Config(format!("unknown backend: {}", other))),
        }
    }
}

/// Config file contents; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub bind: Option<String>,
    pub database_path: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub session_idle_secs: Option<u64>,
    pub woocommerce: Option<WooCommerceConfig>,
}

/// Values supplied on the command line (or via their env vars)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub database_path: Option<PathBuf>,
    pub backend: Option<String>,
    pub session_idle_secs: Option<u64>,
    pub woocommerce_url: Option<String>,
    pub woocommerce_key: Option<String>,
    pub woocommerce_secret: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryConfig {
    pub bind: SocketAddr,
    pub database_path: PathBuf,
    pub backend: Backend,
    pub session_idle_secs: u64,
    pub woocommerce: Option<WooCommerceConfig>,
}

impl GalleryConfig {
    /// Merge overrides over the file over compiled defaults, then validate
    pub fn resolve(file: Option<TomlConfig>, overrides: ConfigOverrides) -> Result<Self> {
        let file = file.unwrap_or_default();

        let bind_text = overrides
            .bind
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_text
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid bind address {:?}: {}", bind_text, e)))?;

        let backend = match overrides.backend {
            Some(text) => text.parse()?,
            None => file.backend.unwrap_or_default(),
        };

        let database_path = overrides
            .database_path
            .or(file.database_path)
            .unwrap_or_else(default_database_path);

        let session_idle_secs = overrides
            .session_idle_secs
            .or(file.session_idle_secs)
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);
        if session_idle_secs == 0 {
            return Err(Error::Config("session_idle_secs must be positive".to_string()));
        }

        let mut woocommerce = file.woocommerce;
        if overrides.woocommerce_url.is_some()
            || overrides.woocommerce_key.is_some()
            || overrides.woocommerce_secret.is_some()
        {
            let wc = woocommerce.get_or_insert_with(WooCommerceConfig::default);
            if let Some(url) = overrides.woocommerce_url {
                wc.base_url = url;
            }
            if let Some(key) = overrides.woocommerce_key {
                wc.consumer_key = key;
            }
            if let Some(secret) = overrides.woocommerce_secret {
                wc.consumer_secret = secret;
            }
        }

        if backend == Backend::WooCommerce
            && woocommerce.as_ref().map_or(true, |wc| wc.base_url.trim().is_empty())
        {
            return Err(Error::Config(
                "backend \"woocommerce\" requires woocommerce.base_url".to_string(),
            ));
        }

        Ok(Self {
            bind,
            database_path,
            backend,
            session_idle_secs,
            woocommerce,
        })
    }
}

/// Pick the config file: explicit path, then `GALLERY_CONFIG`, then the platform default
pub fn config_file_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|d| d.join("gallery").join("config.toml"))
}

/// Read a config file; `Ok(None)` when it does not exist
pub fn load_toml(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!("Config file not found: {} (using defaults)", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    info!("Loaded config file: {}", path.display());
    Ok(Some(config))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gallery"))
        .unwrap_or_else(|| PathBuf::from("./gallery_data"))
        .join("gallery.db")
}
