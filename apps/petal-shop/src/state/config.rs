//! # Shop Configuration
//!
//! Stores application configuration loaded at startup.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PETAL_DB_PATH=/srv/petal/petal.db                                  │
//! │     PETAL_SHOP_NAME="Corner Blooms"                                    │
//! │     PETAL_MAX_CONNECTIONS=8                                            │
//! │     PETAL_LOG=info,petal=trace                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/petal/petal.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.petal.shop/petal.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # petal.toml
//! [shop]
//! name = "Corner Blooms"
//! currency_symbol = "€"
//! currency_decimals = 2
//! default_actor = "workshop"
//!
//! [database]
//! path = "/srv/petal/petal.db"
//! max_connections = 5
//!
//! [logging]
//! filter = "info,petal=debug,sqlx=warn"
//! ```
//!
//! Read-only after startup, so no mutex.

use directories::ProjectDirs;
use petal_core::Money;
use petal_db::DbConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default tracing filter when neither `RUST_LOG` nor config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,petal=debug,sqlx=warn";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config directory available on this platform")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopSection {
    /// Shop name (shown in CLI headers and notifications)
    pub name: String,

    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Actor recorded on ledger entries when the caller gives none.
    pub default_actor: Option<String>,
}

impl Default for ShopSection {
    fn default() -> Self {
        ShopSection {
            name: "Petal Dev Shop".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            default_actor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// `None` means the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

// =============================================================================
// ShopConfig
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub shop: ShopSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
}

impl ShopConfig {
    /// Loads configuration.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`petal.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading shop config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load shop config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Shop config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.shop.name.trim().is_empty() {
            return Err(ConfigError::Invalid("shop.name must not be empty".into()));
        }
        if self.shop.currency_decimals > 4 {
            return Err(ConfigError::Invalid(format!(
                "shop.currency_decimals must be at most 4, got {}",
                self.shop.currency_decimals
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `PETAL_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("PETAL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup("PETAL_SHOP_NAME") {
            self.shop.name = name;
        }

        if let Some(max) = lookup("PETAL_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric PETAL_MAX_CONNECTIONS"),
            }
        }

        if let Some(filter) = lookup("PETAL_LOG") {
            self.logging.filter = filter;
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "petal", "shop")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("petal.toml"))
    }

    /// Database file path: configured, or `petal.db` in the platform data
    /// directory (created if missing).
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        let dirs = Self::project_dirs().ok_or(ConfigError::NoConfigDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("petal.db"))
    }

    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?).max_connections(self.database.max_connections))
    }

    /// Formats money with the configured currency.
    pub fn format_money(&self, amount: Money) -> String {
        amount.format_with(&self.shop.currency_symbol, self.shop.currency_decimals)
    }
}
