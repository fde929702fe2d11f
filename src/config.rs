//! Application configuration
//!
//! Loaded from a TOML file (default: `~/.config/vistamar-booking/config.toml`,
//! overridable with `VISTAMAR_CONFIG` or `--config`). Every section has
//! serde defaults so a partial file — or no file at all — still yields a
//! runnable configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default path of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vistamar-booking")
        .join("config.toml")
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub provider: ProviderConfig,
    pub booking: BookingConfig,
    pub sweeper: SweeperConfig,
    pub payouts: PayoutConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let cfg: AppConfig = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(cfg)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ── Sections ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// REST API listen host
    pub api_host: String,
    /// REST API listen port
    pub api_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SeaORM connection URL. SQLite by default; switch to PostgreSQL by
    /// pointing this at a `postgres://` URL and enabling the driver feature.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://vistamar.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Output format: "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Payment provider (Stripe-compatible) API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Platform secret API key. Never logged.
    pub secret_key: String,
    /// Webhook endpoint signing secret (`whsec_...`).
    pub webhook_secret: String,
    /// API base URL; override in tests / for a provider emulator.
    pub api_base: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum accepted age of a signed webhook, in seconds.
    pub webhook_tolerance_secs: i64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            api_base: "https://api.stripe.com/v1".to_string(),
            timeout_ms: 15_000,
            webhook_tolerance_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// How long a hold stays valid before its expiry stamp, in seconds.
    pub hold_ttl_secs: i64,
    /// Prefix for generated booking codes.
    pub code_prefix: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            hold_ttl_secs: 420,
            code_prefix: "VB".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// How often the sweeper wakes up, in seconds.
    pub interval_secs: u64,
    /// Holds older than this are demoted to abandoned, in seconds.
    pub max_age_secs: i64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            max_age_secs: 420, // 7 minutes
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    /// Canonical display currency for aggregated balances (lowercase ISO).
    pub primary_currency: String,
    /// Static conversion rates into the primary currency, keyed by
    /// lowercase currency code. Used for reporting totals, not settlement.
    pub fx_rates: HashMap<String, f64>,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        let mut fx_rates = HashMap::new();
        fx_rates.insert("usd".to_string(), 0.92);
        fx_rates.insert("gbp".to_string(), 1.17);
        Self {
            primary_currency: "eur".to_string(),
            fx_rates,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_runnable() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.api_port, 8080);
        assert_eq!(cfg.sweeper.max_age_secs, 420);
        assert_eq!(cfg.booking.hold_ttl_secs, 420);
        assert_eq!(cfg.payouts.primary_currency, "eur");
        assert!(cfg.database.connection_url().starts_with("sqlite://"));
    }

    #[test]
    fn partial_file_fills_missing_sections() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            api_port = 9090

            [provider]
            secret_key = "sk_test_123"
            webhook_secret = "whsec_abc"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.api_port, 9090);
        assert_eq!(cfg.server.api_host, "0.0.0.0");
        assert_eq!(cfg.provider.secret_key, "sk_test_123");
        assert_eq!(cfg.sweeper.interval_secs, 60);
    }

    #[test]
    fn fx_rates_parse_from_table() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [payouts]
            primary_currency = "eur"

            [payouts.fx_rates]
            usd = 0.95
            mxn = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(cfg.payouts.fx_rates.get("usd"), Some(&0.95));
        assert_eq!(cfg.payouts.fx_rates.get("mxn"), Some(&0.05));
    }
}
