//! Runtime configuration.
//!
//! Read once at startup from `SCOOP_POS_*` environment variables; anything
//! unset falls back to the defaults below. Invalid values are logged and
//! ignored rather than aborting startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

pub const ENV_DATA_DIR: &str = "SCOOP_POS_DATA_DIR";
pub const ENV_STORE: &str = "SCOOP_POS_STORE";
pub const ENV_TAX_RATE: &str = "SCOOP_POS_TAX_RATE";
pub const ENV_CURRENCY: &str = "SCOOP_POS_CURRENCY";
pub const ENV_REFRESH_SECS: &str = "SCOOP_POS_REFRESH_SECS";
pub const ENV_SEED_MENU: &str = "SCOOP_POS_SEED_MENU";

const DEFAULT_CURRENCY: &str = "₹";
const DEFAULT_REFRESH_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Json,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(StoreBackend::Sqlite),
            "json" | "local" => Ok(StoreBackend::Json),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    /// Percentage applied to the discounted subtotal.
    pub tax_rate: f64,
    pub currency_symbol: String,
    pub refresh_interval_secs: u64,
    /// Insert the default parlor menu when the catalog is empty.
    pub seed_menu: bool,
}

impl AppConfig {
    /// Defaults rooted at `data_dir`.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            store_backend: StoreBackend::Sqlite,
            tax_rate: 0.0,
            currency_symbol: DEFAULT_CURRENCY.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            seed_menu: true,
        }
    }

    /// Build the configuration from the process environment.
    ///
    /// `default_data_dir` is used when `SCOOP_POS_DATA_DIR` is unset (the
    /// desktop shell passes the platform app-data directory).
    pub fn from_env(default_data_dir: &Path) -> Self {
        let data_dir = std::env::var(ENV_DATA_DIR)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir.to_path_buf());
        let mut config = Self::for_data_dir(&data_dir);

        if let Some(raw) = env_value(ENV_STORE) {
            match raw.parse::<StoreBackend>() {
                Ok(backend) => config.store_backend = backend,
                Err(e) => warn!(value = %raw, "Ignoring {ENV_STORE}: {e}"),
            }
        }
        if let Some(raw) = env_value(ENV_TAX_RATE) {
            match raw.parse::<f64>() {
                Ok(rate) if rate.is_finite() && rate >= 0.0 => config.tax_rate = rate,
                _ => warn!(value = %raw, "Ignoring invalid {ENV_TAX_RATE}"),
            }
        }
        if let Some(raw) = env_value(ENV_CURRENCY) {
            config.currency_symbol = raw;
        }
        if let Some(raw) = env_value(ENV_REFRESH_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.refresh_interval_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {ENV_REFRESH_SECS}"),
            }
        }
        if let Some(raw) = env_value(ENV_SEED_MENU) {
            config.seed_menu = matches!(
                raw.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        config
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_KEYS: &[&str] = &[
        ENV_DATA_DIR,
        ENV_STORE,
        ENV_TAX_RATE,
        ENV_CURRENCY,
        ENV_REFRESH_SECS,
        ENV_SEED_MENU,
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        clear_env();
        let config = AppConfig::from_env(Path::new("/tmp/scoop"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/scoop"));
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.tax_rate, 0.0);
        assert_eq!(config.currency_symbol, "₹");
        assert_eq!(config.refresh_interval_secs, 30);
        assert!(config.seed_menu);
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        clear_env();
        std::env::set_var(ENV_DATA_DIR, "/var/lib/scoop");
        std::env::set_var(ENV_STORE, "json");
        std::env::set_var(ENV_TAX_RATE, "5");
        std::env::set_var(ENV_CURRENCY, "$");
        std::env::set_var(ENV_REFRESH_SECS, "10");
        std::env::set_var(ENV_SEED_MENU, "false");
        let config = AppConfig::from_env(Path::new("/tmp/scoop"));
        clear_env();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/scoop"));
        assert_eq!(config.store_backend, StoreBackend::Json);
        assert_eq!(config.tax_rate, 5.0);
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.refresh_interval_secs, 10);
        assert!(!config.seed_menu);
        assert_eq!(config.log_dir(), PathBuf::from("/var/lib/scoop/logs"));
    }

    #[test]
    #[serial]
    fn invalid_values_are_ignored() {
        clear_env();
        std::env::set_var(ENV_STORE, "postgres");
        std::env::set_var(ENV_TAX_RATE, "-3");
        std::env::set_var(ENV_REFRESH_SECS, "0");
        let config = AppConfig::from_env(Path::new("/tmp/scoop"));
        clear_env();

        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.tax_rate, 0.0);
        assert_eq!(config.refresh_interval_secs, 30);
    }
}
