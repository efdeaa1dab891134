use anyhow::{Context, Result};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FinnikaccProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub finnikacc: Option<FinnikaccProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            finnikacc: Some(FinnikaccProviderConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
            }),
        }
    }
}

/// Timing of rate refetches. All fields are optional in the file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RefetchConfig {
    pub stale_time_secs: u64,
    pub interval_secs: u64,
    pub error_interval_secs: u64,
    pub retries: usize,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for RefetchConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: 5 * 60,
            interval_secs: 15 * 60,
            error_interval_secs: 10,
            retries: 4,
            retry_base_delay_ms: 2_000,
            retry_max_delay_ms: 150_000,
        }
    }
}

impl RefetchConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn error_interval(&self) -> Duration {
        Duration::from_secs(self.error_interval_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Currencies added to the basket next to the main base on startup.
    #[serde(default)]
    pub currencies: Vec<String>,
    pub default_amount: Option<Decimal>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub refetch: RefetchConfig,
}

impl AppConfig {
    /// Loads the config from the default location, or defaults when no file
    /// has been created there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "finnikacc", "finnikacc")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn api_base_url(&self) -> &str {
        self.providers
            .finnikacc
            .as_ref()
            .map_or(DEFAULT_API_BASE_URL, |p| &p.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currencies: [EUR, GBP]
default_amount: "250.5"
providers:
  finnikacc:
    base_url: "http://example.com"
refetch:
  interval_secs: 60
  retries: 2
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currencies, vec!["EUR", "GBP"]);
        assert_eq!(config.default_amount, Some(Decimal::new(2505, 1)));
        assert_eq!(config.api_base_url(), "http://example.com");
        assert_eq!(config.refetch.interval(), Duration::from_secs(60));
        assert_eq!(config.refetch.retries, 2);
        // unspecified refetch fields keep their defaults
        assert_eq!(config.refetch.error_interval(), Duration::from_secs(10));
        assert_eq!(config.refetch.stale_time(), Duration::from_secs(300));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.currencies.is_empty());
        assert!(config.default_amount.is_none());
        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(config.refetch, RefetchConfig::default());
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        fs::write(file.path(), "currencies: [PLN]\n")?;

        let config = AppConfig::load_from_path(file.path())?;
        assert_eq!(config.currencies, vec!["PLN"]);

        let missing = AppConfig::load_from_path(file.path().join("missing.yaml"));
        assert!(missing.unwrap_err().to_string().contains("Failed to read config file"));
        Ok(())
    }
}
