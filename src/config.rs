//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`. The resulting `AppConfig` is
//! built once at startup and handed to the components by reference.

use anyhow::{Context, Result};
use secrecy::Secret;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::types::Sport;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    /// How often today's snapshots are force-refreshed. 0 disables the loop.
    pub refresh_interval_secs: u64,
    /// Sports with an active adapter.
    pub sports: Vec<Sport>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "sportsfeed".to_string(),
            refresh_interval_secs: 900,
            sports: Sport::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/snapshots"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on how many cached dates a fixture lookup scans.
    /// `None` scans every date.
    pub max_scan_dates: Option<usize>,
    /// Serve the cached snapshot when a forced refresh fails.
    pub fallback_on_forced_refresh: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_scan_dates: None,
            fallback_on_forced_refresh: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub api_sports: ApiSportsConfig,
    #[serde(default)]
    pub pmu: PmuConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiSportsConfig {
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Per-sport base URL overrides, keyed by sport id.
    pub base_urls: HashMap<String, String>,
}

impl Default for ApiSportsConfig {
    fn default() -> Self {
        Self {
            api_key_env: "API_SPORTS_KEY".to_string(),
            timeout_secs: 15,
            base_urls: HashMap::new(),
        }
    }
}

impl ApiSportsConfig {
    /// Base URL for a sport: the configured override, else the public host.
    pub fn base_url(&self, sport: Sport) -> String {
        if let Some(url) = self.base_urls.get(sport.as_str()) {
            return url.trim_end_matches('/').to_string();
        }
        match sport {
            Sport::Football => "https://v3.football.api-sports.io".to_string(),
            Sport::Basketball => "https://v1.basketball.api-sports.io".to_string(),
            Sport::Hockey => "https://v1.hockey.api-sports.io".to_string(),
            Sport::Baseball => "https://v1.baseball.api-sports.io".to_string(),
            Sport::Rugby => "https://v1.rugby.api-sports.io".to_string(),
            Sport::Handball => "https://v1.handball.api-sports.io".to_string(),
            Sport::Volleyball => "https://v1.volleyball.api-sports.io".to_string(),
            Sport::HorseRacing => String::new(),
        }
    }

    /// Resolve the API key. A missing variable yields an empty key; the
    /// upstream then answers 401 and the adapter reports an auth failure.
    pub fn api_key(&self) -> Secret<String> {
        match AppConfig::resolve_env(&self.api_key_env) {
            Ok(key) => Secret::new(key),
            Err(e) => {
                warn!(error = %e, "API-Sports key missing, requests will be rejected");
                Secret::new(String::new())
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PmuConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for PmuConfig {
    fn default() -> Self {
        Self {
            base_url: "https://online.turfinfo.api.pmu.fr/rest/client/61".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.service.sports.is_empty() {
            anyhow::bail!("service.sports must list at least one sport");
        }
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg.service.sports.len(), Sport::ALL.len());
        assert!(cfg.engine.fallback_on_forced_refresh);
        assert!(cfg.engine.max_scan_dates.is_none());
        assert_eq!(cfg.api.port, 8080);
        assert_eq!(cfg.providers.api_sports.api_key_env, "API_SPORTS_KEY");
    }

    #[test]
    fn test_parse_full_config() {
        let cfg = AppConfig::from_toml(
            r#"
            [service]
            name = "feed-test"
            refresh_interval_secs = 60
            sports = ["football", "horse_racing"]

            [storage]
            data_dir = "/tmp/feed"

            [engine]
            max_scan_dates = 14
            fallback_on_forced_refresh = false

            [providers.api_sports]
            api_key_env = "MY_KEY"
            timeout_secs = 5
            base_urls = { football = "http://localhost:9000/" }

            [api]
            enabled = false
            port = 9999
            "#,
        )
        .unwrap();

        assert_eq!(cfg.service.name, "feed-test");
        assert_eq!(cfg.service.sports, vec![Sport::Football, Sport::HorseRacing]);
        assert_eq!(cfg.storage.data_dir, PathBuf::from("/tmp/feed"));
        assert_eq!(cfg.engine.max_scan_dates, Some(14));
        assert!(!cfg.engine.fallback_on_forced_refresh);
        assert_eq!(
            cfg.providers.api_sports.base_url(Sport::Football),
            "http://localhost:9000"
        );
        assert_eq!(
            cfg.providers.api_sports.base_url(Sport::Hockey),
            "https://v1.hockey.api-sports.io"
        );
        assert!(!cfg.api.enabled);
    }

    #[test]
    fn test_sample_config_parses() {
        let cfg = AppConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
        assert_eq!(cfg.service.sports.len(), Sport::ALL.len());
        assert!(cfg.api.enabled);
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [service]
            name = "x"

            [engine]
            max_scan_dates = 5

            [providers.api_sports]
            timeout_secs = 30

            [providers.pmu]
            base_url = "http://localhost:9000"

            [api]
            port = 9090
            "#,
        )
        .unwrap();
        assert_eq!(cfg.service.name, "x");
        assert_eq!(cfg.service.refresh_interval_secs, 900);
        assert_eq!(cfg.service.sports.len(), Sport::ALL.len());
        assert_eq!(cfg.engine.max_scan_dates, Some(5));
        assert!(cfg.engine.fallback_on_forced_refresh);
        assert_eq!(cfg.providers.api_sports.api_key_env, "API_SPORTS_KEY");
        assert_eq!(cfg.providers.api_sports.timeout_secs, 30);
        assert_eq!(cfg.providers.pmu.timeout_secs, 15);
        assert!(cfg.api.enabled);
        assert_eq!(cfg.api.port, 9090);
    }

    #[test]
    fn test_rejects_empty_sport_list() {
        let result = AppConfig::from_toml("[service]\nname = \"x\"\nrefresh_interval_secs = 1\nsports = []\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_sport() {
        let result = AppConfig::from_toml(
            "[service]\nname = \"x\"\nrefresh_interval_secs = 1\nsports = [\"curling\"]\n",
        );
        assert!(result.is_err());
    }
}
