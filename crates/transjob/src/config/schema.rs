use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Settings for one provider, keyed by setting name.
pub type ProviderSettings = serde_json::Map<String, serde_json::Value>;

/// Configuration shared between the admin layer and providers. Providers
/// read it in `reload()`.
pub type SharedConfig = Arc<RwLock<Config>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_media_root")]
    pub media_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

fn default_media_root() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    300
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_group_timeout_secs")]
    pub group_timeout_secs: u64,
}

fn default_group_timeout_secs() -> u64 {
    120
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            group_timeout_secs: default_group_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            media_root: default_media_root(),
            database_path: None,
            sweep: SweepConfig::default(),
            batch: BatchConfig::default(),
            providers: HashMap::new(),
        }
    }
}

impl Config {
    pub fn into_shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }

    /// Typed lookup of a provider setting.
    ///
    /// Hosts often store every setting as a string, so `"false"` or `"30"`
    /// are also accepted for non-string types. Missing or unparseable values
    /// fall back to `default`.
    pub fn provider_setting<T: DeserializeOwned>(&self, alias: &str, key: &str, default: T) -> T {
        let Some(value) = self.providers.get(alias).and_then(|s| s.get(key)) else {
            return default;
        };

        if let Ok(parsed) = serde_json::from_value::<T>(value.clone()) {
            return parsed;
        }

        if let Some(text) = value.as_str() {
            if let Ok(parsed) = serde_json::from_str::<T>(text) {
                return parsed;
            }
        }

        log::warn!(
            "Ignoring invalid setting '{}' for provider '{}': {}",
            key,
            alias,
            value
        );
        default
    }

    pub fn set_provider_setting(&mut self, alias: &str, key: &str, value: serde_json::Value) {
        self.providers
            .entry(alias.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}
