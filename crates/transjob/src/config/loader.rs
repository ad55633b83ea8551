use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.sweep.interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "sweep.interval_secs must be positive".to_string(),
        });
    }

    if config.batch.group_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "batch.group_timeout_secs must be positive".to_string(),
        });
    }

    for (alias, settings) in &config.providers {
        let valid_alias = !alias.is_empty()
            && alias
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_alias {
            return Err(ConfigError::InvalidProvider {
                alias: alias.clone(),
                reason: "alias must be non-empty and contain only letters, digits, '-' or '_'"
                    .to_string(),
            });
        }
        if settings.keys().any(|key| key.trim().is_empty()) {
            return Err(ConfigError::InvalidProvider {
                alias: alias.clone(),
                reason: "setting names must not be empty".to_string(),
            });
        }
    }

    Ok(())
}
