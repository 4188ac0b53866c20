// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::core::constants::{config as env_keys, session};
use crate::core::errors::ConnectorError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Asset configuration supplied by the host for every invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub verify_server_cert: bool,
    /// Left raw; validated by the poller
    #[serde(default)]
    pub malop_historical_days: Option<Value>,
    #[serde(default)]
    pub malware_historical_days: Option<Value>,
}

impl AssetConfig {
    /// Build from the host's `config` object, normalizing the base URL
    pub fn from_json(value: Value) -> Result<Self, ConnectorError> {
        let mut config: AssetConfig = serde_json::from_value(value).map_err(|e| {
            ConnectorError::Configuration(format!("Invalid asset configuration: {}", e))
        })?;
        config.base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if config.base_url.is_empty() {
            return Err(ConnectorError::Configuration(
                "base_url asset configuration parameter is required".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConnectorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::Configuration(format!("Cannot read asset file {:?}: {}", path, e))
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            ConnectorError::Configuration(format!("Invalid asset file {:?}: {}", path, e))
        })?;
        Self::from_json(value)
    }

    pub fn user_agent(&self) -> &'static str {
        session::USER_AGENT
    }
}

/// Process-level settings loaded from environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub log_level: String,
    pub log_format: String, // "json" or "text"
    pub request_timeout_secs: u64,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConnectorError> {
        let config = Self {
            log_level: env::var(env_keys::ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string()),
            log_format: env::var(env_keys::ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string()),
            request_timeout_secs: Self::parse_timeout()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn parse_timeout() -> Result<u64, ConnectorError> {
        match env::var(env_keys::ENV_REQUEST_TIMEOUT_SECS) {
            Ok(value) => {
                let parsed = value.parse::<u64>().map_err(|e| {
                    ConnectorError::Configuration(format!(
                        "Invalid {} value '{}': {}",
                        env_keys::ENV_REQUEST_TIMEOUT_SECS,
                        value,
                        e
                    ))
                })?;
                if parsed == 0 {
                    return Err(ConnectorError::Configuration(format!(
                        "{} must be greater than 0",
                        env_keys::ENV_REQUEST_TIMEOUT_SECS
                    )));
                }
                Ok(parsed)
            }
            Err(_) => Ok(session::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    fn validate(&self) -> Result<(), ConnectorError> {
        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;
        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), ConnectorError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(ConnectorError::Configuration(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), ConnectorError> {
        if format != "json" && format != "text" {
            return Err(ConnectorError::Configuration(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            request_timeout_secs: session::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}
