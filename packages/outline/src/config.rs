//! Runtime configuration for an outline session
//!
//! `OutlineConfig` is built once when the session starts, either from defaults,
//! from a deserialized settings document, or from environment overrides via
//! [`OutlineConfig::from_env`].

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default auto-save debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;

/// Upper bound for the debounce window (10 minutes)
const MAX_DEBOUNCE_MS: u64 = 600_000;

/// Broadcast channel capacity for domain events
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Environment variable overriding the default title of text nodes
pub const ENV_DEFAULT_TITLE: &str = "NODESPACE_DEFAULT_TITLE";

/// Environment variable overriding the auto-save debounce window
pub const ENV_AUTOSAVE_DEBOUNCE_MS: &str = "NODESPACE_AUTOSAVE_DEBOUNCE_MS";

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("default_title cannot be empty")]
    EmptyDefaultTitle,

    #[error("autosave.debounce_ms cannot exceed {max} (got {actual})")]
    DebounceTooLong { actual: u64, max: u64 },

    #[error("event_channel_capacity must be greater than 0")]
    ZeroEventCapacity,

    #[error("Invalid value for {var}: {value}")]
    InvalidEnvValue { var: String, value: String },
}

/// Auto-save behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Idle period after the last edit before the save fires
    pub debounce_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl AutoSaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Session-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Title given to text nodes created or saved without one
    pub default_title: String,

    /// Auto-save settings
    pub autosave: AutoSaveConfig,

    /// Capacity of the domain event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            default_title: "Untitled".to_string(),
            autosave: AutoSaveConfig::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl OutlineConfig {
    /// Build a configuration from defaults plus environment overrides
    ///
    /// Recognised variables:
    /// - `NODESPACE_DEFAULT_TITLE`
    /// - `NODESPACE_AUTOSAVE_DEBOUNCE_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(title) = lookup(ENV_DEFAULT_TITLE) {
            config.default_title = title;
        }

        if let Some(raw) = lookup(ENV_AUTOSAVE_DEBOUNCE_MS) {
            config.autosave.debounce_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvValue {
                        var: ENV_AUTOSAVE_DEBOUNCE_MS.to_string(),
                        value: raw.clone(),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_title.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultTitle);
        }

        if self.autosave.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::DebounceTooLong {
                actual: self.autosave.debounce_ms,
                max: MAX_DEBOUNCE_MS,
            });
        }

        if self.event_channel_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }

        Ok(())
    }
}
