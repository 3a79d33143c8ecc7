use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ChatError, Result};

const APP_DIR: &str = "chatsapp";
const CONFIG_FILE: &str = "config.json";

/// Tunables for the simulation. Every field has a default, so a config file
/// only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub delivered_after_ms: u64,
    /// Measured from the delivered transition
    pub read_after_ms: u64,
    pub reply_probability: f64,
    pub reply_delay_min_ms: u64,
    pub reply_delay_max_ms: u64,
    pub typing_poll_ms: u64,
    pub typing_probability: f64,
    pub typing_duration_ms: u64,
    pub page_size: usize,
    pub error_ttl_ms: u64,
    pub load_delay_ms: u64,
    pub load_timeout_ms: u64,
    /// Pause before a conversation's history first appears
    pub message_load_delay_ms: u64,
    /// Fixed seed for the random source; entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            delivered_after_ms: 1000,
            read_after_ms: 3000,
            reply_probability: 0.7,
            reply_delay_min_ms: 2000,
            reply_delay_max_ms: 5000,
            typing_poll_ms: 10_000,
            typing_probability: 0.2,
            typing_duration_ms: 2000,
            page_size: 20,
            error_ttl_ms: 5000,
            load_delay_ms: 1500,
            load_timeout_ms: 10_000,
            message_load_delay_ms: 500,
            seed: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `path` is None.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    info!("No config directory on this platform, using defaults");
                    return Ok(Config::default());
                }
            },
        };

        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| ChatError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| ChatError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("reply_probability", self.reply_probability),
            ("typing_probability", self.typing_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ChatError::Config(format!("{} must be within [0, 1], got {}", name, p)));
            }
        }
        if self.reply_delay_min_ms > self.reply_delay_max_ms {
            return Err(ChatError::Config(format!(
                "reply delay range is inverted: {}..{}",
                self.reply_delay_min_ms, self.reply_delay_max_ms
            )));
        }
        if self.page_size == 0 {
            return Err(ChatError::Config("page_size must be at least 1".to_string()));
        }
        if self.typing_poll_ms == 0 {
            return Err(ChatError::Config("typing_poll_ms must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn delivered_after(&self) -> Duration {
        Duration::from_millis(self.delivered_after_ms)
    }

    pub fn read_after(&self) -> Duration {
        Duration::from_millis(self.read_after_ms)
    }

    pub fn reply_delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.reply_delay_min_ms),
            Duration::from_millis(self.reply_delay_max_ms),
        )
    }

    pub fn typing_poll(&self) -> Duration {
        Duration::from_millis(self.typing_poll_ms)
    }

    pub fn typing_duration(&self) -> Duration {
        Duration::from_millis(self.typing_duration_ms)
    }

    pub fn error_ttl(&self) -> Duration {
        Duration::from_millis(self.error_ttl_ms)
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn message_load_delay(&self) -> Duration {
        Duration::from_millis(self.message_load_delay_ms)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
