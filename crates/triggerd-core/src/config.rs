use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriggerdError};
use crate::paths;
use crate::value::is_valid_sensor_id;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:7878".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_STORE_FILE)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Seconds between reachability probes while ingress is paused.
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_reconnect_secs() -> u64 {
    5
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            reconnect_secs: default_reconnect_secs(),
        }
    }
}

/// Thresholds the default trigger catalog is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_temp_high")]
    pub temp_high: f64,
    #[serde(default = "default_temp_low")]
    pub temp_low: f64,
    #[serde(default = "default_sound")]
    pub sound: f64,
    #[serde(default = "default_light")]
    pub light: f64,
}

fn default_temp_high() -> f64 {
    27.0
}

fn default_temp_low() -> f64 {
    20.0
}

fn default_sound() -> f64 {
    40.0
}

fn default_light() -> f64 {
    700.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temp_high: default_temp_high(),
            temp_low: default_temp_low(),
            sound: default_sound(),
            light: default_light(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actuators: BTreeMap<String, ActuatorConfig>,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(TriggerdError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(TriggerdError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn store_path(&self, root: &Path) -> PathBuf {
        paths::store_path(root, &self.store.path)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| TriggerdError::Config(format!("server.bind '{}': {e}", self.server.bind)))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if self.bind_addr().is_err() {
            push(
                WarnLevel::Error,
                format!("server.bind '{}' is not a socket address", self.server.bind),
            );
        }

        if self.dispatch.workers == 0 {
            push(WarnLevel::Error, "dispatch.workers must be at least 1".into());
        }
        if self.dispatch.queue_capacity == 0 {
            push(
                WarnLevel::Error,
                "dispatch.queue_capacity must be at least 1".into(),
            );
        }
        if self.dispatch.reconnect_secs == 0 {
            push(
                WarnLevel::Warning,
                "dispatch.reconnect_secs is 0; the store will be probed continuously".into(),
            );
        }

        let t = &self.thresholds;
        if t.temp_low >= t.temp_high {
            push(
                WarnLevel::Warning,
                format!(
                    "thresholds.temp_low ({}) is not below thresholds.temp_high ({})",
                    t.temp_low, t.temp_high
                ),
            );
        }
        for (name, v) in [
            ("temp_high", t.temp_high),
            ("temp_low", t.temp_low),
            ("sound", t.sound),
            ("light", t.light),
        ] {
            if !v.is_finite() {
                push(WarnLevel::Error, format!("thresholds.{name} is not a number"));
            }
        }

        for (id, actuator) in &self.actuators {
            if !is_valid_sensor_id(id) {
                push(WarnLevel::Warning, format!("actuator id '{id}' is not a valid device id"));
            }
            let url = actuator.base_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                push(
                    WarnLevel::Error,
                    format!("actuators.{id}.base_url '{url}' must start with http:// or https://"),
                );
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
