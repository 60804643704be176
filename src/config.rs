//! Runtime configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! YAML file, `HTTPTAP_*` environment variables, and finally whatever the
//! binary's command line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Capture device name (e.g. "eth0")
    pub device: String,

    /// Root directory for in-flight fragment storage
    pub storage_root: PathBuf,

    /// Only TCP traffic on this port is captured
    pub port: u16,

    /// Maximum bytes captured per frame
    pub snapshot_len: i32,

    pub promiscuous: bool,

    /// Capture read timeout in milliseconds
    pub read_timeout_ms: i32,

    /// Maximum concurrent in-flight packet units
    pub max_in_flight: usize,

    /// How long traffic is dropped after capacity is reached
    pub shed_cooldown_secs: u64,

    /// Capacity of the channel carrying HTTP events to the consumer
    pub event_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: "eth0".to_string(),
            storage_root: PathBuf::from("/tmp/httptap"),
            port: 80,
            snapshot_len: 65535,
            promiscuous: false,
            read_timeout_ms: 1000,
            max_in_flight: 1000,
            shed_cooldown_secs: 3,
            event_buffer: 1024,
        }
    }
}

impl Config {
    /// Loads configuration from `path` (or `HTTPTAP_CONFIG` when `path` is
    /// `None`), then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os("HTTPTAP_CONFIG").map(PathBuf::from);
        let mut cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw)?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("HTTPTAP_DEVICE") {
            self.device = device;
        }
        if let Ok(root) = std::env::var("HTTPTAP_STORAGE") {
            self.storage_root = PathBuf::from(root);
        }
        if let Ok(port) = std::env::var("HTTPTAP_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("HTTPTAP_PORT is not a port number: {port}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            anyhow::bail!("max_in_flight must be at least 1");
        }
        if self.port == 0 {
            anyhow::bail!("port must be non-zero");
        }
        if self.event_buffer == 0 {
            anyhow::bail!("event_buffer must be at least 1");
        }
        Ok(())
    }

    pub fn shed_cooldown(&self) -> Duration {
        Duration::from_secs(self.shed_cooldown_secs)
    }

    /// BPF expression handed to the capture device.
    pub fn capture_filter(&self) -> String {
        format!("tcp port {}", self.port)
    }
}
