//! Process configuration.
//!
//! Settings come from an optional TOML file merged with command line flags;
//! flags win. A missing file silently falls back to the defaults below.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_GRID_WIDTH: usize = 10;
pub const DEFAULT_GRID_HEIGHT: usize = 20;
pub const DEFAULT_PORT: u16 = 21324;

// Config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Invalid grid size: {0}")]
    InvalidGrid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct SimConfig {
    /// Grid width in pixels.
    pub width: usize,
    /// Grid height in pixels.
    pub height: usize,
    /// UDP listen address.
    pub address: IpAddr,
    /// UDP listen port.
    pub port: u16,
    /// Joystick sink path; created as a named pipe when absent.
    pub fifo: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            fifo: None,
        }
    }
}

impl SimConfig {
    /// Default config file location, `None` when the platform has no config
    /// directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ledgrid-sim").join("config.toml"))
    }

    /// Load settings from an explicit TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        let config = toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load_or_default() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring {}: {}", path.display(), e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// Grid dimensions must be positive; everything else is unconstrained.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidGrid(format!(
                "{} x {}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}
