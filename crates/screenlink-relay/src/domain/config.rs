//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! It is built from defaults, optionally overlaid with a TOML file, and
//! finally overlaid with CLI arguments in `main.rs`.
//!
//! # File format
//!
//! Every key is optional; absent keys keep their default.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8765
//! outbound_capacity = 256
//! log_level = "info"
//!
//! [input]
//! queue_capacity = 128
//! pointer_min_interval_ms = 5
//! pointer_min_distance_px = 2.0
//! surface_width = 1920
//! surface_height = 1080
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),
}

/// All runtime configuration for the relay.
///
/// # Example
///
/// ```rust
/// use screenlink_relay::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8765);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// Per-endpoint outbound queue length.  Messages for an endpoint whose
    /// queue is full are dropped, never awaited.
    pub outbound_capacity: usize,

    /// Per-class bound of each viewer's pending input queues.
    pub input_queue_capacity: usize,

    /// Binary pointer updates closer together than this are dropped.
    pub pointer_min_interval: Duration,

    /// Pointer moves smaller than this on both axes are dropped.
    pub pointer_min_distance_px: f64,

    /// Surface size used to convert normalized coordinates when the
    /// actuator does not report one.
    pub fallback_surface: (u32, u32),

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for RelayConfig {
    /// | Field                   | Default          |
    /// |-------------------------|------------------|
    /// | bind_addr               | `0.0.0.0:8765`   |
    /// | outbound_capacity       | 256              |
    /// | input_queue_capacity    | 128              |
    /// | pointer_min_interval    | 5 ms             |
    /// | pointer_min_distance_px | 2.0              |
    /// | fallback_surface        | 1920 × 1080      |
    /// | log_level               | `info`           |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(default_bind_ip(), default_port()),
            outbound_capacity: default_outbound_capacity(),
            input_queue_capacity: default_queue_capacity(),
            pointer_min_interval: Duration::from_millis(default_pointer_min_interval_ms()),
            pointer_min_distance_px: default_pointer_min_distance_px(),
            fallback_surface: (default_surface_width(), default_surface_height()),
            log_level: default_log_level(),
        }
    }
}

impl RelayConfig {
    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or any error
    /// [`RelayConfig::from_toml`] returns.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parses TOML text on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or wrongly typed keys,
    /// and [`ConfigError::InvalidBindAddress`] for a bad `bind_address`.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        file.into_relay_config()
    }
}

// ── Config file schema ────────────────────────────────────────────────────────

/// On-disk form of [`RelayConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub input: InputSection,
}

/// `[server]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// `[input]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSection {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_pointer_min_interval_ms")]
    pub pointer_min_interval_ms: u64,
    #[serde(default = "default_pointer_min_distance_px")]
    pub pointer_min_distance_px: f64,
    #[serde(default = "default_surface_width")]
    pub surface_width: u32,
    #[serde(default = "default_surface_height")]
    pub surface_height: u32,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            outbound_capacity: default_outbound_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            pointer_min_interval_ms: default_pointer_min_interval_ms(),
            pointer_min_distance_px: default_pointer_min_distance_px(),
            surface_width: default_surface_width(),
            surface_height: default_surface_height(),
        }
    }
}

impl ConfigFile {
    /// Converts the file form into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` is not
    /// an IP address.
    pub fn into_relay_config(self) -> Result<RelayConfig, ConfigError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.server.bind_address.clone()))?;

        Ok(RelayConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            outbound_capacity: self.server.outbound_capacity.max(1),
            input_queue_capacity: self.input.queue_capacity.max(1),
            pointer_min_interval: Duration::from_millis(self.input.pointer_min_interval_ms),
            pointer_min_distance_px: self.input.pointer_min_distance_px,
            fallback_surface: (self.input.surface_width, self.input.surface_height),
            log_level: self.server.log_level,
        })
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_bind_ip() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}
fn default_port() -> u16 {
    8765
}
fn default_outbound_capacity() -> usize {
    256
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_queue_capacity() -> usize {
    128
}
fn default_pointer_min_interval_ms() -> u64 {
    5
}
fn default_pointer_min_distance_px() -> f64 {
    2.0
}
fn default_surface_width() -> u32 {
    1920
}
fn default_surface_height() -> u32 {
    1080
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_8765() {
        // Arrange / Act
        let cfg = RelayConfig::default();
        // Assert
        assert_eq!(cfg.bind_addr.port(), 8765);
        assert!(cfg.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_input_thresholds() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.pointer_min_interval, Duration::from_millis(5));
        assert_eq!(cfg.pointer_min_distance_px, 2.0);
        assert_eq!(cfg.input_queue_capacity, 128);
        assert_eq!(cfg.outbound_capacity, 256);
        assert_eq!(cfg.fallback_surface, (1920, 1080));
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg = RelayConfig::from_toml("").unwrap();
        assert_eq!(cfg, RelayConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_keys() {
        // Arrange
        let text = r#"
            [server]
            port = 9000

            [input]
            surface_width = 2560
        "#;

        // Act
        let cfg = RelayConfig::from_toml(text).unwrap();

        // Assert
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.fallback_surface, (2560, 1080));
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        let err = RelayConfig::from_toml("[server]\nbind_address = \"not.an.ip\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddress(addr) if addr == "not.an.ip"));
    }

    #[test]
    fn test_wrongly_typed_key_is_parse_error() {
        let err = RelayConfig::from_toml("[server]\nport = \"eighty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_capacities_are_raised_to_one() {
        let cfg =
            RelayConfig::from_toml("[server]\noutbound_capacity = 0\n[input]\nqueue_capacity = 0")
                .unwrap();
        assert_eq!(cfg.outbound_capacity, 1);
        assert_eq!(cfg.input_queue_capacity, 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RelayConfig::load(Path::new("/definitely/not/here/screenlink.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
