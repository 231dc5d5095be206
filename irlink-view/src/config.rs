//! Viewer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Contrast enhancement.
    pub enhance: EnhanceConfig,
    /// Frame recording.
    pub record: RecordConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Sender control address (IP:port for the TCP handshake).
    pub server_addr: String,
}

/// Contrast enhancement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Apply the histogram stretch to decoded frames.
    pub stretch: bool,
    /// Histogram bin count (power of two).
    pub num_bins: usize,
}

/// Frame recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Sequence directory to record decoded frames into; empty
    /// disables recording.
    pub dir: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            enhance: EnhanceConfig::default(),
            record: RecordConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:9000".into(),
        }
    }
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            stretch: true,
            num_bins: 256,
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self { dir: String::new() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ViewConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("server_addr"));
        assert!(text.contains("num_bins"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ViewConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ViewConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.server_addr, "127.0.0.1:9000");
        assert!(parsed.enhance.stretch);
        assert!(parsed.record.dir.is_empty());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: ViewConfig = toml::from_str("[enhance]\nstretch = false\n").unwrap();
        assert!(!parsed.enhance.stretch);
        assert_eq!(parsed.enhance.num_bins, 256);
    }
}
