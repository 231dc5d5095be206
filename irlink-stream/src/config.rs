//! Sender configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Video source selection.
    pub source: SourceConfig,
    /// Encoder tuning.
    pub encoder: EncoderConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Control listener address (IP:port for the TCP handshake; the
    /// viewer receives datagrams on its side of the session).
    pub listen_addr: String,
}

/// Video source selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// "pattern" for the synthetic generator, "recording" to replay a
    /// stored sequence.
    pub kind: String,
    /// Sequence directory (for `kind = "recording"`).
    pub sequence_dir: String,
    /// Frames per second.
    pub fps: u32,
    /// Pattern width in pixels (for `kind = "pattern"`).
    pub width: u16,
    /// Pattern height in pixels (for `kind = "pattern"`).
    pub height: u16,
}

/// Encoder tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// zstd compression level (1 = fast … 19 = max).
    pub level: i32,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            source: SourceConfig::default(),
            encoder: EncoderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9000".into(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "pattern".into(),
            sequence_dir: String::new(),
            fps: 25,
            width: 256,
            height: 192,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { level: 1 }
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

impl StreamConfig {
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
        let cfg = StreamConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("listen_addr"));
        assert!(text.contains("fps"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = StreamConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: StreamConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.listen_addr, "0.0.0.0:9000");
        assert_eq!(parsed.source.fps, 25);
        assert_eq!(parsed.source.width, 256);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: StreamConfig = toml::from_str("[source]\nfps = 9\n").unwrap();
        assert_eq!(parsed.source.fps, 9);
        assert_eq!(parsed.source.kind, "pattern");
        assert_eq!(parsed.encoder.level, 1);
    }
}
