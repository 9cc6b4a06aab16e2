//! Configuration loading and types for memovox
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/memovox/config.toml)
//! 3. CLI arguments (highest priority)
//!
//! All ranges are validated up front, at session construction time. A bad
//! sample rate or checkpoint interval is rejected here, never mid-capture.

use crate::error::MemovoxError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Memovox Configuration
#
# Location: ~/.config/memovox/config.toml
# All settings can be overridden via CLI flags

# Directory for recordings, checkpoints and recovered files.
# Defaults to ~/.local/share/memovox/recordings (created with 0700 permissions).
# recordings_dir = "/home/you/recordings"

[audio]
# Audio input device ("default" uses system default)
# List devices with: memovox devices
device = "default"

# Sample rate in Hz
sample_rate = 44100

# Channel count (1 = mono, 2 = stereo)
channels = 1

# Frames per capture buffer (hint to the audio driver)
chunk_size = 1024

# Maximum duration in seconds for the ffmpeg capture fallback (safety cap)
max_duration_secs = 3600

[checkpoint]
# Seconds between checkpoint flushes. 0 disables checkpointing entirely.
# Non-zero values are clamped to [min_interval_secs, max_interval_secs].
interval_secs = 30

# Clamping bounds for the interval (policy, adjust to taste)
# min_interval_secs = 10
# max_interval_secs = 300
"#;

/// Sample rates the WAV pipeline accepts. Device support is verified
/// separately when the stream is opened.
pub const SUPPORTED_SAMPLE_RATES: &[u32] = &[8000, 16000, 22050, 44100, 48000];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Override for the recordings directory
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// Input device name, or "default"
    #[serde(default = "default_device")]
    pub device: String,

    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Channel count (1 = mono, 2 = stereo)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Frames per capture buffer
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Safety cap for the external capture process, in seconds
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u64,
}

/// Checkpoint flush configuration.
///
/// The interval bounds are policy, not an invariant: they exist so a typo
/// in the config file cannot schedule a flush every 100ms or once an hour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckpointConfig {
    /// Seconds between flushes; 0 disables checkpointing
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Lower clamp for a non-zero interval
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,

    /// Upper clamp for a non-zero interval
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u16 {
    1
}

fn default_chunk_size() -> u32 {
    1024
}

fn default_max_duration() -> u64 {
    3600
}

fn default_interval() -> u64 {
    30
}

fn default_min_interval() -> u64 {
    10
}

fn default_max_interval() -> u64 {
    300
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            chunk_size: default_chunk_size(),
            max_duration_secs: default_max_duration(),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            min_interval_secs: default_min_interval(),
            max_interval_secs: default_max_interval(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            checkpoint: CheckpointConfig::default(),
            recordings_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the given path, or the default location.
    ///
    /// A missing config file is not an error; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, MemovoxError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| MemovoxError::Config(format!("{}: {}", config_path.display(), e)))?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Config::default()
        };

        config.validated()
    }

    /// Default config file location (~/.config/memovox/config.toml)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("memovox")
            .join("config.toml")
    }

    /// Resolve the recordings directory (config override or XDG data dir)
    pub fn recordings_dir(&self) -> PathBuf {
        match &self.recordings_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("memovox")
                .join("recordings"),
        }
    }

    /// Validate ranges and clamp the checkpoint interval to its policy bounds.
    ///
    /// Returns the (possibly adjusted) config, or an error for values that
    /// cannot be sensibly corrected.
    pub fn validated(mut self) -> Result<Self, MemovoxError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.audio.sample_rate) {
            return Err(MemovoxError::Config(format!(
                "Unsupported sample rate {} Hz (supported: {:?})",
                self.audio.sample_rate, SUPPORTED_SAMPLE_RATES
            )));
        }

        if !(1..=2).contains(&self.audio.channels) {
            return Err(MemovoxError::Config(format!(
                "Channel count must be 1 or 2, got {}",
                self.audio.channels
            )));
        }

        if self.audio.chunk_size == 0 {
            return Err(MemovoxError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        let cp = &mut self.checkpoint;
        if cp.min_interval_secs == 0 || cp.min_interval_secs > cp.max_interval_secs {
            return Err(MemovoxError::Config(format!(
                "Invalid checkpoint interval bounds: min={} max={}",
                cp.min_interval_secs, cp.max_interval_secs
            )));
        }

        // 0 means disabled and is left alone; anything else gets clamped.
        if cp.interval_secs != 0 {
            let clamped = cp
                .interval_secs
                .clamp(cp.min_interval_secs, cp.max_interval_secs);
            if clamped != cp.interval_secs {
                tracing::warn!(
                    "Checkpoint interval {}s clamped to {}s",
                    cp.interval_secs,
                    clamped
                );
                cp.interval_secs = clamped;
            }
        }

        Ok(self)
    }
}
