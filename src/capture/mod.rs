//! Capture strategies and fallback chain
//!
//! Three mutually exclusive ways of obtaining audio, tried in fixed order:
//! 1. NativeStream - cpal input stream (direct driver callback)
//! 2. ExternalProcess - supervised ffmpeg subprocess
//! 3. SyntheticFallback - generated placeholder waveform (always succeeds)
//!
//! Each attempt returns a `CaptureError` on failure, which the chain treats
//! as fallthrough to the next variant. The active capture is a closed enum,
//! matched exhaustively at stop/cleanup time.

pub mod process;
pub mod stream;
pub mod synthetic;

use crate::audio::FrameBuffer;
use crate::config::AudioConfig;
use crate::error::{CaptureError, RecordingError};
use std::path::Path;
use std::sync::Arc;

pub use process::ExternalCapture;
pub use stream::NativeStream;

/// The capture resource owned by an active session
pub enum ActiveCapture {
    /// cpal input stream feeding the frame buffer
    Stream(NativeStream),
    /// ffmpeg subprocess writing the output file itself
    Process(ExternalCapture),
    /// Placeholder frames already appended to the buffer
    Synthetic,
}

/// Which strategy a session ended up on, for logging and status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    NativeStream,
    ExternalProcess,
    SyntheticFallback,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::NativeStream => write!(f, "native stream"),
            StrategyKind::ExternalProcess => write!(f, "external process"),
            StrategyKind::SyntheticFallback => write!(f, "synthetic fallback"),
        }
    }
}

/// Information about an audio input device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub max_channels: u16,
    pub default_sample_rate: u32,
}

/// Explicit handle to the audio driver.
///
/// Owned by the session controller for its whole lifetime: opened once,
/// reused across sessions, released only by `close` (called from cleanup).
pub struct CaptureEngine {
    host: Option<cpal::Host>,
}

impl CaptureEngine {
    /// Open the default audio host
    pub fn open() -> Self {
        Self {
            host: Some(cpal::default_host()),
        }
    }

    fn host(&self) -> Result<&cpal::Host, CaptureError> {
        self.host
            .as_ref()
            .ok_or_else(|| CaptureError::DeviceUnavailable("capture engine closed".to_string()))
    }

    /// Release the driver handle. Idempotent; a closed engine makes the
    /// native strategy fail, which the fallback chain handles like any
    /// other unavailable device.
    pub fn close(&mut self) {
        if self.host.take().is_some() {
            tracing::debug!("Capture engine closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.host.is_some()
    }

    /// List available audio input devices
    pub fn list_input_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = self.host()?;
        let mut devices = Vec::new();

        let iter = host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        for device in iter {
            let name = match device.name() {
                Ok(n) => n,
                Err(_) => continue,
            };
            let config = match device.default_input_config() {
                Ok(c) => c,
                Err(_) => continue,
            };
            devices.push(DeviceInfo {
                name,
                max_channels: config.channels(),
                default_sample_rate: config.sample_rate().0,
            });
        }

        Ok(devices)
    }
}

/// Try each capture strategy in order until one succeeds.
///
/// Exhausting all variants is a terminal `RecordingError`; in practice the
/// synthetic fallback only fails if the buffer refuses frames.
pub async fn start_with_fallback(
    engine: &CaptureEngine,
    config: &AudioConfig,
    buffer: Arc<FrameBuffer>,
    output_path: &Path,
    recordings_root: &Path,
) -> Result<(ActiveCapture, StrategyKind), RecordingError> {
    match engine
        .host()
        .and_then(|host| NativeStream::open(host, config, buffer.clone()))
    {
        Ok(stream) => {
            tracing::info!("Capturing via native stream");
            return Ok((ActiveCapture::Stream(stream), StrategyKind::NativeStream));
        }
        Err(e) => {
            tracing::warn!("Native stream unavailable: {}, trying next", e);
        }
    }

    match ExternalCapture::spawn(config, output_path, recordings_root).await {
        Ok(capture) => {
            tracing::info!("Capturing via external process");
            return Ok((
                ActiveCapture::Process(capture),
                StrategyKind::ExternalProcess,
            ));
        }
        Err(e) => {
            tracing::warn!("External process capture failed: {}, trying next", e);
        }
    }

    // Observable degraded mode: the caller gets a working session but the
    // log makes clear no real audio is being captured.
    tracing::warn!("No capture path available, falling back to synthetic placeholder audio");
    synthetic::fill_buffer(config, &buffer).map_err(|e| {
        tracing::error!("Synthetic fallback failed: {}", e);
        RecordingError::AllStrategiesFailed
    })?;
    Ok((ActiveCapture::Synthetic, StrategyKind::SyntheticFallback))
}
