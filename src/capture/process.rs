//! External-process capture via ffmpeg
//!
//! Second strategy in the chain: when no native stream can be opened, spawn
//! ffmpeg recording straight to the committed output path. ffmpeg writes its
//! WAV incrementally, so crash-safety for this strategy comes from the file
//! it leaves behind rather than from checkpointing.
//!
//! The command is constructed here, never accepted from a caller, and the
//! output path is validated against the recordings root before it is passed
//! as an argument.

use crate::audio::paths;
use crate::config::AudioConfig;
use crate::error::CaptureError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// How long a spawn gets before an immediate exit counts as failure.
const STARTUP_PROBE: Duration = Duration::from_millis(300);

/// Grace period after SIGTERM before escalating to a kill.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a supervised ffmpeg capture process
pub struct ExternalCapture {
    child: Option<Child>,
    output_path: PathBuf,
}

impl ExternalCapture {
    /// Spawn ffmpeg capturing the default input source to `output_path`.
    ///
    /// The path is canonicalized and validated first; the recording is
    /// bounded by `max_duration_secs` as a safety cap.
    pub async fn spawn(
        config: &AudioConfig,
        output_path: &Path,
        recordings_root: &Path,
    ) -> Result<Self, CaptureError> {
        let validated = paths::validate_external_output(output_path, recordings_root)?;

        let ffmpeg = which::which("ffmpeg").map_err(|_| CaptureError::FfmpegNotFound)?;

        let (input_format, input_source) = platform_input();

        let mut cmd = Command::new(&ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-f")
            .arg(input_format)
            .arg("-i")
            .arg(input_source)
            .arg("-ac")
            .arg(config.channels.to_string())
            .arg("-ar")
            .arg(config.sample_rate.to_string())
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-t")
            .arg(config.max_duration_secs.to_string())
            .arg("-y")
            .arg(&validated)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!("Spawning capture process: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| CaptureError::ProcessFailed(format!("failed to spawn ffmpeg: {}", e)))?;

        // ffmpeg exits within milliseconds when the input source is absent
        // (no pulse server, no mic). Catch that here so start falls through
        // to the synthetic strategy instead of failing at stop time.
        tokio::time::sleep(STARTUP_PROBE).await;
        if let Ok(Some(status)) = child.try_wait() {
            return Err(CaptureError::ProcessFailed(format!(
                "ffmpeg exited immediately with {}",
                status
            )));
        }

        tracing::info!("ffmpeg capture started -> {}", validated.display());

        Ok(Self {
            child: Some(child),
            output_path: validated,
        })
    }

    /// Path the process is recording into
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Stop the capture process and return the output path if a non-empty
    /// file was produced.
    ///
    /// Sends a graceful terminate first (lets ffmpeg finish its container),
    /// waits with a timeout, then escalates to a forced kill. Failures at
    /// this point are logged, not raised; whatever partial file exists is
    /// still returned when non-empty.
    pub async fn stop(&mut self) -> Option<PathBuf> {
        let mut child = self.child.take()?;

        send_terminate(&child);

        match tokio::time::timeout(TERMINATE_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("Capture process exited with {}", status);
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed waiting for capture process: {}", e);
            }
            Err(_) => {
                tracing::warn!("Capture process ignored terminate, killing it");
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill capture process: {}", e);
                }
            }
        }

        match std::fs::metadata(&self.output_path) {
            Ok(meta) if meta.len() > 0 => Some(self.output_path.clone()),
            Ok(_) => {
                tracing::warn!(
                    "Capture process produced an empty file: {}",
                    self.output_path.display()
                );
                None
            }
            Err(e) => {
                tracing::warn!("Capture process produced no file: {}", e);
                None
            }
        }
    }

    /// Forcefully terminate the process without waiting. Used by cleanup;
    /// must not fail and is safe to call after `stop`.
    pub fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                tracing::debug!("Capture process already gone: {}", e);
            }
        }
    }
}

/// Platform-appropriate ffmpeg input selection
fn platform_input() -> (&'static str, &'static str) {
    if cfg!(target_os = "macos") {
        ("avfoundation", ":0")
    } else {
        ("pulse", "default")
    }
}

/// Ask the process to exit gracefully. On Linux that is SIGTERM, which lets
/// ffmpeg flush and close its output container.
#[cfg(target_os = "linux")]
fn send_terminate(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::debug!("SIGTERM failed (process already exited?): {}", e);
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn send_terminate(_child: &Child) {}
