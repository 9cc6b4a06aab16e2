//! Recording session controller
//!
//! Owns the capture engine for its whole lifetime and, per session, the
//! frame buffer and checkpoint writer. Exposes the start/stop/cleanup
//! contract the rest of the application consumes.
//!
//! State machine: Idle → Starting → Capturing → Stopping → {Committed |
//! Failed}, with a new start possible from any resting state.

use crate::audio::{paths, wav, FrameBuffer};
use crate::capture::{self, ActiveCapture, CaptureEngine, DeviceInfo, StrategyKind};
use crate::checkpoint::CheckpointWriter;
use crate::config::Config;
use crate::error::{CaptureError, MemovoxError, RecordingError};
use crate::state::SessionState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// The live unit of work: one recording in progress.
struct ActiveSession {
    buffer: Arc<FrameBuffer>,
    capture: ActiveCapture,
    strategy: StrategyKind,
    writer: Option<CheckpointWriter>,
    output_path: PathBuf,
}

/// Orchestrates capture strategy selection, checkpointing, and teardown.
///
/// At most one session is active at a time; starting a second one fails
/// immediately with `AlreadyRecording`.
pub struct SessionController {
    engine: CaptureEngine,
    config: Config,
    recordings_dir: PathBuf,
    state: SessionState,
    session: Option<ActiveSession>,
    last_committed: Option<PathBuf>,
}

impl SessionController {
    /// Create a controller around an opened capture engine.
    ///
    /// The config is range-validated here; a bad sample rate or checkpoint
    /// interval is rejected before any session can start.
    pub fn new(engine: CaptureEngine, config: Config) -> Result<Self, MemovoxError> {
        let config = config.validated()?;
        let recordings_dir = config.recordings_dir();
        Ok(Self {
            engine,
            config,
            recordings_dir,
            state: SessionState::new(),
            session: None,
            last_committed: None,
        })
    }

    /// Start a new recording session.
    ///
    /// Tries the capture strategies in order (native stream, external
    /// process, synthetic fallback) and returns the output path the
    /// session will commit to on stop.
    pub async fn start(&mut self) -> Result<PathBuf, MemovoxError> {
        if self.session.is_some() {
            return Err(RecordingError::AlreadyRecording.into());
        }

        self.state = SessionState::Starting;
        paths::ensure_recordings_dir(&self.recordings_dir)?;
        let output_path = paths::timestamped_output(&self.recordings_dir);

        // Fresh buffer per session; a previous session's frames are never
        // reused.
        let buffer = Arc::new(FrameBuffer::new());
        buffer.set_recording(true);

        let result = capture::start_with_fallback(
            &self.engine,
            &self.config.audio,
            buffer.clone(),
            &output_path,
            &self.recordings_dir,
        )
        .await;

        let (capture, strategy) = match result {
            Ok(started) => started,
            Err(e) => {
                buffer.set_recording(false);
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        };

        // Synthetic sessions hold everything in memory already; the timer
        // only makes sense for the strategies that keep producing frames.
        let writer = match strategy {
            StrategyKind::NativeStream | StrategyKind::ExternalProcess => CheckpointWriter::start(
                buffer.clone(),
                &output_path,
                self.config.audio.sample_rate,
                self.config.audio.channels,
                self.config.checkpoint.interval_secs,
            ),
            StrategyKind::SyntheticFallback => None,
        };

        tracing::info!("Recording started ({}) -> {}", strategy, output_path.display());

        self.session = Some(ActiveSession {
            buffer,
            capture,
            strategy,
            writer,
            output_path: output_path.clone(),
        });
        self.state = SessionState::Capturing {
            started_at: Instant::now(),
        };

        Ok(output_path)
    }

    /// Stop the active session and commit the recording.
    ///
    /// Idempotent: with no session active, returns the last committed path
    /// if that file still exists, otherwise None. Never raises.
    pub async fn stop(&mut self) -> Option<PathBuf> {
        let Some(session) = self.session.take() else {
            return self.last_committed.clone().filter(|p| p.exists());
        };

        self.state = SessionState::Stopping;

        let ActiveSession {
            buffer,
            capture,
            strategy,
            writer,
            output_path,
        } = session;

        // Flag first: any concurrent observer sees "not recording" before
        // teardown runs, and late driver callbacks are dropped.
        buffer.set_recording(false);

        let committed = match capture {
            ActiveCapture::Stream(mut stream) => {
                stream.stop();
                commit_buffered(&self.config, &buffer, writer, &output_path).await
            }
            ActiveCapture::Synthetic => {
                commit_buffered(&self.config, &buffer, writer, &output_path).await
            }
            ActiveCapture::Process(mut process) => {
                // The process writes the output file itself; the (empty)
                // frame buffer has nothing to finalize.
                if let Some(writer) = writer {
                    writer.cancel();
                }
                process.stop().await
            }
        };

        match &committed {
            Some(path) => {
                tracing::info!("Recording committed ({}) -> {}", strategy, path.display());
                self.last_committed = Some(path.clone());
                self.state = SessionState::Committed { path: path.clone() };
            }
            None => {
                tracing::warn!("Session produced no recording");
                self.state = SessionState::Failed;
            }
        }

        committed
    }

    /// Release every session resource and the audio driver handle.
    ///
    /// Idempotent, safe to call after or instead of `stop`, and never
    /// fails; each teardown step tolerates already-released state.
    pub fn cleanup(&mut self) {
        if let Some(session) = self.session.take() {
            session.buffer.set_recording(false);
            if let Some(writer) = &session.writer {
                writer.cancel();
            }
            match session.capture {
                ActiveCapture::Stream(mut stream) => stream.stop(),
                ActiveCapture::Process(mut process) => process.kill(),
                ActiveCapture::Synthetic => {}
            }
            tracing::debug!("Session resources released");
        }
        self.engine.close();
        self.state = SessionState::Idle;
    }

    /// List available audio input devices
    pub fn list_input_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        self.engine.list_input_devices()
    }

    /// Current session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether a session is currently active
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Strategy of the active session, if any
    pub fn strategy(&self) -> Option<StrategyKind> {
        self.session.as_ref().map(|s| s.strategy)
    }

    /// Resolved recordings directory
    pub fn recordings_dir(&self) -> &std::path::Path {
        &self.recordings_dir
    }
}

/// Commit a buffer-backed session: finalize the checkpoint when one is
/// live, otherwise (or when finalize fails) save directly from memory.
async fn commit_buffered(
    config: &Config,
    buffer: &FrameBuffer,
    writer: Option<CheckpointWriter>,
    output_path: &std::path::Path,
) -> Option<PathBuf> {
    if let Some(writer) = writer {
        match writer.finalize().await {
            Ok(path) => return Some(path),
            Err(e) => {
                tracing::warn!("Checkpoint finalize failed, saving directly: {}", e);
            }
        }
    }

    let snapshot = buffer.snapshot();
    if snapshot.is_empty() {
        tracing::warn!("No frames captured, nothing to save");
        return None;
    }

    match wav::write_snapshot(
        output_path,
        config.audio.sample_rate,
        config.audio.channels,
        &snapshot,
    ) {
        Ok(()) => Some(output_path.to_path_buf()),
        Err(e) => {
            tracing::error!("Direct save failed: {}", e);
            None
        }
    }
}
