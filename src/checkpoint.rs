//! Periodic checkpoint flushing
//!
//! While a session captures, a timer task rewrites the full frame snapshot
//! to a `.checkpoint.wav` file every interval. Rewriting the whole snapshot
//! instead of appending keeps every checkpoint independently openable and
//! avoids any append-repair logic after a crash.
//!
//! The flush body is synchronous and operates on a snapshot copied out of
//! the buffer lock, so disk writes never block the capture callback and a
//! cancel landing mid-write only takes effect at the next timer sleep.

use crate::audio::{paths, wav, FrameBuffer};
use crate::error::CheckpointError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Owns the checkpoint timer task for one recording session.
pub struct CheckpointWriter {
    checkpoint_path: PathBuf,
    output_path: PathBuf,
    sample_rate: u32,
    channels: u16,
    buffer: Arc<FrameBuffer>,
    cancel: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl CheckpointWriter {
    /// Start periodic checkpointing for the session.
    ///
    /// Returns None when the interval is zero (checkpointing disabled).
    /// The first flush happens `interval_secs` after this call.
    pub fn start(
        buffer: Arc<FrameBuffer>,
        output_path: &Path,
        sample_rate: u32,
        channels: u16,
        interval_secs: u64,
    ) -> Option<Self> {
        if interval_secs == 0 {
            return None;
        }

        let checkpoint_path = paths::checkpoint_for(output_path);
        let cancel = Arc::new(AtomicBool::new(false));

        let task = {
            let buffer = buffer.clone();
            let cancel = cancel.clone();
            let path = checkpoint_path.clone();
            let interval = Duration::from_secs(interval_secs);

            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    if cancel.load(Ordering::SeqCst) || !buffer.is_recording() {
                        break;
                    }
                    match flush_snapshot(&buffer, &path, sample_rate, channels) {
                        Ok(true) => tracing::debug!("Checkpoint flushed: {}", path.display()),
                        Ok(false) => tracing::debug!("Checkpoint skipped (no frames yet)"),
                        Err(e) => {
                            // Disk full or permissions; the session keeps
                            // capturing in memory and we retry next tick.
                            tracing::warn!("Checkpoint flush failed: {}", e);
                        }
                    }
                }
            })
        };

        tracing::info!(
            "Checkpointing every {}s -> {}",
            interval_secs,
            checkpoint_path.display()
        );

        Some(Self {
            checkpoint_path,
            output_path: output_path.to_path_buf(),
            sample_rate,
            channels,
            buffer,
            cancel,
            task: Some(task),
        })
    }

    /// Path of the live checkpoint file
    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Cancel the pending timer without flushing. Safe from any thread and
    /// after finalize; used by cleanup.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(task) = &self.task {
            // The flush body has no await points, so this can only land
            // during the timer sleep; an in-flight flush completes.
            task.abort();
        }
    }

    /// Perform the terminal flush and rename the checkpoint into the
    /// committed output path.
    ///
    /// Cancels the timer first, writes one last whole snapshot (capturing
    /// frames appended since the previous flush), then renames. A rename or
    /// write failure is returned so the caller can fall back to a direct
    /// save from the in-memory buffer.
    pub async fn finalize(mut self) -> Result<PathBuf, CheckpointError> {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }

        flush_snapshot(
            &self.buffer,
            &self.checkpoint_path,
            self.sample_rate,
            self.channels,
        )?;

        if !self.checkpoint_path.exists() {
            return Err(CheckpointError::Write(
                "no checkpoint data to finalize".to_string(),
            ));
        }

        std::fs::rename(&self.checkpoint_path, &self.output_path).map_err(|e| {
            CheckpointError::Rename {
                from: self.checkpoint_path.display().to_string(),
                to: self.output_path.display().to_string(),
                source: e,
            }
        })?;

        tracing::info!("Checkpoint finalized -> {}", self.output_path.display());
        Ok(self.output_path)
    }
}

/// Write the entire current snapshot to `path`.
///
/// Returns Ok(false) when the snapshot was empty and the write skipped;
/// the caller still reschedules in that case.
fn flush_snapshot(
    buffer: &FrameBuffer,
    path: &Path,
    sample_rate: u32,
    channels: u16,
) -> Result<bool, CheckpointError> {
    let snapshot = buffer.snapshot();
    if snapshot.is_empty() {
        return Ok(false);
    }
    wav::write_snapshot(path, sample_rate, channels, &snapshot)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;

    fn recording_buffer(frames: &[&[i16]]) -> Arc<FrameBuffer> {
        let buffer = Arc::new(FrameBuffer::new());
        buffer.set_recording(true);
        for f in frames {
            buffer.append(AudioFrame::new(f.to_vec()));
        }
        buffer
    }

    #[tokio::test]
    async fn test_disabled_when_interval_zero() {
        let buffer = recording_buffer(&[&[1, 2]]);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("recording-test.wav");

        assert!(CheckpointWriter::start(buffer, &output, 44100, 1, 0).is_none());
    }

    #[tokio::test]
    async fn test_finalize_renames_checkpoint() {
        let buffer = recording_buffer(&[&[1, 2], &[3, 4]]);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("recording-test.wav");

        let writer =
            CheckpointWriter::start(buffer, &output, 44100, 1, 30).expect("writer started");
        let checkpoint = writer.checkpoint_path().to_path_buf();
        let committed = writer.finalize().await.unwrap();

        assert_eq!(committed, output);
        assert!(output.exists());
        assert!(!checkpoint.exists());
    }

    #[tokio::test]
    async fn test_finalize_with_empty_buffer_fails() {
        let buffer = Arc::new(FrameBuffer::new());
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("recording-test.wav");

        let writer =
            CheckpointWriter::start(buffer, &output, 44100, 1, 30).expect("writer started");
        assert!(writer.finalize().await.is_err());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_flush_skips_empty_snapshot() {
        let buffer = Arc::new(FrameBuffer::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-test.checkpoint.wav");

        assert!(!flush_snapshot(&buffer, &path, 44100, 1).unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cancel_is_safe_twice() {
        let buffer = recording_buffer(&[&[1]]);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("recording-test.wav");

        let writer =
            CheckpointWriter::start(buffer, &output, 44100, 1, 30).expect("writer started");
        writer.cancel();
        writer.cancel();
    }
}
