//! Shared frame buffer for the active recording session
//!
//! One capture producer (the driver callback) and one checkpoint consumer
//! (the flush timer) share this buffer. A single mutex guards both the frame
//! list and the `recording` flag, so a callback can never append after the
//! session has logically stopped. Snapshots are copied out of the lock before
//! any disk I/O happens.

use std::sync::Mutex;

/// One chunk of captured PCM samples (16-bit signed, interleaved).
///
/// Immutable after append; the buffer only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Default)]
struct BufferInner {
    frames: Vec<AudioFrame>,
    recording: bool,
}

/// Thread-safe, append-only accumulator of captured audio frames.
///
/// Insertion order defines the temporal order of the recording.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    inner: Mutex<BufferInner>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame if the session is still recording.
    ///
    /// Returns false (and drops the frame) once recording has been cleared,
    /// closing the window where a late driver callback could extend a
    /// recording that has already stopped.
    pub fn append(&self, frame: AudioFrame) -> bool {
        let mut inner = self.lock();
        if !inner.recording {
            return false;
        }
        inner.frames.push(frame);
        true
    }

    /// Copy out all frames accumulated so far.
    ///
    /// The copy happens under the lock; callers do their I/O on the returned
    /// snapshot without blocking the capture callback.
    pub fn snapshot(&self) -> Vec<AudioFrame> {
        self.lock().frames.clone()
    }

    /// Number of frames currently buffered
    pub fn frame_count(&self) -> usize {
        self.lock().frames.len()
    }

    /// Flip the recording flag. Setting it false before teardown guarantees
    /// any concurrent observer sees "not recording" first.
    pub fn set_recording(&self, recording: bool) {
        self.lock().recording = recording;
    }

    pub fn is_recording(&self) -> bool {
        self.lock().recording
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferInner> {
        // A poisoned lock means a panic mid-append; the data is still a
        // consistent prefix of the recording, so keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
