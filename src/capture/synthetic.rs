//! Synthetic placeholder capture
//!
//! Last-resort strategy for environments with no working audio subsystem at
//! all (headless CI, containers). Generates a short, clearly artificial
//! waveform with enough spectral structure that downstream consumers have
//! something real to chew on. Not silence, not speech.
//!
//! The output is fully deterministic: same config in, same samples out.

use crate::audio::{AudioFrame, FrameBuffer};
use crate::config::AudioConfig;
use crate::error::RecordingError;

/// Placeholder length in seconds
const PLACEHOLDER_SECS: f32 = 3.0;

/// Synthesize the placeholder waveform and append it to the frame buffer in
/// chunk-sized frames.
pub fn fill_buffer(config: &AudioConfig, buffer: &FrameBuffer) -> Result<(), RecordingError> {
    let samples = synthesize(config.sample_rate, config.channels, PLACEHOLDER_SECS);
    if samples.is_empty() {
        return Err(RecordingError::SynthesisFailed(
            "generated zero samples".to_string(),
        ));
    }

    let frame_len = (config.chunk_size as usize * config.channels as usize).max(1);
    let mut appended = 0usize;
    for chunk in samples.chunks(frame_len) {
        if buffer.append(AudioFrame::new(chunk.to_vec())) {
            appended += 1;
        }
    }

    if appended == 0 {
        return Err(RecordingError::SynthesisFailed(
            "buffer rejected all frames".to_string(),
        ));
    }

    tracing::debug!(
        "Synthesized {:.1}s placeholder ({} frames)",
        PLACEHOLDER_SECS,
        appended
    );
    Ok(())
}

/// Generate the placeholder: a wandering 200-300 Hz base tone with second
/// and third harmonics, a little deterministic noise, and a word-like
/// amplitude envelope with quiet gaps every second.
pub fn synthesize(sample_rate: u32, channels: u16, duration_secs: f32) -> Vec<i16> {
    let num_frames = (duration_secs * sample_rate as f32) as usize;
    let mut noise = NoiseSource::new(0x5eed);
    let mut samples = Vec::with_capacity(num_frames * channels as usize);

    for i in 0..num_frames {
        let t = i as f32 / sample_rate as f32;

        let base_freq = 200.0 + 100.0 * (2.0 * std::f32::consts::PI * 2.0 * t).sin();

        let signal = 0.6 * (2.0 * std::f32::consts::PI * base_freq * t).sin()
            + 0.3 * (2.0 * std::f32::consts::PI * base_freq * 2.0 * t).sin()
            + 0.1 * (2.0 * std::f32::consts::PI * base_freq * 3.0 * t).sin()
            + 0.05 * noise.next();

        // Quiet periods between "words"
        let segment_time = t % 1.0;
        let envelope = if !(0.1..=0.8).contains(&segment_time) {
            0.2
        } else {
            1.0
        };

        let value = (16000.0 * signal * envelope).clamp(-32767.0, 32767.0) as i16;
        for _ in 0..channels {
            samples.push(value);
        }
    }

    samples
}

/// Small deterministic noise generator (xorshift), so the placeholder is
/// reproducible without pulling in a PRNG crate.
struct NoiseSource {
    state: u32,
}

impl NoiseSource {
    fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next value in [-0.5, 0.5)
    fn next(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f32 / u32::MAX as f32) - 0.5
    }
}
