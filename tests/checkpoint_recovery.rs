//! Checkpoint and recovery integration tests
//!
//! These exercise the full flush / finalize / recover cycle against real
//! files in a temp directory, with no audio hardware involved. Timings use
//! generous margins so they hold on slow CI machines.

use memovox::audio::{wav, AudioFrame, FrameBuffer};
use memovox::checkpoint::CheckpointWriter;
use memovox::recovery::recover_orphans;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const CHANNELS: u16 = 1;

/// Buffer in recording state, pre-loaded with the given frames
fn recording_buffer(frames: &[&[i16]]) -> Arc<FrameBuffer> {
    let buffer = Arc::new(FrameBuffer::new());
    buffer.set_recording(true);
    for samples in frames {
        buffer.append(AudioFrame::new(samples.to_vec()));
    }
    buffer
}

fn read_all(path: &Path) -> Vec<i16> {
    wav::read_samples(path).expect("committed file must be a valid WAV")
}

fn checkpoint_files(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(".checkpoint.wav"))
        .collect()
}

// ============================================================================
// Finalize semantics
// ============================================================================

#[tokio::test]
async fn finalize_captures_frames_appended_after_last_flush() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("recording-20260830-120000.wav");

    let buffer = recording_buffer(&[&[1, 1, 1], &[2, 2, 2]]);
    let writer = CheckpointWriter::start(buffer.clone(), &output, SAMPLE_RATE, CHANNELS, 30)
        .expect("writer started");

    // Simulate an earlier periodic flush that only saw the first two frames.
    let stale = buffer.snapshot();
    wav::write_snapshot(writer.checkpoint_path(), SAMPLE_RATE, CHANNELS, &stale).unwrap();

    // A frame arrives after that flush, before stop.
    buffer.append(AudioFrame::new(vec![3, 3, 3]));

    let committed = writer.finalize().await.unwrap();
    assert_eq!(committed, output);
    assert_eq!(read_all(&output), vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
}

#[tokio::test]
async fn finalize_matches_direct_save() {
    let dir = tempfile::tempdir().unwrap();
    let frames: &[&[i16]] = &[&[10, -10, 20], &[-20, 30, -30]];

    let via_writer = dir.path().join("recording-a.wav");
    let writer = CheckpointWriter::start(
        recording_buffer(frames),
        &via_writer,
        SAMPLE_RATE,
        CHANNELS,
        30,
    )
    .expect("writer started");
    writer.finalize().await.unwrap();

    let direct = dir.path().join("recording-b.wav");
    let snapshot: Vec<AudioFrame> = frames
        .iter()
        .map(|s| AudioFrame::new(s.to_vec()))
        .collect();
    wav::write_snapshot(&direct, SAMPLE_RATE, CHANNELS, &snapshot).unwrap();

    assert_eq!(
        std::fs::read(&via_writer).unwrap(),
        std::fs::read(&direct).unwrap(),
        "checkpoint finalize and direct save must produce identical files"
    );
}

#[tokio::test]
async fn no_checkpoint_left_after_clean_finalize() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("recording-20260830-120000.wav");

    let writer = CheckpointWriter::start(
        recording_buffer(&[&[5, 5]]),
        &output,
        SAMPLE_RATE,
        CHANNELS,
        30,
    )
    .expect("writer started");
    writer.finalize().await.unwrap();

    assert!(output.exists());
    assert!(checkpoint_files(dir.path()).is_empty());
}

// ============================================================================
// Periodic flushing
// ============================================================================

#[tokio::test]
async fn periodic_flush_rewrites_whole_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("recording-20260830-120000.wav");

    let buffer = recording_buffer(&[&[1, 2, 3]]);
    let writer = CheckpointWriter::start(buffer.clone(), &output, SAMPLE_RATE, CHANNELS, 1)
        .expect("writer started");
    let checkpoint = writer.checkpoint_path().to_path_buf();

    // First tick.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let first = wav::sample_count(&checkpoint).expect("checkpoint readable after first flush");
    assert_eq!(first, 3);

    // More audio arrives; the next tick must rewrite, not append.
    buffer.append(AudioFrame::new(vec![4, 5, 6]));
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(read_all(&checkpoint), vec![1, 2, 3, 4, 5, 6]);

    writer.finalize().await.unwrap();
}

#[tokio::test]
async fn cancelled_writer_stops_flushing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("recording-20260830-120000.wav");

    let buffer = recording_buffer(&[&[1]]);
    let writer = CheckpointWriter::start(buffer.clone(), &output, SAMPLE_RATE, CHANNELS, 1)
        .expect("writer started");
    let checkpoint = writer.checkpoint_path().to_path_buf();

    writer.cancel();
    buffer.append(AudioFrame::new(vec![2]));
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // No flush ever ran; the session would fall back to a direct save.
    assert!(!checkpoint.exists());
}

// ============================================================================
// Orphan recovery
// ============================================================================

#[tokio::test]
async fn recovery_promotes_valid_and_skips_broken_orphans() {
    let dir = tempfile::tempdir().unwrap();

    // A valid orphan from a crashed session.
    let valid = dir.path().join("recording-20260830-110000.checkpoint.wav");
    wav::write_snapshot(
        &valid,
        SAMPLE_RATE,
        CHANNELS,
        &[AudioFrame::new(vec![7, 8, 9])],
    )
    .unwrap();

    // A header-only checkpoint with zero samples.
    let empty = dir.path().join("recording-20260830-110500.checkpoint.wav");
    wav::write_snapshot(&empty, SAMPLE_RATE, CHANNELS, &[AudioFrame::new(vec![])]).unwrap();

    // A truncated write that never became a valid WAV.
    let corrupt = dir.path().join("recording-20260830-111000.checkpoint.wav");
    std::fs::write(&corrupt, b"RIFF garbage").unwrap();

    // A committed recording that must not be touched.
    let committed = dir.path().join("recording-20260830-100000.wav");
    wav::write_snapshot(
        &committed,
        SAMPLE_RATE,
        CHANNELS,
        &[AudioFrame::new(vec![1])],
    )
    .unwrap();

    let recovered = recover_orphans(dir.path());

    assert_eq!(recovered.len(), 1, "only the valid orphan is promoted");
    assert_eq!(
        recovered[0],
        dir.path().join("recording-20260830-110000-recovered.wav")
    );
    assert_eq!(read_all(&recovered[0]), vec![7, 8, 9]);

    // Skipped files stay exactly where they were; nothing is deleted.
    assert!(!valid.exists());
    assert!(empty.exists());
    assert!(corrupt.exists());
    assert!(committed.exists());
}

#[tokio::test]
async fn recovery_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let orphan = dir.path().join("recording-20260830-110000.checkpoint.wav");
    wav::write_snapshot(
        &orphan,
        SAMPLE_RATE,
        CHANNELS,
        &[AudioFrame::new(vec![1, 2])],
    )
    .unwrap();

    assert_eq!(recover_orphans(dir.path()).len(), 1);
    assert!(recover_orphans(dir.path()).is_empty());
}

#[tokio::test]
async fn crash_simulation_full_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("recording-20260830-120000.wav");

    // Session captures and flushes once, then the process "dies": the
    // writer is dropped without finalize.
    let buffer = recording_buffer(&[&[11, 12], &[13, 14]]);
    let writer = CheckpointWriter::start(buffer.clone(), &output, SAMPLE_RATE, CHANNELS, 1)
        .expect("writer started");
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let checkpoint = writer.checkpoint_path().to_path_buf();
    writer.cancel();
    drop(writer);

    assert!(checkpoint.exists(), "orphan left behind by the crash");
    assert!(!output.exists());

    // Next startup recovers everything flushed before the crash.
    let recovered = recover_orphans(dir.path());
    assert_eq!(recovered.len(), 1);
    assert_eq!(read_all(&recovered[0]), vec![11, 12, 13, 14]);
    assert!(!checkpoint.exists());
}
