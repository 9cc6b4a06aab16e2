//! WAV container I/O
//!
//! All recording artifacts (checkpoints, committed outputs, recovered files)
//! are plain uncompressed RIFF/WAV with 16-bit signed samples. The format
//! needs no encoder state, so a whole-buffer rewrite is one linear pass with
//! a regenerable header.
//!
//! Writes go through a temp file in the target directory followed by a
//! rename, so a concurrent reader (or the recovery scanner after a crash)
//! never observes a truncated container.

use crate::audio::buffer::AudioFrame;
use crate::error::CheckpointError;
use std::path::Path;

/// Owner-only permissions applied to every written recording file.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Write the entire snapshot to `path` as a fresh WAV container.
///
/// The previous file at `path`, if any, is replaced atomically.
pub fn write_snapshot(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    frames: &[AudioFrame],
) -> Result<(), CheckpointError> {
    let dir = path.parent().ok_or_else(|| {
        CheckpointError::Write(format!("{} has no parent directory", path.display()))
    })?;

    let temp = tempfile::Builder::new()
        .prefix(".memovox-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    let temp_path = temp.into_temp_path();

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&temp_path, spec)?;
    for frame in frames {
        for &sample in frame.samples() {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;

    apply_file_permissions(&temp_path)?;

    temp_path.persist(path).map_err(|e| CheckpointError::Rename {
        from: "<temp>".to_string(),
        to: path.display().to_string(),
        source: e.error,
    })?;

    Ok(())
}

/// Total sample count of a WAV file, or an error if the container header
/// cannot be parsed. Used by the recovery scanner to validate orphans.
pub fn sample_count(path: &Path) -> Result<u32, hound::Error> {
    let reader = hound::WavReader::open(path)?;
    Ok(reader.len())
}

/// Read all samples from a WAV file as i16.
pub fn read_samples(path: &Path) -> Result<Vec<i16>, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    reader.samples::<i16>().collect()
}

#[cfg(unix)]
fn apply_file_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE))
}

#[cfg(not(unix))]
fn apply_file_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames_of(values: &[i16]) -> Vec<AudioFrame> {
        values
            .iter()
            .map(|&v| AudioFrame::new(vec![v, v, v, v]))
            .collect()
    }

    #[test]
    fn test_write_snapshot_produces_valid_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-test.wav");

        write_snapshot(&path, 44100, 1, &frames_of(&[1, 2, 3])).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 12);
    }

    #[test]
    fn test_rewrite_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-test.wav");

        write_snapshot(&path, 44100, 1, &frames_of(&[1])).unwrap();
        write_snapshot(&path, 44100, 1, &frames_of(&[1, 2])).unwrap();

        assert_eq!(sample_count(&path).unwrap(), 8);
    }

    #[test]
    fn test_sample_order_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-test.wav");

        let frames = vec![
            AudioFrame::new(vec![1, 2]),
            AudioFrame::new(vec![3, 4]),
            AudioFrame::new(vec![5]),
        ];
        write_snapshot(&path, 16000, 1, &frames).unwrap();

        assert_eq!(read_samples(&path).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-test.wav");
        write_snapshot(&path, 44100, 1, &frames_of(&[1])).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-test.wav");
        write_snapshot(&path, 44100, 1, &frames_of(&[1])).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
