//! Recordings directory layout and path safety
//!
//! Naming convention inside the recordings root:
//! - committed outputs:  `recording-{timestamp}.wav`
//! - live checkpoints:   `recording-{timestamp}.checkpoint.wav`
//! - recovered orphans:  `recording-{timestamp}-recovered.wav`
//!
//! The external capture process receives a path as a command argument, so
//! everything handed to it is validated here first: inside the recordings
//! root, a .wav extension, and no shell metacharacters in the filename.

use crate::error::CaptureError;
use std::path::{Component, Path, PathBuf};

/// Marker suffix distinguishing a live checkpoint from a committed output.
pub const CHECKPOINT_SUFFIX: &str = ".checkpoint.wav";

/// Suffix for orphaned checkpoints promoted by the recovery scanner.
pub const RECOVERED_SUFFIX: &str = "-recovered.wav";

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Create the recordings directory with owner-only permissions.
pub fn ensure_recordings_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIR_MODE))?;
    }
    Ok(())
}

/// Generate a timestamped output path inside the recordings directory.
pub fn timestamped_output(dir: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("recording-{}.wav", timestamp))
}

/// Derive the checkpoint path for an output path
/// (`recording-X.wav` -> `recording-X.checkpoint.wav`).
pub fn checkpoint_for(output: &Path) -> PathBuf {
    output.with_extension("checkpoint.wav")
}

/// Derive the recovered name for an orphaned checkpoint
/// (`recording-X.checkpoint.wav` -> `recording-X-recovered.wav`).
pub fn recovered_for(checkpoint: &Path) -> Option<PathBuf> {
    let name = checkpoint.file_name()?.to_str()?;
    let base = name.strip_suffix(CHECKPOINT_SUFFIX)?;
    Some(checkpoint.with_file_name(format!("{}{}", base, RECOVERED_SUFFIX)))
}

/// Check whether a path follows the checkpoint naming convention.
pub fn is_checkpoint(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(CHECKPOINT_SUFFIX))
        .unwrap_or(false)
}

/// Characters never allowed in a filename passed to the capture process.
const FORBIDDEN_CHARS: &[char] = &[
    ';', '&', '|', '$', '<', '>', '`', '\'', '"', '\\', '*', '?', '(', ')', '{', '}', '[', ']',
    '!', '#', '~', '\n', '\r', '\t',
];

/// Validate an output path before it is passed to the capture subprocess.
///
/// Rejects paths that escape the recordings root, non-.wav extensions, and
/// filenames containing shell metacharacters or whitespace. Returns the
/// canonicalized absolute path on success.
pub fn validate_external_output(path: &Path, root: &Path) -> Result<PathBuf, CaptureError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CaptureError::InvalidOutputPath(path.display().to_string()))?;

    if !file_name.ends_with(".wav") {
        return Err(CaptureError::InvalidOutputPath(format!(
            "{}: not a .wav file",
            path.display()
        )));
    }

    if file_name.chars().any(|c| {
        FORBIDDEN_CHARS.contains(&c) || c.is_whitespace() || c.is_control()
    }) {
        return Err(CaptureError::InvalidOutputPath(format!(
            "{}: filename contains forbidden characters",
            path.display()
        )));
    }

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(CaptureError::InvalidOutputPath(format!(
            "{}: path traversal rejected",
            path.display()
        )));
    }

    // Canonicalize the parent (which must exist) and re-check containment,
    // so symlinks cannot smuggle the file outside the root.
    let canonical_root = root
        .canonicalize()
        .map_err(|e| CaptureError::InvalidOutputPath(format!("{}: {}", root.display(), e)))?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(root);
    let canonical_parent = parent
        .canonicalize()
        .map_err(|e| CaptureError::InvalidOutputPath(format!("{}: {}", parent.display(), e)))?;

    if !canonical_parent.starts_with(&canonical_root) {
        return Err(CaptureError::InvalidOutputPath(format!(
            "{}: outside recordings directory",
            path.display()
        )));
    }

    Ok(canonical_parent.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamped_output_naming() {
        let path = timestamped_output(Path::new("recordings"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("recording-"));
        assert!(name.ends_with(".wav"));
        assert!(!name.contains(".checkpoint."));
    }

    #[test]
    fn test_checkpoint_path_derivation() {
        let output = Path::new("recordings/recording-20260830-120000.wav");
        let checkpoint = checkpoint_for(output);
        assert_eq!(
            checkpoint,
            Path::new("recordings/recording-20260830-120000.checkpoint.wav")
        );
        assert!(is_checkpoint(&checkpoint));
        assert!(!is_checkpoint(output));
    }

    #[test]
    fn test_recovered_path_derivation() {
        let checkpoint = Path::new("recordings/recording-20260830-120000.checkpoint.wav");
        let recovered = recovered_for(checkpoint).unwrap();
        assert_eq!(
            recovered,
            Path::new("recordings/recording-20260830-120000-recovered.wav")
        );
        assert!(!is_checkpoint(&recovered));
    }

    #[test]
    fn test_recovered_for_non_checkpoint_is_none() {
        assert!(recovered_for(Path::new("recordings/recording-x.wav")).is_none());
    }

    #[test]
    fn test_validate_accepts_path_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-test.wav");
        let validated = validate_external_output(&path, dir.path()).unwrap();
        assert!(validated.is_absolute());
        assert!(validated.ends_with("recording-test.wav"));
    }

    #[test]
    fn test_validate_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("..").join("escape.wav");
        assert!(validate_external_output(&path, dir.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let path = other.path().join("outside.wav");
        assert!(validate_external_output(&path, dir.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_non_wav_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.mp3");
        assert!(validate_external_output(&path, dir.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_shell_metacharacters() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["a;b.wav", "a|b.wav", "a$(x).wav", "a b.wav", "a`x`.wav"] {
            let path = dir.path().join(bad);
            assert!(
                validate_external_output(&path, dir.path()).is_err(),
                "{} should be rejected",
                bad
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_recordings_dir_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let recordings = dir.path().join("recordings");
        ensure_recordings_dir(&recordings).unwrap();

        let mode = std::fs::metadata(&recordings)
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o700);
    }
}
