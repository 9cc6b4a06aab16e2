//! Orphaned checkpoint recovery
//!
//! A process killed mid-session leaves a `.checkpoint.wav` behind. This
//! scanner runs once at startup (or on demand via `memovox recover`),
//! promotes every valid orphan to a `-recovered.wav` file, and leaves
//! anything it cannot parse exactly where it found it for manual
//! inspection. It never runs on the hot path of a live session.

use crate::audio::{paths, wav};
use std::path::{Path, PathBuf};

/// Scan `dir` for orphaned checkpoints and promote the valid ones.
///
/// A checkpoint is valid when its WAV header parses and it contains at
/// least one sample. Corrupt, unreadable, and empty files are skipped in
/// place; nothing is ever deleted. Returns the recovered paths.
pub fn recover_orphans(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Recovery scan skipped for {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut recovered = Vec::new();

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !paths::is_checkpoint(&path) {
            continue;
        }

        match wav::sample_count(&path) {
            Ok(0) => {
                tracing::debug!("Skipping empty checkpoint: {}", path.display());
                continue;
            }
            Ok(count) => {
                tracing::info!(
                    "Found orphaned checkpoint with {} samples: {}",
                    count,
                    path.display()
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable checkpoint {} (left in place): {}",
                    path.display(),
                    e
                );
                continue;
            }
        }

        let Some(target) = paths::recovered_for(&path) else {
            continue;
        };

        match std::fs::rename(&path, &target) {
            Ok(()) => {
                tracing::info!("Recovered recording: {}", target.display());
                recovered.push(target);
            }
            Err(e) => {
                tracing::warn!("Failed to recover {}: {}", path.display(), e);
            }
        }
    }

    recovered
}
