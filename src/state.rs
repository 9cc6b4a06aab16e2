//! Session state machine for memovox
//!
//! Defines the states a recording session moves through:
//! Idle → Starting → Capturing → Stopping → {Committed | Failed}
//!
//! `Idle`, `Committed` and `Failed` are resting states; a new `start()` can
//! be issued from any of them. `Capturing` is the only state in which the
//! capture producer may append frames to the buffer.

use std::path::PathBuf;
use std::time::Instant;

/// Recording session state
#[derive(Debug, Clone)]
pub enum SessionState {
    /// No session active, ready to start
    Idle,

    /// Working through the capture strategy chain
    Starting,

    /// Capture running, frames being appended
    Capturing {
        /// When capture started
        started_at: Instant,
    },

    /// Stop requested, teardown in progress
    Stopping,

    /// Session finished with a committed output file
    Committed {
        /// Path of the committed recording
        path: PathBuf,
    },

    /// Session finished without producing a recording
    Failed,
}

impl SessionState {
    /// Create a new idle state
    pub fn new() -> Self {
        SessionState::Idle
    }

    /// Check if a session is currently capturing
    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionState::Capturing { .. })
    }

    /// Check if a new session can be started from this state
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Committed { .. } | SessionState::Failed
        )
    }

    /// Get capture duration if currently capturing
    pub fn capture_duration(&self) -> Option<std::time::Duration> {
        match self {
            SessionState::Capturing { started_at } => Some(started_at.elapsed()),
            _ => None,
        }
    }

    /// Get the committed output path, if any
    pub fn committed_path(&self) -> Option<&PathBuf> {
        match self {
            SessionState::Committed { path } => Some(path),
            _ => None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Capturing { started_at } => {
                write!(f, "Capturing ({:.1}s)", started_at.elapsed().as_secs_f32())
            }
            SessionState::Stopping => write!(f, "Stopping"),
            SessionState::Committed { path } => write!(f, "Committed: {}", path.display()),
            SessionState::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_idle() {
        let state = SessionState::new();
        assert!(state.can_start());
        assert!(!state.is_capturing());
    }

    #[test]
    fn test_capturing_state() {
        let state = SessionState::Capturing {
            started_at: Instant::now(),
        };
        assert!(state.is_capturing());
        assert!(!state.can_start());
        assert!(state.capture_duration().is_some());
    }

    #[test]
    fn test_idle_has_no_duration() {
        let state = SessionState::Idle;
        assert!(state.capture_duration().is_none());
    }

    #[test]
    fn test_resting_states_can_start() {
        assert!(SessionState::Idle.can_start());
        assert!(SessionState::Failed.can_start());
        assert!(SessionState::Committed {
            path: PathBuf::from("recordings/recording-x.wav"),
        }
        .can_start());
    }

    #[test]
    fn test_transitional_states_cannot_start() {
        assert!(!SessionState::Starting.can_start());
        assert!(!SessionState::Stopping.can_start());
    }

    #[test]
    fn test_committed_path() {
        let path = PathBuf::from("recordings/recording-20260830-120000.wav");
        let state = SessionState::Committed { path: path.clone() };
        assert_eq!(state.committed_path(), Some(&path));
        assert_eq!(SessionState::Idle.committed_path(), None);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", SessionState::Idle), "Idle");
        let state = SessionState::Capturing {
            started_at: Instant::now(),
        };
        assert!(format!("{}", state).starts_with("Capturing"));
    }
}
