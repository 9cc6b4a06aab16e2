//! Memovox: crash-safe voice memo capture for Linux
//!
//! This library provides the core functionality for:
//! - Capturing audio via cpal (supports PipeWire, PulseAudio, ALSA)
//! - Falling back to an ffmpeg subprocess, then to synthetic placeholder
//!   audio, when the native stream is unavailable
//! - Checkpointing in-progress recordings to disk on a timer, so a crash
//!   loses at most one interval of audio
//! - Recovering orphaned checkpoints on the next startup
//!
//! # Architecture
//!
//! ```text
//!                  ┌─────────────────────────────────┐
//!                  │        SessionController        │
//!                  │ Idle → Starting → Capturing →   │
//!                  │ Stopping → Committed / Failed   │
//!                  └─────────────────────────────────┘
//!                                  │
//!              ┌───────────────────┼───────────────────┐
//!              ▼                   ▼                   ▼
//!     ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//!     │ NativeStream │    │  External    │    │  Synthetic   │
//!     │    (cpal)    │    │  (ffmpeg)    │    │  Fallback    │
//!     └──────────────┘    └──────────────┘    └──────────────┘
//!              │                   │                   │
//!              ▼ frames            │ writes WAV        ▼ frames
//!     ┌──────────────┐             │          ┌──────────────┐
//!     │  FrameBuffer │◀────────────┼──────────│  (in memory) │
//!     └──────────────┘             │          └──────────────┘
//!              │                   │
//!              ▼ snapshot          │
//!     ┌──────────────────┐        │
//!     │ CheckpointWriter │        │
//!     │ .checkpoint.wav  │        │
//!     └──────────────────┘        │
//!              │ finalize (rename) │
//!              ▼                   ▼
//!        recording-{timestamp}.wav
//! ```
//!
//! Checkpoints always rewrite the whole snapshot, never append, so every
//! checkpoint on disk is an independently valid WAV. The recovery scanner
//! (`recovery::recover_orphans`) promotes leftover checkpoints to
//! `-recovered.wav` files at startup.

pub mod audio;
pub mod capture;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod recovery;
pub mod session;
pub mod state;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{MemovoxError, Result};
pub use session::SessionController;
pub use state::SessionState;
