//! Audio data model and file plumbing
//!
//! Frames are opaque 16-bit PCM chunks; this module owns the shared frame
//! buffer, the WAV container I/O, and the recordings-directory layout.

pub mod buffer;
pub mod paths;
pub mod wav;

pub use buffer::{AudioFrame, FrameBuffer};
