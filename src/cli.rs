// Command-line interface definitions for memovox
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "memovox")]
#[command(author, version, about = "Crash-safe voice memo capture for Linux")]
#[command(long_about = "
Memovox records voice memos to WAV files and checkpoints the captured audio
to disk while recording, so a crash or power loss costs at most one
checkpoint interval of audio.

When the microphone is unavailable it falls back to recording through an
ffmpeg subprocess, and as a last resort generates placeholder audio so the
rest of a pipeline can still be exercised.

USAGE:
  memovox record        Start recording; press Ctrl+C to stop and save.
  memovox recover       Promote orphaned checkpoints left by a crash.
  memovox devices       List audio input devices.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override audio input device ("default" uses the system default)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Override checkpoint interval in seconds (0 disables checkpointing)
    #[arg(long, value_name = "SECS")]
    pub checkpoint_interval: Option<u64>,

    /// Override the recordings directory
    #[arg(long, value_name = "DIR")]
    pub recordings_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a voice memo (default if no command specified)
    Record {
        /// Stop automatically after this many seconds
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,
    },

    /// Recover orphaned checkpoints left behind by a crash
    Recover,

    /// List available audio input devices
    Devices,

    /// Show current configuration
    Config,
}
