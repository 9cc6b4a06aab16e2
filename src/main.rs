//! Memovox - Crash-safe voice memo capture for Linux
//!
//! Run `memovox` or `memovox record` to start a recording; Ctrl+C stops it
//! and commits the WAV file. `memovox recover` promotes checkpoints left
//! behind by a crash.

use clap::Parser;
use memovox::capture::CaptureEngine;
use memovox::cli::{Cli, Commands};
use memovox::config::Config;
use memovox::session::SessionController;
use memovox::{config, recovery};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("memovox={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(device) = cli.device {
        config.audio.device = device;
    }
    if let Some(interval) = cli.checkpoint_interval {
        config.checkpoint.interval_secs = interval;
    }
    if let Some(dir) = cli.recordings_dir {
        config.recordings_dir = Some(dir);
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Record { duration: None }) {
        Commands::Record { duration } => {
            record(config, duration).await?;
        }

        Commands::Recover => {
            run_recover(&config);
        }

        Commands::Devices => {
            list_devices()?;
        }

        Commands::Config => {
            show_config(&config);
        }
    }

    Ok(())
}

/// Record a voice memo until Ctrl+C, SIGTERM, or the duration limit.
async fn record(config: Config, duration: Option<u64>) -> anyhow::Result<()> {
    let max_secs = config.audio.max_duration_secs;
    let limit_secs = duration.map(|d| d.min(max_secs)).unwrap_or(max_secs);

    let mut controller = SessionController::new(CaptureEngine::open(), config)?;

    // Pick up anything a previous crashed run left behind before starting
    // a new session in the same directory.
    let recovered = recovery::recover_orphans(controller.recordings_dir());
    for path in &recovered {
        println!("Recovered from previous session: {}", path.display());
    }

    let planned = controller.start().await?;
    println!("Recording -> {}", planned.display());
    println!("Press Ctrl+C to stop and save.");

    let reason = wait_for_stop(limit_secs).await;
    tracing::info!("Stopping: {}", reason);

    match controller.stop().await {
        Some(path) => println!("Saved: {}", path.display()),
        None => eprintln!("No audio captured, nothing saved."),
    }

    controller.cleanup();
    Ok(())
}

/// Wait for Ctrl+C, SIGTERM (Unix), or the duration limit.
async fn wait_for_stop(limit_secs: u64) -> &'static str {
    let limit = tokio::time::sleep(Duration::from_secs(limit_secs));

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => return "interrupted",
                    _ = limit => return "duration limit reached",
                }
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => "interrupted",
            _ = sigterm.recv() => "terminated",
            _ = limit => "duration limit reached",
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => "interrupted",
            _ = limit => "duration limit reached",
        }
    }
}

/// Run the recovery scan and report what it found
fn run_recover(config: &Config) {
    let dir = config.recordings_dir();
    println!("Scanning {} for orphaned checkpoints...", dir.display());

    let recovered = recovery::recover_orphans(&dir);
    if recovered.is_empty() {
        println!("Nothing to recover.");
    } else {
        for path in &recovered {
            println!("Recovered: {}", path.display());
        }
        println!("{} recording(s) recovered.", recovered.len());
    }
}

/// List audio input devices
fn list_devices() -> anyhow::Result<()> {
    let engine = CaptureEngine::open();
    let devices = engine.list_input_devices()?;

    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }

    println!("Audio input devices:\n");
    for (index, device) in devices.iter().enumerate() {
        println!(
            "  [{}] {} ({} ch, {} Hz)",
            index, device.name, device.max_channels, device.default_sample_rate
        );
    }
    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[audio]");
    println!("  device = {:?}", config.audio.device);
    println!("  sample_rate = {}", config.audio.sample_rate);
    println!("  channels = {}", config.audio.channels);
    println!("  chunk_size = {}", config.audio.chunk_size);
    println!("  max_duration_secs = {}", config.audio.max_duration_secs);

    println!("\n[checkpoint]");
    println!("  interval_secs = {}", config.checkpoint.interval_secs);
    println!("  min_interval_secs = {}", config.checkpoint.min_interval_secs);
    println!("  max_interval_secs = {}", config.checkpoint.max_interval_secs);

    println!("\n---");
    println!("Recordings dir: {}", config.recordings_dir().display());
    println!("Config file: {}", config::Config::default_path().display());
}
