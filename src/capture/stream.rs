//! Native input stream capture via cpal
//!
//! Primary capture strategy: a cpal input stream whose driver callback
//! appends each delivered chunk to the shared frame buffer. Works with
//! PipeWire, PulseAudio, and ALSA backends.
//!
//! Note: cpal::Stream is not Send, so the stream lives on a dedicated
//! thread and is controlled via a command channel. Stream construction
//! happens on that thread too; a readiness channel reports back whether the
//! device actually opened, so a failure here falls through to the next
//! capture strategy instead of being logged and lost.

use crate::audio::{AudioFrame, FrameBuffer};
use crate::config::AudioConfig;
use crate::error::CaptureError;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Commands sent to the capture thread
enum StreamCommand {
    Stop(mpsc::Sender<()>),
}

/// Handle to a running native input stream
pub struct NativeStream {
    cmd_tx: Option<mpsc::Sender<StreamCommand>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl NativeStream {
    /// Open an input stream and start feeding the frame buffer.
    ///
    /// Validates that the device opens and the stream starts before
    /// returning; any failure is reported as a `CaptureError` so the
    /// caller can fall through to the next strategy.
    pub fn open(
        host: &cpal::Host,
        config: &AudioConfig,
        buffer: Arc<FrameBuffer>,
    ) -> Result<Self, CaptureError> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let device = if config.device == "default" {
            host.default_input_device()
                .ok_or_else(|| CaptureError::DeviceNotFound("default".to_string()))?
        } else {
            find_input_device(host, &config.device)?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("Using audio device: {}", device_name);

        let supported_config = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        let source_rate = supported_config.sample_rate().0;
        let source_channels = supported_config.channels() as usize;
        let sample_format = supported_config.sample_format();
        let target_rate = config.sample_rate;
        let target_channels = config.channels;
        let chunk_size = config.chunk_size;

        tracing::debug!(
            "Device config: {} Hz, {} channel(s), format: {:?}",
            source_rate,
            source_channels,
            sample_format
        );

        let (cmd_tx, cmd_rx) = mpsc::channel::<StreamCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let thread_handle = thread::spawn(move || {
            use cpal::traits::StreamTrait;

            let stream_config = cpal::StreamConfig {
                channels: supported_config.channels(),
                sample_rate: supported_config.sample_rate(),
                buffer_size: cpal::BufferSize::Fixed(chunk_size),
            };

            let err_fn: fn(cpal::StreamError) =
                |err| tracing::error!("Audio stream error: {}", err);

            let params = CallbackParams {
                buffer,
                source_rate,
                target_rate,
                source_channels,
                target_channels,
            };

            // A fixed buffer size is only a hint; retry with the driver
            // default if the device refuses it.
            let stream_result = build_for_format(
                &device,
                &stream_config,
                sample_format,
                params.clone(),
                err_fn,
            )
            .or_else(|_| {
                let fallback = cpal::StreamConfig {
                    buffer_size: cpal::BufferSize::Default,
                    ..stream_config
                };
                build_for_format(&device, &fallback, sample_format, params, err_fn)
            });

            let stream = match stream_result {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }

            let _ = ready_tx.send(Ok(()));
            tracing::debug!("Audio capture thread started");

            if let Ok(StreamCommand::Stop(ack_tx)) = cmd_rx.recv() {
                drop(stream);
                let _ = ack_tx.send(());
            }

            tracing::debug!("Audio capture thread stopped");
        });

        match ready_rx.recv_timeout(Duration::from_secs(3)) {
            Ok(Ok(())) => Ok(Self {
                cmd_tx: Some(cmd_tx),
                thread_handle: Some(thread_handle),
            }),
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                Err(CaptureError::StreamError(e))
            }
            Err(_) => Err(CaptureError::DeviceUnavailable(
                "timed out opening input stream".to_string(),
            )),
        }
    }

    /// Stop the stream and join the capture thread.
    ///
    /// Idempotent: a second call is a no-op.
    pub fn stop(&mut self) {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let (ack_tx, ack_rx) = mpsc::channel();
            if cmd_tx.send(StreamCommand::Stop(ack_tx)).is_ok() {
                if ack_rx.recv_timeout(Duration::from_secs(2)).is_err() {
                    tracing::warn!("Capture thread did not acknowledge stop");
                }
            }
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Clone)]
struct CallbackParams {
    buffer: Arc<FrameBuffer>,
    source_rate: u32,
    target_rate: u32,
    source_channels: usize,
    target_channels: u16,
}

fn build_for_format(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: cpal::SampleFormat,
    params: CallbackParams,
    err_fn: impl Fn(cpal::StreamError) + Send + Clone + 'static,
) -> Result<cpal::Stream, CaptureError> {
    match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, params, err_fn),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, params, err_fn),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, params, err_fn),
        other => Err(CaptureError::FormatUnsupported(format!("{:?}", other))),
    }
}

/// Build an input stream for a specific sample type
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    params: CallbackParams,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    let CallbackParams {
        buffer,
        source_rate,
        target_rate,
        source_channels,
        target_channels,
    } = params;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let as_f32: Vec<f32> = data
                    .iter()
                    .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                    .collect();

                let remixed = remix(&as_f32, source_channels, target_channels);
                let resampled = if source_rate != target_rate {
                    resample_interleaved(&remixed, target_channels, source_rate, target_rate)
                } else {
                    remixed
                };

                let samples: Vec<i16> = resampled
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect();

                // append is gated on the recording flag; late callbacks
                // after stop are dropped here.
                buffer.append(AudioFrame::new(samples));
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;

    Ok(stream)
}

/// Find an audio input device by name with flexible matching:
/// exact, then case-insensitive, then substring.
fn find_input_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, CaptureError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
        .collect();

    let search_lower = device_name.to_lowercase();

    let matched = devices
        .iter()
        .position(|d| d.name().map(|n| n == device_name).unwrap_or(false))
        .or_else(|| {
            devices
                .iter()
                .position(|d| d.name().map(|n| n.to_lowercase() == search_lower).unwrap_or(false))
        })
        .or_else(|| {
            devices.iter().position(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&search_lower))
                    .unwrap_or(false)
            })
        });

    match matched {
        Some(idx) => {
            let device = devices.into_iter().nth(idx).expect("index from position");
            if let Ok(name) = device.name() {
                tracing::debug!("Matched audio device: {} (searched for: {})", name, device_name);
            }
            Ok(device)
        }
        None => Err(CaptureError::DeviceNotFound(device_name.to_string())),
    }
}

/// Remix interleaved samples from the device channel count to the session's.
fn remix(data: &[f32], source_channels: usize, target_channels: u16) -> Vec<f32> {
    if source_channels == 0 || data.is_empty() {
        return Vec::new();
    }
    if source_channels == target_channels as usize {
        return data.to_vec();
    }

    match target_channels {
        1 => data
            .chunks(source_channels)
            .map(|frame| frame.iter().sum::<f32>() / source_channels as f32)
            .collect(),
        _ => data
            .chunks(source_channels)
            .flat_map(|frame| {
                let left = frame[0];
                let right = if source_channels > 1 { frame[1] } else { frame[0] };
                [left, right]
            })
            .collect(),
    }
}

/// Linear interpolation resampling, applied per channel.
fn resample_interleaved(
    data: &[f32],
    channels: u16,
    from_rate: u32,
    to_rate: u32,
) -> Vec<f32> {
    if from_rate == to_rate || data.is_empty() {
        return data.to_vec();
    }

    let channels = channels.max(1) as usize;
    let planes: Vec<Vec<f32>> = (0..channels)
        .map(|c| data.iter().skip(c).step_by(channels).copied().collect())
        .collect();
    let resampled: Vec<Vec<f32>> = planes
        .iter()
        .map(|p| resample(p, from_rate, to_rate))
        .collect();

    let out_len = resampled.iter().map(|p| p.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(out_len * channels);
    for i in 0..out_len {
        for plane in &resampled {
            out.push(plane[i]);
        }
    }
    out
}

fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.get(idx).copied().unwrap_or(0.0)
        };

        output.push(sample);
    }

    output
}
