//! cpal-backed driver: ALSA, CoreAudio, WASAPI, ASIO, JACK-via-cpal.
//!
//! Opens the host's default output device and feeds the engine from the
//! stream callback. Capture is not wired up, so the rack's audio inputs are
//! silent; event input comes from whatever the control surface queued on the
//! rack bus.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::driver::{Driver, DriverConfig, EngineType};
use crate::engine::EngineShared;
use crate::error::{Error, Result};

/// Largest block we expect any device to hand us.
const MAX_FRAMES: usize = 8192;

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` due to platform internals. The driver is only
/// touched from the engine's control thread, so the stream never actually
/// crosses threads; it lives until `stop` or drop.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

// SAFETY: single-threaded use from the control thread (see above).
unsafe impl Send for StreamHandle {}

pub struct CpalDriver {
    host_id: cpal::HostId,
    name: &'static str,
    buffer_size: u32,
    sample_rate: f64,
    stream: Option<StreamHandle>,
}

impl CpalDriver {
    pub fn new(host_id: cpal::HostId) -> Option<Self> {
        // host handles are not portable across threads; keep the id and open
        // the host when starting
        cpal::host_from_id(host_id).ok()?;

        Some(Self {
            host_id,
            name: host_id.name(),
            buffer_size: 0,
            sample_rate: 0.0,
            stream: None,
        })
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        shared: Arc<EngineShared>,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;

        // staging buffers, preallocated so the callback never allocates
        let mut in_l = vec![0.0f32; MAX_FRAMES];
        let mut in_r = vec![0.0f32; MAX_FRAMES];
        let mut out_l = vec![0.0f32; MAX_FRAMES];
        let mut out_r = vec![0.0f32; MAX_FRAMES];

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let frames = (data.len() / channels).min(MAX_FRAMES);

                    // no capture stream: the rack sees silent inputs
                    in_l[..frames].fill(0.0);
                    in_r[..frames].fill(0.0);

                    shared.process_block(
                        &mut [&mut in_l[..frames], &mut in_r[..frames]],
                        &mut [&mut out_l[..frames], &mut out_r[..frames]],
                        frames,
                    );

                    for (i, sample) in data.iter_mut().enumerate() {
                        let channel = i % channels;
                        let frame = i / channels;
                        let value = match channel {
                            0 => out_l.get(frame).copied().unwrap_or(0.0),
                            1 => out_r.get(frame).copied().unwrap_or(0.0),
                            _ => 0.0,
                        };
                        *sample = T::from_sample(value);
                    }
                }));

                if result.is_err() {
                    // panic in a plugin: output silence rather than noise
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0);
                    }
                }
            },
            |err| {
                tracing::error!("audio stream error: {err}");
            },
            None,
        )?;

        Ok(stream)
    }
}

impl Driver for CpalDriver {
    fn engine_type(&self) -> EngineType {
        if self.name.eq_ignore_ascii_case("JACK") {
            EngineType::Jack
        } else {
            EngineType::Cpal
        }
    }

    fn name(&self) -> &str {
        self.name
    }

    fn start(
        &mut self,
        shared: Arc<EngineShared>,
        client_name: &str,
        config: &DriverConfig,
    ) -> Result<()> {
        tracing::debug!(client_name, host = self.name, "cpal driver start");

        if self.stream.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let host = cpal::host_from_id(self.host_id)
            .map_err(|_| Error::InvalidArgument(format!("audio host {} unavailable", self.name)))?;
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::InvalidArgument("no output device available".into()))?;
        let default_config = device.default_output_config()?;

        let mut stream_config: cpal::StreamConfig = default_config.clone().into();
        if config.preferred_buffer_size > 0 {
            stream_config.buffer_size = cpal::BufferSize::Fixed(config.preferred_buffer_size);
        }

        self.sample_rate = stream_config.sample_rate.0 as f64;
        self.buffer_size = match config.preferred_buffer_size {
            0 => 512,
            n => n,
        };
        shared.set_geometry(self.buffer_size, self.sample_rate);

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => {
                self.build_stream::<f32>(&device, &stream_config, shared)?
            }
            cpal::SampleFormat::I16 => {
                self.build_stream::<i16>(&device, &stream_config, shared)?
            }
            cpal::SampleFormat::U16 => {
                self.build_stream::<u16>(&device, &stream_config, shared)?
            }
            format => {
                return Err(Error::InvalidArgument(format!(
                    "unsupported sample format: {format:?}"
                )));
            }
        };

        stream.play()?;
        self.stream = Some(StreamHandle(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        tracing::debug!(host = self.name, "cpal driver stop");
        self.stream = None;
        self.buffer_size = 0;
        self.sample_rate = 0.0;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
