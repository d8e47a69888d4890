//! The device-less back-end.
//!
//! No audio device: a plain thread plays the role of the audio callback,
//! pacing itself by the configured block size and sample rate and feeding
//! the engine silent inputs. That keeps the block-boundary machinery (post
//! actions, geometry fan-out, time) behaving exactly as under a real driver,
//! which is what the test suites and offline use want.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};

use crate::driver::{Driver, DriverConfig, EngineType};
use crate::engine::EngineShared;
use crate::error::Result;

const DEFAULT_BUFFER_SIZE: u32 = 512;
const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct DummyDriver {
    worker: Option<Worker>,
    buffer_size: u32,
    sample_rate: f64,
}

impl DummyDriver {
    pub const NAME: &'static str = "Dummy";

    pub fn new() -> Self {
        Self {
            worker: None,
            buffer_size: 0,
            sample_rate: 0.0,
        }
    }
}

impl Default for DummyDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for DummyDriver {
    fn engine_type(&self) -> EngineType {
        EngineType::Null
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn start(
        &mut self,
        shared: Arc<EngineShared>,
        client_name: &str,
        config: &DriverConfig,
    ) -> Result<()> {
        tracing::debug!(client_name, "dummy driver start");

        self.buffer_size = match config.preferred_buffer_size {
            0 => DEFAULT_BUFFER_SIZE,
            n => n,
        };
        self.sample_rate = match config.preferred_sample_rate {
            0 => DEFAULT_SAMPLE_RATE,
            n => n as f64,
        };

        shared.set_geometry(self.buffer_size, self.sample_rate);

        let frames = self.buffer_size as usize;
        let period = Duration::from_secs_f64(frames as f64 / self.sample_rate);
        let (stop, stop_rx) = bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("dummy-audio".into())
            .spawn(move || {
                let mut in_l = vec![0.0f32; frames];
                let mut in_r = vec![0.0f32; frames];
                let mut out_l = vec![0.0f32; frames];
                let mut out_r = vec![0.0f32; frames];

                loop {
                    match stop_rx.recv_timeout(period) {
                        Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                        Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                            in_l.fill(0.0);
                            in_r.fill(0.0);
                            shared.process_block(
                                &mut [&mut in_l, &mut in_r],
                                &mut [&mut out_l, &mut out_r],
                                frames,
                            );
                        }
                    }
                }
            })
            .expect("spawn dummy-audio thread");

        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        tracing::debug!("dummy driver stop");

        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            let _ = worker.handle.join();
        }
        self.buffer_size = 0;
        self.sample_rate = 0.0;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
