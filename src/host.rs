//! Host facade: driver selection, option application, and engine bring-up in
//! one builder.

use ensemble_core::{Engine, Error, OptionKind, ProcessMode, Result};
use ensemble_osc::ControlSurface;

/// A running host: an initialized [`Engine`] plus whatever surface it talks
/// to.
pub struct Host {
    engine: Engine,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn close(mut self) -> Result<()> {
        self.engine.close()
    }
}

/// Builder for [`Host`].
#[derive(Default)]
pub struct HostBuilder {
    driver: Option<String>,
    client_name: Option<String>,
    process_mode: Option<ProcessMode>,
    buffer_size: Option<u32>,
    sample_rate: Option<u32>,
    osc_target: Option<(String, String)>,
}

impl HostBuilder {
    /// Driver name, e.g. `"JACK"`, `"ALSA"`, `"CoreAudio"` or `"Dummy"`.
    /// Defaults to `"Dummy"`.
    pub fn driver(mut self, name: impl Into<String>) -> Self {
        self.driver = Some(name.into());
        self
    }

    /// Client name presented to the audio system. Defaults to `"Ensemble"`.
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Graph topology. Defaults to the continuous rack.
    pub fn process_mode(mut self, mode: ProcessMode) -> Self {
        self.process_mode = Some(mode);
        self
    }

    pub fn buffer_size(mut self, frames: u32) -> Self {
        self.buffer_size = Some(frames);
        self
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Attach an outbound OSC control surface at `target` (host:port),
    /// messages addressed under `base_path`.
    pub fn osc_surface(mut self, target: impl Into<String>, base_path: impl Into<String>) -> Self {
        self.osc_target = Some((target.into(), base_path.into()));
        self
    }

    /// Build the engine, apply options, and bring it up.
    pub fn build(self) -> Result<Host> {
        let driver_name = self.driver.as_deref().unwrap_or("Dummy");
        let mut engine = Engine::new_by_driver_name(driver_name).ok_or_else(|| {
            Error::InvalidArgument(format!("no such audio driver: {driver_name}"))
        })?;

        if let Some(mode) = self.process_mode {
            let value = match mode {
                ProcessMode::SingleClient => 0,
                ProcessMode::MultipleClients => 1,
                ProcessMode::ContinuousRack => 2,
                ProcessMode::Patchbay => 3,
                ProcessMode::Bridge => {
                    return Err(Error::InvalidArgument(
                        "bridge mode is reserved for bridge binaries".into(),
                    ));
                }
            };
            engine.set_option(OptionKind::ProcessMode, value, "");
        }
        if let Some(frames) = self.buffer_size {
            engine.set_option(OptionKind::PreferredBufferSize, frames as i32, "");
        }
        if let Some(rate) = self.sample_rate {
            engine.set_option(OptionKind::PreferredSampleRate, rate as i32, "");
        }

        if let Some((target, base_path)) = &self.osc_target {
            let surface = ControlSurface::connect(target.as_str(), base_path)
                .map_err(|e| Error::InvalidArgument(format!("OSC surface: {e}")))?;
            engine.set_control_surface(surface);
        }

        let client_name = self.client_name.as_deref().unwrap_or("Ensemble");
        engine.init(client_name)?;

        Ok(Host { engine })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_closes_with_dummy_driver() {
        let host = Host::builder()
            .driver("Dummy")
            .client_name("test-host")
            .buffer_size(256)
            .sample_rate(48_000)
            .build()
            .unwrap();

        assert!(host.engine().is_running());
        assert_eq!(host.engine().buffer_size(), 256);
        assert_eq!(host.engine().sample_rate(), 48_000.0);
        host.close().unwrap();
    }

    #[test]
    fn unknown_driver_is_an_error() {
        assert!(Host::builder().driver("Bogus").build().is_err());
    }
}
