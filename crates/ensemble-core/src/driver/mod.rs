//! Audio driver back-ends.
//!
//! A driver owns the platform audio callback and drives
//! [`EngineShared::process_rack`](crate::engine::EngineShared::process_rack)
//! or [`process_patchbay`](crate::engine::EngineShared::process_patchbay)
//! once per block. Back-ends are selected by name at startup; the `Dummy`
//! back-end has no device and is driven manually, which is what the test
//! suites use.

mod cpal_backend;
mod dummy;

pub use cpal_backend::CpalDriver;
pub use dummy::DummyDriver;

use std::sync::Arc;

use crate::engine::EngineShared;
use crate::error::Result;

/// Which kind of back-end is driving the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    /// No driver (not initialized, or tests).
    Null,
    /// A JACK server connection.
    Jack,
    /// A cpal-managed device (ALSA, CoreAudio, WASAPI, ASIO, ...).
    Cpal,
}

/// Startup preferences handed to a driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConfig {
    /// Preferred block size in frames; 0 leaves it to the device.
    pub preferred_buffer_size: u32,
    /// Preferred sample rate in Hz; 0 leaves it to the device.
    pub preferred_sample_rate: u32,
}

/// The contract a back-end implements for the engine.
///
/// `start` must set the shared buffer size and sample rate before the first
/// callback fires; geometry changes are picked up by the processing path at
/// block boundaries and fanned out to the plugins from there.
pub trait Driver: Send {
    fn engine_type(&self) -> EngineType;
    fn name(&self) -> &str;

    fn start(
        &mut self,
        shared: Arc<EngineShared>,
        client_name: &str,
        config: &DriverConfig,
    ) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    /// Current block size in frames; 0 while stopped.
    fn buffer_size(&self) -> u32;

    /// Current sample rate in Hz; 0.0 while stopped.
    fn sample_rate(&self) -> f64;
}

/// Names of the back-ends available on this machine.
pub fn driver_names() -> Vec<&'static str> {
    let mut names = vec![DummyDriver::NAME];
    names.extend(cpal::available_hosts().iter().map(|id| id.name()));
    names
}

pub fn driver_count() -> usize {
    driver_names().len()
}

pub fn driver_name(index: usize) -> Option<&'static str> {
    driver_names().get(index).copied()
}

/// Select a back-end by name.
///
/// Accepts the historical driver names (`"JACK"`, `"ALSA"`, `"CoreAudio"`,
/// `"ASIO"`, ...) plus `"Dummy"`; names that do not correspond to an
/// available host return `None`.
pub fn new_driver_by_name(name: &str) -> Option<Box<dyn Driver>> {
    tracing::debug!(name, "new driver by name");

    if name.eq_ignore_ascii_case(DummyDriver::NAME) {
        return Some(Box::new(DummyDriver::new()));
    }

    // "JACK (RtAudio)" historically selected the same server as "JACK"
    let wanted = match name {
        "JACK (RtAudio)" => "JACK",
        other => other,
    };

    let host_id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(wanted))?;

    CpalDriver::new(host_id).map(|d| Box::new(d) as Box<dyn Driver>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_is_always_listed() {
        assert!(driver_names().contains(&"Dummy"));
        assert_eq!(driver_name(0), Some("Dummy"));
        assert!(driver_count() >= 1);
    }

    #[test]
    fn unknown_names_return_none() {
        assert!(new_driver_by_name("NoSuchAudioSystem").is_none());
    }

    #[test]
    fn dummy_resolves_case_insensitively() {
        assert!(new_driver_by_name("dummy").is_some());
    }
}
