//! Per-plugin engine clients.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::consts::STR_MAX;
use crate::driver::EngineType;
use crate::lockfree::AtomicFlag;
use crate::options::ProcessMode;
use crate::port::{AudioPort, EnginePort, EventPort, PortKind};
use crate::rack::RackBus;

/// One engine client per plugin: owns the plugin's ports and gates its
/// participation in processing.
///
/// Ports are created during plugin activation, before the plugin is
/// published to the table, and live until the client is dropped. After
/// publication the port list is read-only, so the process callback iterates
/// it without locking; [`is_active`](EngineClient::is_active) is what the
/// processors consult.
pub struct EngineClient {
    engine_type: EngineType,
    process_mode: ProcessMode,
    active: AtomicFlag,
    latency: AtomicU32,
    ports: UnsafeCell<Vec<Arc<EnginePort>>>,
    rack: Option<Arc<RackBus>>,
}

// SAFETY: `ports` is only mutated before the owning plugin is installed in
// the table (plugin activation, single-threaded); every later access is a
// read, and the table install publishes the writes.
unsafe impl Send for EngineClient {}
unsafe impl Sync for EngineClient {}

impl EngineClient {
    pub fn new(
        engine_type: EngineType,
        process_mode: ProcessMode,
        rack: Option<Arc<RackBus>>,
    ) -> Self {
        tracing::debug!(?engine_type, ?process_mode, "new engine client");

        Self {
            engine_type,
            process_mode,
            active: AtomicFlag::new(false),
            latency: AtomicU32::new(0),
            ports: UnsafeCell::new(Vec::new()),
            rack,
        }
    }

    pub fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    pub fn process_mode(&self) -> ProcessMode {
        self.process_mode
    }

    pub fn activate(&self) {
        tracing::debug!("engine client activate");
        self.active.set(true);
    }

    pub fn deactivate(&self) {
        tracing::debug!("engine client deactivate");
        self.active.set(false);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn latency(&self) -> u32 {
        self.latency.load(Ordering::Acquire)
    }

    pub fn set_latency(&self, samples: u32) {
        self.latency.store(samples, Ordering::Release);
    }

    /// Create a port of the requested kind. Names longer than [`STR_MAX`]
    /// characters are truncated; uniqueness across clients is not required.
    ///
    /// Only valid during plugin activation, before the plugin is installed
    /// in the table.
    pub fn add_port(&self, kind: PortKind, name: &str, is_input: bool) -> Arc<EnginePort> {
        tracing::debug!(?kind, name, is_input, "add port");

        let name: String = name.chars().take(STR_MAX).collect();

        let port = Arc::new(match kind {
            PortKind::Audio => EnginePort::Audio(AudioPort::new(is_input, self.process_mode, name)),
            PortKind::Event => EnginePort::Event(EventPort::new(
                is_input,
                self.process_mode,
                name,
                self.rack.clone(),
            )),
        });

        // SAFETY: pre-publication, single-threaded (see type docs).
        unsafe { (*self.ports.get()).push(port.clone()) };
        port
    }

    pub(crate) fn ports(&self) -> &[Arc<EnginePort>] {
        // SAFETY: read-only after publication (see type docs).
        unsafe { &*self.ports.get() }
    }

    pub fn port_count(&self) -> usize {
        self.ports().len()
    }

    /// Run per-block buffer initialization on every port.
    /// Called from the process callback before the plugin runs.
    pub fn init_port_buffers(&self) {
        for port in self.ports() {
            port.init_buffer();
        }
    }

    /// Visit the client's ports.
    pub fn for_each_port(&self, mut f: impl FnMut(&Arc<EnginePort>)) {
        for port in self.ports() {
            f(port);
        }
    }
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient")
            .field("engine_type", &self.engine_type)
            .field("process_mode", &self.process_mode)
            .field("active", &self.is_active())
            .field("ports", &self.port_count())
            .finish()
    }
}
