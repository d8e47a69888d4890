//! Audio and event ports: the I/O endpoints a plugin touches while processing.
//!
//! Ports are created by an [`EngineClient`](crate::client::EngineClient)
//! while the engine is not processing and are only accessed from the audio
//! callback afterwards. Buffer access goes through `UnsafeCell` under that
//! single-thread contract, the same arrangement the process callback state
//! uses.

use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::consts::{PATCHBAY_BUFFER_SIZE, PATCHBAY_EVENT_COUNT};
use crate::event::{ControlEventKind, EngineEvent, EventBuffer};
use crate::options::ProcessMode;
use crate::rack::RackBus;

/// Kind of port a client can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Audio,
    Event,
}

/// A typed port, audio or event.
#[derive(Debug)]
pub enum EnginePort {
    Audio(AudioPort),
    Event(EventPort),
}

impl EnginePort {
    pub fn name(&self) -> &str {
        match self {
            EnginePort::Audio(p) => p.name(),
            EnginePort::Event(p) => p.name(),
        }
    }

    pub fn is_input(&self) -> bool {
        match self {
            EnginePort::Audio(p) => p.is_input(),
            EnginePort::Event(p) => p.is_input(),
        }
    }

    pub fn as_audio(&self) -> Option<&AudioPort> {
        match self {
            EnginePort::Audio(p) => Some(p),
            EnginePort::Event(_) => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventPort> {
        match self {
            EnginePort::Event(p) => Some(p),
            EnginePort::Audio(_) => None,
        }
    }

    /// Per-block buffer reset, called at the top of the process callback.
    pub fn init_buffer(&self) {
        match self {
            EnginePort::Audio(p) => p.init_buffer(),
            EnginePort::Event(p) => p.init_buffer(),
        }
    }
}

// ---------------------------------------------------------------------------
// Audio

/// An audio port.
///
/// In patchbay mode the port owns a [`PATCHBAY_BUFFER_SIZE`] float buffer; in
/// every other mode the driver hands buffers straight to the processor and
/// the port is only a named endpoint.
#[derive(Debug)]
pub struct AudioPort {
    is_input: bool,
    mode: ProcessMode,
    name: String,
    buffer: Option<UnsafeCell<Box<[f32]>>>,
}

// SAFETY: the owned buffer is only touched from the process callback; port
// creation and destruction happen while the engine is not processing.
unsafe impl Send for AudioPort {}
unsafe impl Sync for AudioPort {}

impl AudioPort {
    pub(crate) fn new(is_input: bool, mode: ProcessMode, name: String) -> Self {
        let buffer = (mode == ProcessMode::Patchbay)
            .then(|| UnsafeCell::new(vec![0.0f32; PATCHBAY_BUFFER_SIZE].into_boxed_slice()));

        Self {
            is_input,
            mode,
            name,
            buffer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_input(&self) -> bool {
        self.is_input
    }

    pub fn process_mode(&self) -> ProcessMode {
        self.mode
    }

    /// Zero an owned output buffer. No-op outside patchbay mode.
    pub fn init_buffer(&self) {
        if self.mode == ProcessMode::Patchbay && !self.is_input {
            // SAFETY: process-callback context, no aliasing access (see type docs).
            if let Some(buf) = &self.buffer {
                unsafe { (*buf.get()).fill(0.0) };
            }
        }
    }

    /// The owned buffer, patchbay mode only.
    ///
    /// # Safety
    /// Process-callback context only, and the returned slice must not outlive
    /// the current block or overlap a `buffer_mut` borrow.
    pub unsafe fn buffer(&self) -> Option<&[f32]> {
        self.buffer.as_ref().map(|b| &*(*b.get()))
    }

    /// Mutable view of the owned buffer, patchbay mode only.
    ///
    /// # Safety
    /// Process-callback context only; callers must not hold any other borrow
    /// of this port's buffer.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn buffer_mut(&self) -> Option<&mut [f32]> {
        self.buffer.as_ref().map(|b| &mut *(*b.get()))
    }
}

// ---------------------------------------------------------------------------
// Event

#[derive(Debug)]
enum EventStorage {
    /// Patchbay mode: the port owns its buffer.
    Owned(UnsafeCell<EventBuffer>),
    /// Rack mode: the port points into the engine-owned shared bus.
    Rack(Arc<RackBus>),
    /// Other modes route events through the driver; nothing to store.
    Detached,
}

/// An event port.
///
/// Input ports are read with [`event_count`](EventPort::event_count) /
/// [`get_event`](EventPort::get_event); output ports are written with
/// [`write_control`](EventPort::write_control) /
/// [`write_midi`](EventPort::write_midi). Misdirected calls are dropped, out
/// of range reads yield `Null`; readers on the audio thread never branch
/// into an error path.
#[derive(Debug)]
pub struct EventPort {
    is_input: bool,
    mode: ProcessMode,
    name: String,
    storage: EventStorage,
}

// SAFETY: same contract as AudioPort; all buffer access happens on the
// process callback, creation/destruction only while not processing.
unsafe impl Send for EventPort {}
unsafe impl Sync for EventPort {}

impl EventPort {
    pub(crate) fn new(
        is_input: bool,
        mode: ProcessMode,
        name: String,
        rack: Option<Arc<RackBus>>,
    ) -> Self {
        let storage = match mode {
            ProcessMode::Patchbay => {
                EventStorage::Owned(UnsafeCell::new(EventBuffer::new(PATCHBAY_EVENT_COUNT)))
            }
            ProcessMode::ContinuousRack => match rack {
                Some(bus) => EventStorage::Rack(bus),
                None => EventStorage::Detached,
            },
            _ => EventStorage::Detached,
        };

        Self {
            is_input,
            mode,
            name,
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_input(&self) -> bool {
        self.is_input
    }

    pub fn process_mode(&self) -> ProcessMode {
        self.mode
    }

    /// Zero an owned output buffer. The shared rack buses are cleared by the
    /// rack processor, not per port.
    pub fn init_buffer(&self) {
        if !self.is_input {
            if let EventStorage::Owned(buf) = &self.storage {
                // SAFETY: process-callback context (see type docs).
                unsafe { (*buf.get()).clear() };
            }
        }
    }

    fn with_buffer<R>(&self, f: impl FnOnce(&EventBuffer) -> R) -> Option<R> {
        // SAFETY: process-callback context; no mutable borrow is live across
        // this call (see type docs).
        unsafe {
            match &self.storage {
                EventStorage::Owned(buf) => Some(f(&*buf.get())),
                EventStorage::Rack(bus) => Some(f(bus.buffer(self.is_input))),
                EventStorage::Detached => None,
            }
        }
    }

    fn with_buffer_mut<R>(&self, f: impl FnOnce(&mut EventBuffer) -> R) -> Option<R> {
        // SAFETY: as above, and the closure is the only access for its duration.
        unsafe {
            match &self.storage {
                EventStorage::Owned(buf) => Some(f(&mut *buf.get())),
                EventStorage::Rack(bus) => Some(f(bus.buffer_mut(self.is_input))),
                EventStorage::Detached => None,
            }
        }
    }

    /// Number of stored events. Zero for output or detached ports.
    pub fn event_count(&self) -> u32 {
        if !self.is_input {
            return 0;
        }

        self.with_buffer(|buf| buf.count()).unwrap_or(0)
    }

    /// The event at `index`. `Null` when the port is not a readable input or
    /// the index is out of range, so audio-thread readers stay branchless.
    pub fn get_event(&self, index: u32) -> EngineEvent {
        if !self.is_input {
            return EngineEvent::Null;
        }

        self.with_buffer(|buf| buf.get(index as usize).copied().unwrap_or_default())
            .unwrap_or(EngineEvent::Null)
    }

    /// Write a control event into the first free slot. Precondition
    /// violations drop the event; a full buffer drops it with a warning.
    pub fn write_control(
        &self,
        time: u32,
        channel: u8,
        kind: ControlEventKind,
        param: u16,
        value: f64,
    ) {
        if self.is_input {
            return;
        }

        let appended = self.with_buffer_mut(|buf| buf.write_control(time, channel, kind, param, value));

        if appended == Some(false) && self.buffer_would_accept(channel, kind, param, value) {
            tracing::warn!(port = %self.name, "write_control: event buffer full");
        }
    }

    /// Write a short MIDI message into the first free slot.
    pub fn write_midi(&self, time: u32, channel: u8, port: u8, data: &[u8]) {
        if self.is_input {
            return;
        }

        let appended = self.with_buffer_mut(|buf| buf.write_midi(time, channel, port, data));

        if appended == Some(false) && channel < crate::consts::MAX_MIDI_CHANNELS && (1..=3).contains(&data.len()) {
            tracing::warn!(port = %self.name, "write_midi: event buffer full");
        }
    }

    /// Distinguish "rejected input" from "buffer full" for the warning path.
    fn buffer_would_accept(&self, channel: u8, kind: ControlEventKind, param: u16, value: f64) -> bool {
        kind != ControlEventKind::Null
            && channel < crate::consts::MAX_MIDI_CHANNELS
            && (0.0..=1.0).contains(&value)
            && !(kind == ControlEventKind::Parameter && crate::consts::is_bank_select_cc(param))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patchbay_out() -> EventPort {
        EventPort::new(false, ProcessMode::Patchbay, "events-out".into(), None)
    }

    fn patchbay_in() -> EventPort {
        EventPort::new(true, ProcessMode::Patchbay, "events-in".into(), None)
    }

    #[test]
    fn output_port_reads_as_empty() {
        let port = patchbay_out();
        assert_eq!(port.event_count(), 0);
        assert!(port.get_event(0).is_null());
    }

    #[test]
    fn input_port_refuses_writes() {
        let port = patchbay_in();
        port.write_control(0, 0, ControlEventKind::Parameter, 7, 0.5);
        assert_eq!(port.event_count(), 0);
    }

    #[test]
    fn out_of_range_read_yields_null() {
        let port = patchbay_out();
        port.write_control(0, 0, ControlEventKind::Parameter, 7, 0.5);

        let reader = EventPort {
            is_input: true,
            ..port
        };
        assert_eq!(reader.event_count(), 1);
        assert!(reader.get_event(PATCHBAY_EVENT_COUNT as u32 + 1).is_null());
    }

    #[test]
    fn rack_port_without_bus_is_inert() {
        let port = EventPort::new(true, ProcessMode::ContinuousRack, "in".into(), None);
        assert_eq!(port.event_count(), 0);
        assert!(port.get_event(0).is_null());
    }

    #[test]
    fn init_buffer_clears_output() {
        let port = patchbay_out();
        port.write_midi(0, 0, 0, &[0x90, 60, 100]);
        port.init_buffer();

        let reader = EventPort {
            is_input: true,
            ..port
        };
        assert_eq!(reader.event_count(), 0);
    }
}
