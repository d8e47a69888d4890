//! Typed control/MIDI events and the fixed-capacity buffers that carry them.

use crate::consts::{is_bank_select_cc, MAX_MIDI_CHANNELS};

/// Kind of a control event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlEventKind {
    /// Placeholder; never written to a buffer.
    #[default]
    Null,
    /// Normalized parameter change. `param` must not be a bank-select CC.
    Parameter,
    /// MIDI bank change.
    MidiBank,
    /// MIDI program change.
    MidiProgram,
    /// All sound off on the channel.
    AllSoundOff,
    /// All notes off on the channel.
    AllNotesOff,
}

/// One event in an engine event buffer.
///
/// `Null` doubles as the end-of-buffer sentinel: a zeroed buffer is a valid
/// empty buffer, and the first `Null` entry terminates a scan.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EngineEvent {
    #[default]
    Null,
    Control {
        time: u32,
        channel: u8,
        kind: ControlEventKind,
        param: u16,
        value: f64,
    },
    Midi {
        time: u32,
        channel: u8,
        port: u8,
        data: [u8; 3],
        size: u8,
    },
}

impl EngineEvent {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, EngineEvent::Null)
    }
}

/// Fixed-capacity, insertion-ordered event store.
///
/// Not a queue: events stay where they were written and the first `Null`
/// entry marks the end. Appending scans for that entry, which is fine for
/// the capacities involved (at most a few hundred entries, flushed every
/// block) and keeps producers and consumers symmetric.
#[derive(Debug)]
pub struct EventBuffer {
    events: Box<[EngineEvent]>,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: vec![EngineEvent::Null; capacity].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    /// Number of events stored, i.e. the index of the first `Null` entry.
    pub fn count(&self) -> u32 {
        self.events
            .iter()
            .position(EngineEvent::is_null)
            .unwrap_or(self.events.len()) as u32
    }

    /// The event at `index`, `Null` included. None past capacity.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&EngineEvent> {
        self.events.get(index)
    }

    /// Mark the buffer empty. Entries past the sentinel are stale and never
    /// observed, so only the first slot needs resetting; clearing everything
    /// keeps the zeroed-is-empty picture intact for debugging.
    pub fn clear(&mut self) {
        self.events.fill(EngineEvent::Null);
    }

    /// Append into the first free slot. Returns false when full.
    pub fn append(&mut self, event: EngineEvent) -> bool {
        debug_assert!(!event.is_null());

        for slot in self.events.iter_mut() {
            if slot.is_null() {
                *slot = event;
                return true;
            }
        }

        false
    }

    /// Copy `src`'s events over our own (event pass-through).
    pub fn copy_from(&mut self, src: &EventBuffer) {
        let n = self.events.len().min(src.events.len());
        self.events[..n].copy_from_slice(&src.events[..n]);
    }

    /// Validate and append a control event. Returns false when the event was
    /// rejected or the buffer is full; the caller decides whether to warn.
    pub fn write_control(
        &mut self,
        time: u32,
        channel: u8,
        kind: ControlEventKind,
        param: u16,
        value: f64,
    ) -> bool {
        if kind == ControlEventKind::Null {
            return false;
        }
        if channel >= MAX_MIDI_CHANNELS {
            return false;
        }
        if !(0.0..=1.0).contains(&value) {
            return false;
        }
        if kind == ControlEventKind::Parameter && is_bank_select_cc(param) {
            return false;
        }

        self.append(EngineEvent::Control {
            time,
            channel,
            kind,
            param,
            value,
        })
    }

    /// Validate and append a short MIDI message (1 to 3 bytes).
    pub fn write_midi(&mut self, time: u32, channel: u8, port: u8, data: &[u8]) -> bool {
        if channel >= MAX_MIDI_CHANNELS {
            return false;
        }
        if data.is_empty() || data.len() > 3 {
            return false;
        }

        let mut bytes = [0u8; 3];
        bytes[..data.len()].copy_from_slice(data);

        self.append(EngineEvent::Midi {
            time,
            channel,
            port,
            data: bytes,
            size: data.len() as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_counts_zero() {
        let buf = EventBuffer::new(8);
        assert_eq!(buf.count(), 0);
        assert_eq!(buf.get(0), Some(&EngineEvent::Null));
    }

    #[test]
    fn count_stops_at_first_null() {
        let mut buf = EventBuffer::new(8);
        assert!(buf.write_control(0, 0, ControlEventKind::Parameter, 7, 0.5));
        assert!(buf.write_control(1, 1, ControlEventKind::MidiProgram, 3, 0.0));
        assert_eq!(buf.count(), 2);
        assert!(buf.get(2).unwrap().is_null());
    }

    #[test]
    fn write_control_validates() {
        let mut buf = EventBuffer::new(8);
        // value out of range
        assert!(!buf.write_control(0, 0, ControlEventKind::Parameter, 7, 1.0 + f64::EPSILON));
        assert!(buf.write_control(0, 0, ControlEventKind::Parameter, 7, 1.0));
        // bank select CC as parameter
        assert!(!buf.write_control(0, 0, ControlEventKind::Parameter, 0, 0.5));
        assert!(!buf.write_control(0, 0, ControlEventKind::Parameter, 32, 0.5));
        // channel range
        assert!(!buf.write_control(0, 16, ControlEventKind::Parameter, 7, 0.5));
        // null kind
        assert!(!buf.write_control(0, 0, ControlEventKind::Null, 7, 0.5));
        assert_eq!(buf.count(), 1);
    }

    #[test]
    fn write_midi_validates_size() {
        let mut buf = EventBuffer::new(8);
        assert!(!buf.write_midi(0, 0, 0, &[]));
        assert!(!buf.write_midi(0, 0, 0, &[0x90, 60, 100, 0]));
        assert!(buf.write_midi(0, 0, 0, &[0x90, 60, 100]));
        assert_eq!(buf.count(), 1);

        match buf.get(0).unwrap() {
            EngineEvent::Midi { data, size, .. } => {
                assert_eq!(*size, 3);
                assert_eq!(data, &[0x90, 60, 100]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn append_reports_full() {
        let mut buf = EventBuffer::new(2);
        assert!(buf.write_midi(0, 0, 0, &[0xF8]));
        assert!(buf.write_midi(1, 0, 0, &[0xF8]));
        assert!(!buf.write_midi(2, 0, 0, &[0xF8]));
        buf.clear();
        assert_eq!(buf.count(), 0);
    }
}
