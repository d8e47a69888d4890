//! The continuous-rack processor: a fixed stereo chain with a shared event
//! bus.
//!
//! The rack is a degenerate series graph. It guarantees bounded work per
//! block (at most [`MAX_RACK_PLUGINS`](crate::consts::MAX_RACK_PLUGINS)
//! plugin calls), enforces the two-channel shape, and reuses the engine-owned
//! event buses so no block ever allocates.

use std::cell::UnsafeCell;

use crate::consts::RACK_EVENT_COUNT;
use crate::event::EventBuffer;
use crate::meters::block_levels;
use crate::table::PluginTable;

/// The engine-owned shared rack event buses, one buffer per direction.
///
/// Rack-mode event ports point into these instead of owning storage. The
/// buses live as long as the engine; ports are created and destroyed only
/// while the engine is not processing, and all buffer access happens on the
/// process callback.
pub struct RackBus {
    input: UnsafeCell<EventBuffer>,
    output: UnsafeCell<EventBuffer>,
}

// SAFETY: see type docs; single-thread access from the process callback.
unsafe impl Send for RackBus {}
unsafe impl Sync for RackBus {}

impl RackBus {
    pub fn new() -> Self {
        Self {
            input: UnsafeCell::new(EventBuffer::new(RACK_EVENT_COUNT)),
            output: UnsafeCell::new(EventBuffer::new(RACK_EVENT_COUNT)),
        }
    }

    /// The bus for the requested direction.
    ///
    /// # Safety
    /// Process-callback context only; must not overlap a `buffer_mut` borrow
    /// of the same direction.
    pub unsafe fn buffer(&self, is_input: bool) -> &EventBuffer {
        if is_input {
            &*self.input.get()
        } else {
            &*self.output.get()
        }
    }

    /// Mutable bus access for the requested direction.
    ///
    /// # Safety
    /// Process-callback context only; the returned borrow must be the only
    /// access to that direction for its duration.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn buffer_mut(&self, is_input: bool) -> &mut EventBuffer {
        if is_input {
            &mut *self.input.get()
        } else {
            &mut *self.output.get()
        }
    }
}

impl Default for RackBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RackBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RackBus").finish_non_exhaustive()
    }
}

/// Process one rack block.
///
/// `inputs` double as staging buffers between chained plugins and are
/// clobbered; `outputs` carry the result. Both must be at least `frames`
/// samples long.
///
/// # Safety
/// Process-callback context: the caller must be the audio thread (or stand
/// in for it) with any pending post-action already drained this block.
pub(crate) unsafe fn process(
    table: &PluginTable,
    bus: &RackBus,
    inputs: &mut [&mut [f32]; 2],
    outputs: &mut [&mut [f32]; 2],
    frames: usize,
) {
    let [in_l, in_r] = inputs;
    let [out_l, out_r] = outputs;

    out_l[..frames].fill(0.0);
    out_r[..frames].fill(0.0);
    bus.buffer_mut(false).clear();

    let mut processed = false;

    for id in 0..table.count() {
        let Some(instance) = table.instance_mut(id) else {
            continue;
        };
        if !instance.control.is_enabled() {
            continue;
        }

        if processed {
            // chain: previous outputs become this plugin's inputs
            in_l[..frames].copy_from_slice(&out_l[..frames]);
            in_r[..frames].copy_from_slice(&out_r[..frames]);
            out_l[..frames].fill(0.0);
            out_r[..frames].fill(0.0);
        }

        instance.client.init_port_buffers();
        instance.unit.process(
            &[&in_l[..frames], &in_r[..frames]],
            &mut [&mut out_l[..frames], &mut out_r[..frames]],
            frames,
        );

        // plugins without audio inputs pass the upstream signal along
        if instance.control.audio_in_count() == 0 {
            for i in 0..frames {
                out_l[i] += in_l[i];
                out_r[i] += in_r[i];
            }
        }

        // plugins without MIDI outputs pass the event bus along
        if instance.control.midi_out_count() == 0 {
            let out_bus = bus.buffer_mut(false);
            out_bus.copy_from(bus.buffer(true));
        }

        table.set_levels(
            id,
            [block_levels(&in_l[..frames]), block_levels(&in_r[..frames])],
            [block_levels(&out_l[..frames]), block_levels(&out_r[..frames])],
        );

        processed = true;
    }

    // empty rack: wire inputs straight through
    if !processed {
        out_l[..frames].copy_from_slice(&in_l[..frames]);
        out_r[..frames].copy_from_slice(&in_r[..frames]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EngineClient;
    use crate::driver::EngineType;
    use crate::event::ControlEventKind;
    use crate::options::ProcessMode;
    use crate::plugin::{new_internal_plugin, PluginInit, PluginInstance};
    use std::sync::Arc;

    fn rack_instance(id: u32, name: &str, label: &str, bus: &Arc<RackBus>) -> PluginInstance {
        let client = EngineClient::new(
            EngineType::Null,
            ProcessMode::ContinuousRack,
            Some(bus.clone()),
        );
        let init = PluginInit {
            id,
            name,
            label,
            filename: "",
            client: &client,
        };
        let (control, unit) = new_internal_plugin(&init).unwrap();
        client.activate();
        PluginInstance {
            control,
            unit,
            client,
        }
    }

    fn run_block(
        table: &PluginTable,
        bus: &RackBus,
        in_l: &mut [f32],
        in_r: &mut [f32],
        frames: usize,
    ) -> (Vec<f32>, Vec<f32>) {
        let mut out_l = vec![0.0f32; frames];
        let mut out_r = vec![0.0f32; frames];
        unsafe {
            process(
                table,
                bus,
                &mut [in_l, in_r],
                &mut [&mut out_l, &mut out_r],
                frames,
            );
        }
        (out_l, out_r)
    }

    #[test]
    fn empty_rack_passes_audio_through() {
        let table = PluginTable::new(4);
        let bus = RackBus::new();

        let mut in_l = vec![1.0f32; 512];
        let mut in_r = vec![-1.0f32; 512];
        let (out_l, out_r) = run_block(&table, &bus, &mut in_l, &mut in_r, 512);

        assert!(out_l.iter().all(|&s| s == 1.0));
        assert!(out_r.iter().all(|&s| s == -1.0));
    }

    #[test]
    fn noop_plugin_passes_audio_and_events() {
        let bus = Arc::new(RackBus::new());
        let table = PluginTable::new(4);
        table.install(rack_instance(0, "a", "noop", &bus));

        unsafe {
            bus.buffer_mut(true)
                .write_control(0, 0, ControlEventKind::Parameter, 7, 0.5);
        }

        let mut in_l = vec![0.5f32; 64];
        let mut in_r = vec![0.25f32; 64];
        let (out_l, out_r) = run_block(&table, &bus, &mut in_l, &mut in_r, 64);

        // zero audio inputs: upstream audio is summed into the outputs
        assert!(out_l.iter().all(|&s| s == 0.5));
        assert!(out_r.iter().all(|&s| s == 0.25));

        // zero MIDI outputs: input events appear on the output bus
        unsafe {
            assert_eq!(bus.buffer(false).count(), 1);
        }
    }

    #[test]
    fn gain_chain_records_peaks() {
        let bus = Arc::new(RackBus::new());
        let table = PluginTable::new(4);
        table.install(rack_instance(0, "g1", "gain", &bus));
        table.install(rack_instance(1, "g2", "gain", &bus));

        let mut in_l = vec![0.5f32; 64];
        let mut in_r = vec![-0.5f32; 64];
        let (out_l, out_r) = run_block(&table, &bus, &mut in_l, &mut in_r, 64);

        // unity gain twice over
        assert!(out_l.iter().all(|&s| s == 0.5));
        assert!(out_r.iter().all(|&s| s == -0.5));

        assert_eq!(table.input_peak(0, 0), 0.5);
        assert_eq!(table.output_peak(1, 0), 0.5);
        assert_eq!(table.output_peak(1, 1), 0.5);
    }

    #[test]
    fn disabled_plugins_are_skipped() {
        let bus = Arc::new(RackBus::new());
        let table = PluginTable::new(4);
        let instance = rack_instance(0, "g", "gain", &bus);
        instance.control.set_enabled(false);
        table.install(instance);

        let mut in_l = vec![0.75f32; 16];
        let mut in_r = vec![0.75f32; 16];
        let (out_l, _) = run_block(&table, &bus, &mut in_l, &mut in_r, 16);

        // nothing ran, so the rack behaves as if empty
        assert!(out_l.iter().all(|&s| s == 0.75));
    }
}
