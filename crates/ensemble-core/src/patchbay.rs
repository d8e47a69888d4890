//! The patchbay processor: arbitrary connectivity over per-port buffers.
//!
//! Connections between ports are configured by an external connection
//! manager; the processor itself only drives each active plugin once per
//! block over the plugin's own port buffers. Without a configured graph the
//! order is ascending id.

use smallvec::SmallVec;

use crate::meters::{block_levels, ChannelLevels};
use crate::table::PluginTable;

/// Audio channels we expect per plugin before spilling to the heap.
const INLINE_CHANNELS: usize = 8;

/// Process one patchbay block.
///
/// # Safety
/// Process-callback context: the caller must be the audio thread (or stand
/// in for it) with any pending post-action already drained this block.
pub(crate) unsafe fn process(table: &PluginTable, frames: usize) {
    for id in 0..table.count() {
        let Some(instance) = table.instance_mut(id) else {
            continue;
        };
        if !instance.control.is_enabled() || !instance.client.is_active() {
            continue;
        }

        // zero owned output buffers, audio and event alike
        instance.client.init_port_buffers();

        let mut inputs: SmallVec<[&[f32]; INLINE_CHANNELS]> = SmallVec::new();
        let mut outputs: SmallVec<[&mut [f32]; INLINE_CHANNELS]> = SmallVec::new();

        for port in instance.client.ports() {
            let Some(audio) = port.as_audio() else {
                continue;
            };

            if audio.is_input() {
                if let Some(buf) = audio.buffer() {
                    inputs.push(&buf[..frames.min(buf.len())]);
                }
            } else if let Some(buf) = audio.buffer_mut() {
                let len = frames.min(buf.len());
                outputs.push(&mut buf[..len]);
            }
        }

        instance.unit.process(&inputs, &mut outputs, frames);

        fn levels_of(bufs: &[&[f32]], channel: usize) -> ChannelLevels {
            bufs.get(channel)
                .map_or(ChannelLevels::default(), |b| block_levels(b))
        }

        let out_view: SmallVec<[&[f32]; INLINE_CHANNELS]> =
            outputs.iter().map(|b| &**b).collect();

        table.set_levels(
            id,
            [levels_of(&inputs, 0), levels_of(&inputs, 1)],
            [levels_of(&out_view, 0), levels_of(&out_view, 1)],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EngineClient;
    use crate::driver::EngineType;
    use crate::options::ProcessMode;
    use crate::plugin::{new_internal_plugin, PluginInit, PluginInstance};

    fn patchbay_gain(id: u32, name: &str) -> PluginInstance {
        let client = EngineClient::new(EngineType::Null, ProcessMode::Patchbay, None);
        let init = PluginInit {
            id,
            name,
            label: "gain",
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

    #[test]
    fn drives_plugin_over_its_own_buffers() {
        let table = PluginTable::new(4);
        table.install(patchbay_gain(0, "g"));

        // feed the plugin's input ports the way a connection manager would
        unsafe {
            {
                let instance = table.instance(0).unwrap();
                for port in instance.client.ports() {
                    let Some(audio) = port.as_audio() else { continue };
                    if audio.is_input() {
                        audio.buffer_mut().unwrap()[..64].fill(0.5);
                    }
                }
            }

            process(&table, 64);

            let instance = table.instance(0).unwrap();
            for port in instance.client.ports() {
                let Some(audio) = port.as_audio() else { continue };
                if !audio.is_input() {
                    assert!(audio.buffer().unwrap()[..64].iter().all(|&s| s == 0.5));
                }
            }
        }

        assert_eq!(table.input_peak(0, 0), 0.5);
        assert_eq!(table.output_peak(0, 0), 0.5);
    }

    #[test]
    fn inactive_clients_are_skipped() {
        let table = PluginTable::new(4);
        let instance = patchbay_gain(0, "g");
        instance.client.deactivate();
        table.install(instance);

        unsafe {
            process(&table, 64);
        }

        assert_eq!(table.output_peak(0, 0), 0.0);
    }
}
