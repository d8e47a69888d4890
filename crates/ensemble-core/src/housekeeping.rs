//! The engine's housekeeping thread.
//!
//! Periodically runs the idle pass: plugin UI idling plus peak reporting to
//! the control surface. The control thread stops this thread before any
//! structural mutation and restarts it afterwards, so the pass never races a
//! plugin's removal.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use ensemble_osc::SurfaceHandle;
use parking_lot::Mutex;

use crate::engine::EngineShared;
use crate::plugin::PluginControl;

const IDLE_INTERVAL: Duration = Duration::from_millis(50);

/// Control-thread mirror of the plugin table: id-ordered control handles.
///
/// Kept in lockstep with the table by the engine, so queries (names, state,
/// UI idling) never have to touch the audio thread's slots.
#[derive(Default)]
pub(crate) struct ControlRegistry {
    plugins: Mutex<Vec<Arc<dyn PluginControl>>>,
}

impl ControlRegistry {
    pub(crate) fn push(&self, control: Arc<dyn PluginControl>) {
        self.plugins.lock().push(control);
    }

    /// Remove entry `id` and shift the tail down, matching table compaction.
    pub(crate) fn remove(&self, id: u32) -> Option<Arc<dyn PluginControl>> {
        let mut plugins = self.plugins.lock();
        if (id as usize) < plugins.len() {
            Some(plugins.remove(id as usize))
        } else {
            None
        }
    }

    pub(crate) fn clear(&self) {
        self.plugins.lock().clear();
    }

    pub(crate) fn get(&self, id: u32) -> Option<Arc<dyn PluginControl>> {
        self.plugins.lock().get(id as usize).cloned()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.plugins
            .lock()
            .iter()
            .map(|p| p.info().name.clone())
            .collect()
    }

    pub(crate) fn for_each(&self, mut f: impl FnMut(&Arc<dyn PluginControl>)) {
        for plugin in self.plugins.lock().iter() {
            f(plugin);
        }
    }
}

/// One idle pass: UI idling for every enabled plugin, then peak values to
/// the control surface.
pub(crate) fn idle_pass(
    registry: &ControlRegistry,
    shared: &EngineShared,
    surface: Option<&SurfaceHandle>,
) {
    registry.for_each(|plugin| {
        if plugin.is_enabled() {
            plugin.ui_idle();
        }
    });

    let Some(surface) = surface else {
        return;
    };

    registry.for_each(|plugin| {
        let id = plugin.id();
        // max since the last pass; consuming resets the accumulators
        let (ins, outs) = shared.table().consume_peaks(id);

        if plugin.audio_in_count() > 0 {
            for (ch, value) in ins.iter().enumerate() {
                surface.set_input_peak_value(id as i32, ch as i32 + 1, *value as f64);
            }
        }
        if plugin.audio_out_count() > 0 {
            for (ch, value) in outs.iter().enumerate() {
                surface.set_output_peak_value(id as i32, ch as i32 + 1, *value as f64);
            }
        }
    });
}

/// Handle to the running housekeeping thread.
pub(crate) struct IdleThread {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl IdleThread {
    pub(crate) fn spawn(
        registry: Arc<ControlRegistry>,
        shared: Arc<EngineShared>,
        surface: Option<SurfaceHandle>,
    ) -> Self {
        let (stop, stop_rx) = bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("engine-idle".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(IDLE_INTERVAL) {
                    Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        idle_pass(&registry, &shared, surface.as_ref());
                    }
                }
            })
            .expect("spawn engine-idle thread");

        Self { stop, handle }
    }

    pub(crate) fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}
