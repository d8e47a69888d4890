//! The engine: lifecycle, plugin management, and the processing hub.
//!
//! [`Engine`] is the control-thread object. Everything the audio callback
//! needs lives in [`EngineShared`], handed to the driver at `init`; the two
//! sides meet only at the post-action slot and a handful of atomics.

use std::sync::Arc;

use ensemble_osc::{ControlSurface, SurfaceHandle};

use crate::callback::{CallbackAction, CallbackFn};
use crate::client::EngineClient;
use crate::consts::{
    MAX_DEFAULT_PLUGINS, MAX_PATCHBAY_PLUGINS, MAX_RACK_PLUGINS, STR_MAX,
};
use crate::driver::{Driver, DriverConfig, EngineType};
use crate::error::{Error, Result};
use crate::housekeeping::{idle_pass, ControlRegistry, IdleThread};
use crate::lockfree::AtomicDouble;
use crate::meters::MeterSnapshot;
use crate::naming::unique_plugin_name;
use crate::options::{EngineOptions, OptionKind, ProcessMode};
use crate::plugin::{
    new_internal_plugin, BinaryType, PluginControl, PluginInit, PluginInstance, PluginType,
};
use crate::post_action::{PostAction, PostActionQueue};
use crate::rack::{self, RackBus};
use crate::table::PluginTable;
use crate::time::{TimeInfo, TimeSnapshot};
use crate::{patchbay, project};

use std::sync::atomic::{AtomicU32, Ordering};

/// Everything the audio callback touches, shared between the engine and its
/// driver.
pub struct EngineShared {
    mode: ProcessMode,
    table: PluginTable,
    rack: Arc<RackBus>,
    post: PostActionQueue,
    time: TimeInfo,

    buffer_size: AtomicU32,
    sample_rate: AtomicDouble,
    // geometry last fanned out to the plugins; audio thread only
    applied_buffer_size: AtomicU32,
    applied_sample_rate: AtomicDouble,
}

impl EngineShared {
    pub fn new(mode: ProcessMode) -> Self {
        let max_plugins = match mode {
            ProcessMode::ContinuousRack => MAX_RACK_PLUGINS,
            ProcessMode::Patchbay => MAX_PATCHBAY_PLUGINS,
            ProcessMode::Bridge => 1,
            _ => MAX_DEFAULT_PLUGINS,
        };

        Self {
            mode,
            table: PluginTable::new(max_plugins),
            rack: Arc::new(RackBus::new()),
            post: PostActionQueue::new(),
            time: TimeInfo::default(),
            buffer_size: AtomicU32::new(0),
            sample_rate: AtomicDouble::new(0.0),
            applied_buffer_size: AtomicU32::new(0),
            applied_sample_rate: AtomicDouble::new(0.0),
        }
    }

    pub fn process_mode(&self) -> ProcessMode {
        self.mode
    }

    pub fn table(&self) -> &PluginTable {
        &self.table
    }

    /// The engine-owned shared rack event buses. Rack-mode event ports point
    /// into these; drivers queue incoming MIDI on the input side.
    pub fn rack_bus(&self) -> &Arc<RackBus> {
        &self.rack
    }

    pub fn time(&self) -> &TimeInfo {
        &self.time
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate.get()
    }

    /// Driver-side: publish the block geometry. The processing path fans the
    /// change out to the plugins at the next block boundary.
    pub fn set_geometry(&self, buffer_size: u32, sample_rate: f64) {
        self.buffer_size.store(buffer_size, Ordering::Release);
        self.sample_rate.set(sample_rate);
    }

    /// Control-side: publish a removal and wait for the block boundary.
    pub fn schedule_remove(&self, engine_running: bool, id: u32) -> Option<PluginInstance> {
        self.post
            .schedule(&self.table, engine_running, PostAction::RemovePlugin { id })
    }

    /// Control-side: pure block-boundary barrier.
    pub fn schedule_idle(&self, engine_running: bool) {
        self.post.schedule(&self.table, engine_running, PostAction::Idle);
    }

    /// Top-of-block bookkeeping: execute at most one pending post-action,
    /// then fan out geometry changes to the plugins.
    pub fn process_pending_events(&self) {
        self.post.drain(&self.table);

        let buffer_size = self.buffer_size();
        let sample_rate = self.sample_rate();
        let bs_changed = self.applied_buffer_size.swap(buffer_size, Ordering::AcqRel) != buffer_size;
        let sr_changed = {
            let prev = self.applied_sample_rate.get();
            self.applied_sample_rate.set(sample_rate);
            prev != sample_rate
        };

        if !bs_changed && !sr_changed {
            return;
        }

        for id in 0..self.table.count() {
            // SAFETY: audio-thread context, post-action already drained.
            let Some(instance) = (unsafe { self.table.instance_mut(id) }) else {
                continue;
            };
            if !instance.control.is_enabled() {
                continue;
            }
            if bs_changed {
                instance.unit.buffer_size_changed(buffer_size);
            }
            if sr_changed {
                instance.unit.sample_rate_changed(sample_rate);
            }
        }
    }

    /// One rack block, invoked by the driver's audio callback.
    ///
    /// `inputs` are clobbered as staging between chained plugins. Only call
    /// from a single processing thread.
    pub fn process_rack(
        &self,
        inputs: &mut [&mut [f32]; 2],
        outputs: &mut [&mut [f32]; 2],
        frames: usize,
    ) {
        self.process_pending_events();
        // SAFETY: single processing thread, pending actions drained above.
        unsafe { rack::process(&self.table, &self.rack, inputs, outputs, frames) };
        self.time.advance(frames as u64, self.sample_rate());
    }

    /// One patchbay block. Plugins run over their own port buffers in the
    /// externally configured order; the driver's own buffers only carry
    /// whatever the connection manager routed to hardware, which is out of
    /// scope here, so outputs are silenced.
    pub fn process_patchbay(
        &self,
        _inputs: &mut [&mut [f32]],
        outputs: &mut [&mut [f32]],
        frames: usize,
    ) {
        self.process_pending_events();
        // SAFETY: single processing thread, pending actions drained above.
        unsafe { patchbay::process(&self.table, frames) };

        for out in outputs.iter_mut() {
            let n = frames.min(out.len());
            out[..n].fill(0.0);
        }
        self.time.advance(frames as u64, self.sample_rate());
    }

    /// Driver entry point: dispatch one block by process mode.
    pub fn process_block(
        &self,
        inputs: &mut [&mut [f32]; 2],
        outputs: &mut [&mut [f32]; 2],
        frames: usize,
    ) {
        match self.mode {
            ProcessMode::Patchbay => {
                let [in_l, in_r] = inputs;
                self.process_patchbay(&mut [&mut **in_l, &mut **in_r], outputs, frames);
            }
            _ => self.process_rack(inputs, outputs, frames),
        }
    }
}

impl std::fmt::Debug for EngineShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineShared")
            .field("mode", &self.mode)
            .field("plugins", &self.table.count())
            .field("buffer_size", &self.buffer_size())
            .field("sample_rate", &self.sample_rate())
            .finish()
    }
}

/// The audio plugin host engine.
///
/// Owned and driven by one control thread. The audio driver and the
/// housekeeping thread run concurrently, but they only meet the engine
/// through [`EngineShared`] and the control registry.
pub struct Engine {
    driver: Box<dyn Driver>,
    shared: Option<Arc<EngineShared>>,
    registry: Arc<ControlRegistry>,
    options: EngineOptions,
    name: String,
    callback: Option<CallbackFn>,
    last_error: String,
    about_to_close: bool,
    housekeeping: Option<IdleThread>,
    surface: Option<ControlSurface>,
    surface_handle: Option<SurfaceHandle>,
}

impl Engine {
    pub fn new(driver: Box<dyn Driver>) -> Self {
        tracing::debug!(driver = driver.name(), "new engine");

        Self {
            driver,
            shared: None,
            registry: Arc::new(ControlRegistry::default()),
            options: EngineOptions::default(),
            name: String::new(),
            callback: None,
            last_error: String::new(),
            about_to_close: false,
            housekeeping: None,
            surface: None,
            surface_handle: None,
        }
    }

    /// Select a driver by name and build an engine around it.
    pub fn new_by_driver_name(driver_name: &str) -> Option<Self> {
        crate::driver::new_driver_by_name(driver_name).map(Self::new)
    }

    // -- introspection ------------------------------------------------------

    pub fn engine_type(&self) -> EngineType {
        self.driver.engine_type()
    }

    pub fn driver_name(&self) -> &str {
        self.driver.name()
    }

    pub fn client_name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_some() && self.driver.is_running()
    }

    pub fn buffer_size(&self) -> u32 {
        self.driver.buffer_size()
    }

    pub fn sample_rate(&self) -> f64 {
        self.driver.sample_rate()
    }

    pub fn time_snapshot(&self) -> TimeSnapshot {
        self.shared
            .as_ref()
            .map(|s| s.time().snapshot())
            .unwrap_or_default()
    }

    pub fn max_client_name_size(&self) -> usize {
        STR_MAX / 2
    }

    pub fn max_port_name_size(&self) -> usize {
        STR_MAX
    }

    pub fn current_plugin_count(&self) -> u32 {
        self.shared.as_ref().map_or(0, |s| s.table().count())
    }

    pub fn max_plugin_number(&self) -> u32 {
        self.shared.as_ref().map_or(0, |s| s.table().max_plugins() as u32)
    }

    /// The shared processing state, for drivers and harnesses that drive
    /// blocks by hand. `None` until `init`.
    pub fn shared(&self) -> Option<Arc<EngineShared>> {
        self.shared.clone()
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    fn fail(&mut self, err: Error) -> Error {
        self.last_error = err.to_string();
        err
    }

    // -- configuration ------------------------------------------------------

    pub fn set_callback(&mut self, callback: CallbackFn) {
        self.callback = Some(callback);
    }

    fn emit(
        &mut self,
        action: CallbackAction,
        plugin_id: u32,
        value1: i32,
        value2: i32,
        value3: f32,
        value_str: &str,
    ) {
        tracing::debug!(?action, plugin_id, value1, value2, value3, value_str, "callback");

        if let Some(callback) = &mut self.callback {
            callback(action, plugin_id, value1, value2, value3, value_str);
        }
    }

    /// Attach the outbound OSC control surface. Takes effect for plugins
    /// added and housekeeping passes from now on.
    pub fn set_control_surface(&mut self, surface: ControlSurface) {
        self.surface_handle = Some(surface.handle());
        self.surface = Some(surface);

        // a live housekeeping thread was spawned without the surface
        if self.housekeeping.is_some() {
            self.stop_housekeeping();
            self.start_housekeeping();
        }
    }

    /// Apply one engine option. Options that shape the engine at init time
    /// are rejected while running; the stored value is left untouched.
    pub fn set_option(&mut self, kind: OptionKind, value: i32, value_str: &str) -> bool {
        tracing::debug!(?kind, value, value_str, "set option");

        if kind == OptionKind::ProcessName {
            // best effort; there is no portable way to retitle the process
            tracing::debug!(title = value_str, "process name requested");
            return true;
        }

        let running = self.is_running();
        match self.options.apply(kind, value, value_str, running) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(?kind, value, value_str, "cannot set option: {err}");
                self.fail(err);
                false
            }
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Bring the engine up under `client_name`.
    pub fn init(&mut self, client_name: &str) -> Result<()> {
        tracing::debug!(client_name, "engine init");

        if self.shared.is_some() {
            return Err(self.fail(Error::AlreadyRunning));
        }
        if client_name.is_empty() {
            return Err(self.fail(Error::InvalidArgument("empty client name".into())));
        }

        self.name = client_name.to_owned();
        self.about_to_close = false;

        let shared = Arc::new(EngineShared::new(self.options.process_mode));
        shared.time().clear();

        let config = DriverConfig {
            preferred_buffer_size: self.options.preferred_buffer_size,
            preferred_sample_rate: self.options.preferred_sample_rate,
        };

        if let Err(err) = self.driver.start(shared.clone(), client_name, &config) {
            self.name.clear();
            return Err(self.fail(err));
        }

        self.shared = Some(shared);
        self.start_housekeeping();
        Ok(())
    }

    /// Tear the engine down: housekeeping, plugins, driver, control surface.
    ///
    /// In-flight audio callbacks are not interrupted; the driver stops its
    /// callback before `close` returns.
    pub fn close(&mut self) -> Result<()> {
        tracing::debug!("engine close");

        if self.shared.is_none() {
            return Err(self.fail(Error::NotRunning));
        }

        self.about_to_close = true;
        self.stop_housekeeping();
        self.remove_all_plugins();
        self.driver.stop()?;
        self.shared = None;

        if let Some(surface) = self.surface.take() {
            surface.handle().exit();
            self.surface_handle = None;
            surface.close();
        }

        self.name.clear();
        Ok(())
    }

    /// One housekeeping pass: plugin UI idling plus peak reporting. Usually
    /// driven by the engine's own idle thread.
    pub fn idle(&self) {
        if let Some(shared) = &self.shared {
            idle_pass(&self.registry, shared, self.surface_handle.as_ref());
        }
    }

    fn start_housekeeping(&mut self) {
        if let (Some(shared), None) = (&self.shared, &self.housekeeping) {
            self.housekeeping = Some(IdleThread::spawn(
                self.registry.clone(),
                shared.clone(),
                self.surface_handle.clone(),
            ));
        }
    }

    fn stop_housekeeping(&mut self) {
        if let Some(thread) = self.housekeeping.take() {
            thread.stop();
        }
    }

    // -- plugin management --------------------------------------------------

    /// Load a plugin and install it in the next free slot. Returns its id.
    pub fn add_plugin(
        &mut self,
        binary: BinaryType,
        plugin_type: PluginType,
        filename: &str,
        name: Option<&str>,
        label: &str,
    ) -> Result<u32> {
        tracing::debug!(?binary, ?plugin_type, filename, name, label, "add plugin");

        let Some(shared) = self.shared.clone() else {
            return Err(self.fail(Error::NotRunning));
        };

        if shared.table().count() as usize >= shared.table().max_plugins() {
            return Err(self.fail(Error::AtCapacity));
        }

        if self.options.prefer_plugin_bridges && self.options.bridge_binary(binary).is_some() {
            if self.options.process_mode != ProcessMode::MultipleClients {
                return Err(self.fail(Error::UnsupportedBridgeMode(
                    "bridged plugins need the multi-client process mode".into(),
                )));
            }
            if self.driver.engine_type() != EngineType::Jack {
                return Err(self.fail(Error::UnsupportedBridgeMode(
                    "bridged plugins need the JACK driver".into(),
                )));
            }
            return Err(self.fail(Error::LoaderFailed(
                "bridged plugins are not implemented".into(),
            )));
        }

        let id = shared.table().count();
        let base = match name {
            Some(n) if !n.is_empty() => n,
            _ => label,
        };
        let unique_name = self.get_new_unique_plugin_name(base);

        let rack = (self.options.process_mode == ProcessMode::ContinuousRack)
            .then(|| shared.rack_bus().clone());
        let client = EngineClient::new(self.driver.engine_type(), self.options.process_mode, rack);

        let init = PluginInit {
            id,
            name: &unique_name,
            label,
            filename,
            client: &client,
        };

        let loaded = match plugin_type {
            PluginType::Internal => new_internal_plugin(&init),
            other => Err(Error::LoaderFailed(format!(
                "{} support is not compiled into this build",
                other.as_str()
            ))),
        };

        let (control, unit) = match loaded {
            Ok(pair) => pair,
            Err(err) => return Err(self.fail(err)),
        };

        client.activate();

        if let Some(surface) = &self.surface_handle {
            surface.add_plugin_start(id as i32, &unique_name);
        }

        self.registry.push(control.clone());
        shared.table().install(PluginInstance {
            control,
            unit,
            client,
        });

        if let Some(surface) = &self.surface_handle {
            surface.add_plugin_end(id as i32);
        }
        self.emit(CallbackAction::PluginAdded, id, 0, 0, 0.0, &unique_name);

        Ok(id)
    }

    /// Remove plugin `id`, compacting the table. The audio thread executes
    /// the removal at its next block boundary; the plugin itself is
    /// destroyed here, on the control thread.
    pub fn remove_plugin(&mut self, id: u32) -> Result<()> {
        tracing::debug!(id, "remove plugin");

        let Some(shared) = self.shared.clone() else {
            return Err(self.fail(Error::NotRunning));
        };
        if id >= shared.table().count() {
            return Err(self.fail(Error::PluginNotFound(id)));
        }

        self.stop_housekeeping();

        let removed = shared.schedule_remove(self.is_running(), id);
        self.registry.remove(id);

        if let Some(surface) = &self.surface_handle {
            surface.remove_plugin(id as i32);
        }

        drop(removed);

        if self.is_running() && !self.about_to_close {
            self.start_housekeeping();
        }

        self.emit(CallbackAction::PluginRemoved, id, 0, 0, 0.0, "");
        Ok(())
    }

    /// Remove every plugin under a single block-boundary barrier.
    pub fn remove_all_plugins(&mut self) {
        tracing::debug!("remove all plugins");

        let Some(shared) = self.shared.clone() else {
            return;
        };

        self.stop_housekeeping();

        let old_count = shared.table().set_count_zero();
        shared.schedule_idle(self.is_running());

        // SAFETY: the barrier above guarantees the audio thread has moved on
        // to the zero count; the slots are ours now.
        let drained = unsafe { shared.table().drain_all(old_count) };
        self.registry.clear();
        drop(drained);

        if self.is_running() && !self.about_to_close {
            self.start_housekeeping();
        }
    }

    /// The control handle of plugin `id`.
    pub fn plugin(&self, id: u32) -> Option<Arc<dyn PluginControl>> {
        self.registry.get(id)
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Derive a name no current plugin uses. `base` comes back unchanged
    /// when it is free and well-formed.
    pub fn get_new_unique_plugin_name(&self, base: &str) -> String {
        let names = self.registry.names();
        unique_plugin_name(
            base,
            names.iter().map(|s| s.as_str()),
            self.max_client_name_size(),
        )
    }

    // -- metering -----------------------------------------------------------

    pub fn input_peak(&self, plugin_id: u32, channel: usize) -> f32 {
        self.shared
            .as_ref()
            .map_or(0.0, |s| s.table().input_peak(plugin_id, channel))
    }

    pub fn output_peak(&self, plugin_id: u32, channel: usize) -> f32 {
        self.shared
            .as_ref()
            .map_or(0.0, |s| s.table().output_peak(plugin_id, channel))
    }

    /// Accumulated peaks plus last-block RMS for one plugin.
    pub fn meter_snapshot(&self, plugin_id: u32) -> MeterSnapshot {
        let Some(shared) = &self.shared else {
            return MeterSnapshot::default();
        };
        let table = shared.table();

        MeterSnapshot {
            input_peak: [
                table.input_peak(plugin_id, 0),
                table.input_peak(plugin_id, 1),
            ],
            output_peak: [
                table.output_peak(plugin_id, 0),
                table.output_peak(plugin_id, 1),
            ],
            input_rms: [table.input_rms(plugin_id, 0), table.input_rms(plugin_id, 1)],
            output_rms: [
                table.output_rms(plugin_id, 0),
                table.output_rms(plugin_id, 1),
            ],
        }
    }

    // -- projects -----------------------------------------------------------

    /// Write the current plugin states to a project file.
    pub fn save_project(&mut self, path: &std::path::Path) -> Result<()> {
        tracing::debug!(?path, "save project");

        let mut states = Vec::new();
        self.registry.for_each(|plugin| {
            if plugin.is_enabled() {
                states.push(plugin.save_state());
            }
        });

        project::save(path, &states).map_err(|err| self.fail(err))
    }

    /// Validate a project file. Plugins are not restored from it; see
    /// [`project::load`].
    pub fn load_project(&mut self, path: &std::path::Path) -> Result<()> {
        tracing::debug!(?path, "load project");
        project::load(path).map_err(|err| self.fail(err))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.shared.is_some() {
            let _ = self.close();
        }
    }
}
