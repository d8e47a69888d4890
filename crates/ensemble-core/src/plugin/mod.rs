//! The uniform plugin contract.
//!
//! A loaded plugin is split into two halves, mirroring how the host talks to
//! it from two different threads:
//!
//! - [`PluginUnit`] is the processor. It is owned by the plugin table and
//!   only ever touched from the audio callback.
//! - [`PluginControl`] is the shared handle. The engine's control thread (and
//!   the housekeeping thread) query and mutate it through atomics, so it can
//!   be read while the unit is processing.
//!
//! Format loaders return one of each; the engine installs the pair into a
//! table slot and keeps an id-ordered mirror of the control handles for
//! queries that must not touch the audio thread's data.

mod internal;

pub use internal::{internal_plugin_labels, new_internal_plugin, PluginInit};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::EngineClient;
use crate::lockfree::AtomicFlag;

/// Binary ABI of a plugin file, used to pick a bridge binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryType {
    Native,
    Posix32,
    Posix64,
    Win32,
    Win64,
}

/// Plugin format dispatched on by `add_plugin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginType {
    Internal,
    Ladspa,
    Dssi,
    Lv2,
    Vst,
    Gig,
    Sf2,
    Sfz,
}

impl PluginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Internal => "Internal",
            PluginType::Ladspa => "LADSPA",
            PluginType::Dssi => "DSSI",
            PluginType::Lv2 => "LV2",
            PluginType::Vst => "VST",
            PluginType::Gig => "GIG",
            PluginType::Sf2 => "SF2",
            PluginType::Sfz => "SFZ",
        }
    }
}

/// Immutable identity of a loaded plugin.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub label: String,
    pub filename: String,
    pub plugin_type: PluginType,
}

/// One saved parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamState {
    pub index: u32,
    pub name: String,
    pub value: f64,
}

/// Snapshot of a plugin's persistent state, as written into project files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginState {
    pub name: String,
    pub label: String,
    pub plugin_type: String,
    pub enabled: bool,
    pub parameters: Vec<ParamState>,
}

/// Control-thread handle to a loaded plugin.
///
/// Everything here must be callable while the audio thread is inside the
/// unit's `process`; implementations back these with atomics or their own
/// locking.
pub trait PluginControl: Send + Sync {
    fn info(&self) -> &PluginInfo;

    /// Slot index. Re-assigned by table compaction.
    fn id(&self) -> u32;
    fn set_id(&self, id: u32);

    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);

    fn audio_in_count(&self) -> u32;
    fn audio_out_count(&self) -> u32;
    fn midi_in_count(&self) -> u32;
    fn midi_out_count(&self) -> u32;

    /// Periodic UI housekeeping, driven from the engine's idle thread.
    fn ui_idle(&self) {}

    /// State snapshot for project persistence.
    fn save_state(&self) -> PluginState {
        let info = self.info();
        PluginState {
            name: info.name.clone(),
            label: info.label.clone(),
            plugin_type: info.plugin_type.as_str().to_owned(),
            enabled: self.is_enabled(),
            parameters: Vec::new(),
        }
    }
}

/// Audio-thread processor of a loaded plugin.
pub trait PluginUnit: Send {
    /// Process one block. `inputs`/`outputs` hold one slice per audio port,
    /// each `frames` samples long.
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize);

    fn buffer_size_changed(&mut self, _new_buffer_size: u32) {}
    fn sample_rate_changed(&mut self, _new_sample_rate: f64) {}
}

/// A plugin installed in a table slot: processor, control handle, and the
/// engine client owning its ports.
pub struct PluginInstance {
    pub control: Arc<dyn PluginControl>,
    pub unit: Box<dyn PluginUnit>,
    pub client: EngineClient,
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.control.info().name)
            .field("id", &self.control.id())
            .finish_non_exhaustive()
    }
}

/// Shared scaffolding for control handles: id, enabled flag, identity.
/// Format implementations embed this and add their own state.
#[derive(Debug)]
pub struct ControlBase {
    info: PluginInfo,
    id: AtomicU32,
    enabled: AtomicFlag,
}

impl ControlBase {
    pub fn new(info: PluginInfo, id: u32) -> Self {
        Self {
            info,
            id: AtomicU32::new(id),
            enabled: AtomicFlag::new(true),
        }
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_id(&self, id: u32) {
        self.id.store(id, Ordering::Release);
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    #[inline]
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_base_reassigns_id() {
        let base = ControlBase::new(
            PluginInfo {
                name: "a".into(),
                label: "noop".into(),
                filename: String::new(),
                plugin_type: PluginType::Internal,
            },
            3,
        );
        assert_eq!(base.id(), 3);
        base.set_id(1);
        assert_eq!(base.id(), 1);
        assert!(base.is_enabled());
    }
}
