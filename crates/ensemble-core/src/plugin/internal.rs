//! Built-in plugin formats.
//!
//! These are the plugins that ship with the host itself: no file to load, no
//! foreign ABI. They double as the reference implementations of the
//! [`PluginControl`]/[`PluginUnit`] split.

use std::sync::Arc;

use crate::client::EngineClient;
use crate::error::{Error, Result};
use crate::lockfree::AtomicFloat;
use crate::plugin::{
    ControlBase, ParamState, PluginControl, PluginInfo, PluginState, PluginType, PluginUnit,
};
use crate::port::PortKind;

/// Construction context handed to an internal plugin constructor.
pub struct PluginInit<'a> {
    pub id: u32,
    pub name: &'a str,
    pub label: &'a str,
    pub filename: &'a str,
    pub client: &'a EngineClient,
}

/// Labels the internal format knows how to build.
pub fn internal_plugin_labels() -> &'static [&'static str] {
    &["noop", "gain"]
}

/// Build an internal plugin by label.
pub fn new_internal_plugin(
    init: &PluginInit<'_>,
) -> Result<(Arc<dyn PluginControl>, Box<dyn PluginUnit>)> {
    match init.label {
        "noop" => Ok(new_noop(init)),
        "gain" => Ok(new_gain(init)),
        other => Err(Error::LoaderFailed(format!(
            "unknown internal plugin label \"{other}\""
        ))),
    }
}

fn plugin_info(init: &PluginInit<'_>) -> PluginInfo {
    PluginInfo {
        name: init.name.to_owned(),
        label: init.label.to_owned(),
        filename: init.filename.to_owned(),
        plugin_type: PluginType::Internal,
    }
}

// ---------------------------------------------------------------------------
// noop: no ports at all. In a rack this passes both audio and events along
// untouched, courtesy of the zero-input/zero-output pass-through rules.

struct NoopControl {
    base: ControlBase,
}

impl PluginControl for NoopControl {
    fn info(&self) -> &PluginInfo {
        self.base.info()
    }

    fn id(&self) -> u32 {
        self.base.id()
    }

    fn set_id(&self, id: u32) {
        self.base.set_id(id);
    }

    fn is_enabled(&self) -> bool {
        self.base.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.base.set_enabled(enabled);
    }

    fn audio_in_count(&self) -> u32 {
        0
    }

    fn audio_out_count(&self) -> u32 {
        0
    }

    fn midi_in_count(&self) -> u32 {
        0
    }

    fn midi_out_count(&self) -> u32 {
        0
    }
}

struct NoopUnit;

impl PluginUnit for NoopUnit {
    fn process(&mut self, _inputs: &[&[f32]], _outputs: &mut [&mut [f32]], _frames: usize) {}
}

fn new_noop(init: &PluginInit<'_>) -> (Arc<dyn PluginControl>, Box<dyn PluginUnit>) {
    let control = Arc::new(NoopControl {
        base: ControlBase::new(plugin_info(init), init.id),
    });

    (control, Box::new(NoopUnit))
}

// ---------------------------------------------------------------------------
// gain: stereo in/out with one normalized volume parameter.

const GAIN_PARAM_VOLUME: u32 = 0;

struct GainControl {
    base: ControlBase,
    volume: AtomicFloat,
}

impl PluginControl for GainControl {
    fn info(&self) -> &PluginInfo {
        self.base.info()
    }

    fn id(&self) -> u32 {
        self.base.id()
    }

    fn set_id(&self, id: u32) {
        self.base.set_id(id);
    }

    fn is_enabled(&self) -> bool {
        self.base.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.base.set_enabled(enabled);
    }

    fn audio_in_count(&self) -> u32 {
        2
    }

    fn audio_out_count(&self) -> u32 {
        2
    }

    fn midi_in_count(&self) -> u32 {
        0
    }

    fn midi_out_count(&self) -> u32 {
        0
    }

    fn save_state(&self) -> PluginState {
        let info = self.info();
        PluginState {
            name: info.name.clone(),
            label: info.label.clone(),
            plugin_type: info.plugin_type.as_str().to_owned(),
            enabled: self.is_enabled(),
            parameters: vec![ParamState {
                index: GAIN_PARAM_VOLUME,
                name: "Volume".to_owned(),
                value: self.volume.get() as f64,
            }],
        }
    }
}

struct GainUnit {
    control: Arc<GainControl>,
}

impl PluginUnit for GainUnit {
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        let volume = self.control.volume.get();

        for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
            for i in 0..frames.min(input.len()).min(output.len()) {
                output[i] = input[i] * volume;
            }
        }
    }
}

fn new_gain(init: &PluginInit<'_>) -> (Arc<dyn PluginControl>, Box<dyn PluginUnit>) {
    for (name, is_input) in [
        ("input-1", true),
        ("input-2", true),
        ("output-1", false),
        ("output-2", false),
    ] {
        init.client.add_port(PortKind::Audio, name, is_input);
    }
    init.client.add_port(PortKind::Event, "events-in", true);

    let control = Arc::new(GainControl {
        base: ControlBase::new(plugin_info(init), init.id),
        volume: AtomicFloat::new(1.0),
    });

    let unit = Box::new(GainUnit {
        control: control.clone(),
    });

    (control, unit)
}
