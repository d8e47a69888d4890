//! Real-time audio plugin host engine.
//!
//! # Primary API
//!
//! - [`Engine`]: lifecycle, plugin management, options, metering
//! - [`EngineShared`]: the processing hub a driver feeds from its callback
//! - [`driver::new_driver_by_name`]: back-end selection
//! - [`PluginControl`] / [`PluginUnit`]: the contract plugin formats implement
//!
//! # Threads
//!
//! Three roles share the engine: the control thread (owns [`Engine`], may
//! block), the audio thread (driver-owned, runs
//! [`EngineShared::process_rack`] / [`EngineShared::process_patchbay`] once
//! per block, never blocks and never allocates), and the housekeeping thread
//! (periodic UI idling and peak reporting). Structural changes to the plugin
//! table cross from control to audio through the single-slot post-action
//! channel, executed at block boundaries.
//!
//! # Example
//!
//! ```ignore
//! use ensemble_core::prelude::*;
//!
//! let mut engine = Engine::new_by_driver_name("Dummy").unwrap();
//! engine.init("MyHost")?;
//!
//! let id = engine.add_plugin(BinaryType::Native, PluginType::Internal, "", None, "gain")?;
//! engine.remove_plugin(id)?;
//! engine.close()?;
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod consts;

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicFloat};

pub mod event;
pub use event::{ControlEventKind, EngineEvent, EventBuffer};

pub mod port;
pub use port::{AudioPort, EnginePort, EventPort, PortKind};

pub mod client;
pub use client::EngineClient;

pub mod plugin;
pub use plugin::{
    BinaryType, ParamState, PluginControl, PluginInfo, PluginInstance, PluginState, PluginType,
    PluginUnit,
};

pub mod table;
pub use table::PluginTable;

pub mod post_action;
pub use post_action::{PostAction, PostActionQueue};

pub mod rack;
pub use rack::RackBus;

pub(crate) mod patchbay;

pub mod engine;
pub use engine::{Engine, EngineShared};

pub mod driver;
pub use driver::{
    driver_count, driver_name, driver_names, new_driver_by_name, Driver, DriverConfig,
    DummyDriver, EngineType,
};

pub mod naming;
pub use naming::unique_plugin_name;

pub mod meters;
pub use meters::{block_levels, ChannelLevels, MeterSnapshot};

pub mod options;
pub use options::{EngineOptions, OptionKind, ProcessMode};

pub mod callback;
pub use callback::{CallbackAction, CallbackFn};

pub mod time;
pub use time::{TimeInfo, TimeSnapshot};

pub(crate) mod housekeeping;

pub mod project;

/// Convenience prelude for host builders.
pub mod prelude {
    pub use crate::callback::CallbackAction;
    pub use crate::driver::{new_driver_by_name, Driver, EngineType};
    pub use crate::engine::{Engine, EngineShared};
    pub use crate::error::{Error, Result};
    pub use crate::event::{ControlEventKind, EngineEvent};
    pub use crate::options::{OptionKind, ProcessMode};
    pub use crate::plugin::{BinaryType, PluginControl, PluginType, PluginUnit};
    pub use crate::port::PortKind;
}
