//! # Ensemble - Audio Plugin Host Engine
//!
//! Umbrella crate tying the host together:
//! - **ensemble-core** - the engine: ports, plugin table, rack/patchbay
//!   processors, driver contract, options, metering
//! - **ensemble-osc** - the outbound OSC control surface
//!
//! ## Quick Start
//!
//! ```ignore
//! use ensemble::prelude::*;
//!
//! let mut host = Host::builder()
//!     .driver("Dummy")
//!     .client_name("Ensemble")
//!     .build()?;
//!
//! let id = host.engine_mut().add_plugin(
//!     BinaryType::Native,
//!     PluginType::Internal,
//!     "",
//!     None,
//!     "gain",
//! )?;
//!
//! println!("levels: {:?}", host.engine().meter_snapshot(id));
//! host.close()?;
//! ```

/// Re-export of ensemble-core for direct access
pub use ensemble_core as core;

/// Re-export of ensemble-osc for direct access
pub use ensemble_osc as osc;

pub use ensemble_core::{
    driver_names,
    new_driver_by_name,
    AtomicDouble,
    AtomicFlag,
    AtomicFloat,
    BinaryType,
    CallbackAction,
    CallbackFn,
    ControlEventKind,
    Driver,
    DriverConfig,
    DummyDriver,
    Engine,
    EngineClient,
    EngineEvent,
    EngineOptions,
    EngineShared,
    EngineType,
    Error,
    EventBuffer,
    OptionKind,
    ParamState,
    ChannelLevels,
    MeterSnapshot,
    PluginControl,
    PluginInfo,
    PluginInstance,
    PluginState,
    PluginTable,
    PluginType,
    PluginUnit,
    PortKind,
    ProcessMode,
    RackBus,
    Result,
    TimeSnapshot,
};

pub use ensemble_osc::{ControlSurface, SurfaceHandle};

mod host;
pub use host::{Host, HostBuilder};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Host, HostBuilder};

    pub use ensemble_core::prelude::*;

    pub use ensemble_osc::{ControlSurface, SurfaceHandle};
}
