//! Outbound OSC control surface for the ensemble plugin host.
//!
//! The engine is controlled out-of-process by a UI speaking OSC. This crate
//! is the outbound half: a background UDP sender thread fed through a
//! bounded channel, plus a typed method per message so the engine never
//! assembles raw packets. Inbound dispatch lives with the UI, not here.
//!
//! ```ignore
//! let surface = ControlSurface::connect("127.0.0.1:22752", "/Ensemble")?;
//! let handle = surface.handle();
//!
//! handle.add_plugin_start(0, "synth");
//! handle.add_plugin_end(0);
//! handle.exit();
//! surface.close();
//! ```

pub mod error;
pub use error::{OscError, Result};

mod sender;
pub use sender::QUEUE_CAPACITY;

mod surface;
pub use surface::{ControlSurface, SurfaceHandle};
