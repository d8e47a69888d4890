//! Engine option surface.
//!
//! Options are plain control-thread state. Most of them shape the engine at
//! init time and are therefore rejected while the engine is running; bridge
//! binary paths can be repointed at any time.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How plugins are wired into the audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessMode {
    /// One driver client, plugins chained internally.
    SingleClient,
    /// One driver client per plugin.
    MultipleClients,
    /// Fixed stereo chain with a shared event bus.
    ContinuousRack,
    /// Arbitrary connections, per-port buffers.
    Patchbay,
    /// Exactly one plugin, hosted for an external bridge process.
    Bridge,
}

impl ProcessMode {
    /// Conversion for the integer option surface. `Bridge` is not reachable
    /// this way; it is selected by building a bridge engine.
    pub fn from_option_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(ProcessMode::SingleClient),
            1 => Some(ProcessMode::MultipleClients),
            2 => Some(ProcessMode::ContinuousRack),
            3 => Some(ProcessMode::Patchbay),
            _ => None,
        }
    }
}

/// Keys accepted by [`Engine::set_option`](crate::engine::Engine::set_option).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    ProcessName,
    ProcessMode,
    MaxParameters,
    PreferredBufferSize,
    PreferredSampleRate,
    ForceStereo,
    UseDssiVstChunks,
    PreferPluginBridges,
    PreferUiBridges,
    OscUiTimeout,
    PathBridgeNative,
    PathBridgePosix32,
    PathBridgePosix64,
    PathBridgeWin32,
    PathBridgeWin64,
    PathBridgeLv2Gtk2,
    PathBridgeLv2Gtk3,
    PathBridgeLv2Qt4,
    PathBridgeLv2Qt5,
    PathBridgeLv2Cocoa,
    PathBridgeLv2Windows,
    PathBridgeLv2X11,
    PathBridgeVstCocoa,
    PathBridgeVstHwnd,
    PathBridgeVstX11,
}

impl OptionKind {
    /// Whether this option requires a stopped engine.
    pub fn requires_stopped_engine(self) -> bool {
        !matches!(
            self,
            OptionKind::ProcessName
                | OptionKind::PathBridgeNative
                | OptionKind::PathBridgePosix32
                | OptionKind::PathBridgePosix64
                | OptionKind::PathBridgeWin32
                | OptionKind::PathBridgeWin64
                | OptionKind::PathBridgeLv2Gtk2
                | OptionKind::PathBridgeLv2Gtk3
                | OptionKind::PathBridgeLv2Qt4
                | OptionKind::PathBridgeLv2Qt5
                | OptionKind::PathBridgeLv2Cocoa
                | OptionKind::PathBridgeLv2Windows
                | OptionKind::PathBridgeLv2X11
                | OptionKind::PathBridgeVstCocoa
                | OptionKind::PathBridgeVstHwnd
                | OptionKind::PathBridgeVstX11
        )
    }
}

/// The full option set, applied before `init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    pub process_mode: ProcessMode,
    pub max_parameters: u32,
    pub preferred_buffer_size: u32,
    pub preferred_sample_rate: u32,
    pub force_stereo: bool,
    pub use_dssi_vst_chunks: bool,
    pub prefer_plugin_bridges: bool,
    pub prefer_ui_bridges: bool,
    pub osc_ui_timeout_ms: u32,

    pub bridge_native: String,
    pub bridge_posix32: String,
    pub bridge_posix64: String,
    pub bridge_win32: String,
    pub bridge_win64: String,

    pub bridge_lv2_gtk2: String,
    pub bridge_lv2_gtk3: String,
    pub bridge_lv2_qt4: String,
    pub bridge_lv2_qt5: String,
    pub bridge_lv2_cocoa: String,
    pub bridge_lv2_windows: String,
    pub bridge_lv2_x11: String,

    pub bridge_vst_cocoa: String,
    pub bridge_vst_hwnd: String,
    pub bridge_vst_x11: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            process_mode: ProcessMode::ContinuousRack,
            max_parameters: 200,
            preferred_buffer_size: 512,
            preferred_sample_rate: 44_100,
            force_stereo: false,
            use_dssi_vst_chunks: false,
            prefer_plugin_bridges: false,
            prefer_ui_bridges: true,
            osc_ui_timeout_ms: 4_000,
            bridge_native: String::new(),
            bridge_posix32: String::new(),
            bridge_posix64: String::new(),
            bridge_win32: String::new(),
            bridge_win64: String::new(),
            bridge_lv2_gtk2: String::new(),
            bridge_lv2_gtk3: String::new(),
            bridge_lv2_qt4: String::new(),
            bridge_lv2_qt5: String::new(),
            bridge_lv2_cocoa: String::new(),
            bridge_lv2_windows: String::new(),
            bridge_lv2_x11: String::new(),
            bridge_vst_cocoa: String::new(),
            bridge_vst_hwnd: String::new(),
            bridge_vst_x11: String::new(),
        }
    }
}

impl EngineOptions {
    /// Apply a single option. `running` gates the options that shape the
    /// engine at init time; on rejection nothing is mutated.
    pub fn apply(
        &mut self,
        kind: OptionKind,
        value: i32,
        value_str: &str,
        running: bool,
    ) -> Result<()> {
        if running && kind.requires_stopped_engine() {
            return Err(Error::AlreadyRunning);
        }

        match kind {
            OptionKind::ProcessName => {
                // Applied by the engine itself (process title), nothing stored.
            }
            OptionKind::ProcessMode => {
                self.process_mode = ProcessMode::from_option_value(value).ok_or_else(|| {
                    Error::InvalidArgument(format!("invalid process mode {value}"))
                })?;
            }
            OptionKind::MaxParameters => {
                if value < 0 {
                    return Err(Error::InvalidArgument(format!(
                        "max parameters must be non-negative, got {value}"
                    )));
                }
                self.max_parameters = value as u32;
            }
            OptionKind::PreferredBufferSize => {
                self.preferred_buffer_size = value.max(0) as u32;
            }
            OptionKind::PreferredSampleRate => {
                self.preferred_sample_rate = value.max(0) as u32;
            }
            OptionKind::ForceStereo => self.force_stereo = value != 0,
            OptionKind::UseDssiVstChunks => self.use_dssi_vst_chunks = value != 0,
            OptionKind::PreferPluginBridges => self.prefer_plugin_bridges = value != 0,
            OptionKind::PreferUiBridges => self.prefer_ui_bridges = value != 0,
            OptionKind::OscUiTimeout => {
                if value < 0 {
                    return Err(Error::InvalidArgument(format!(
                        "OSC UI timeout must be non-negative, got {value}"
                    )));
                }
                self.osc_ui_timeout_ms = value as u32;
            }
            OptionKind::PathBridgeNative => self.bridge_native = value_str.to_owned(),
            OptionKind::PathBridgePosix32 => self.bridge_posix32 = value_str.to_owned(),
            OptionKind::PathBridgePosix64 => self.bridge_posix64 = value_str.to_owned(),
            OptionKind::PathBridgeWin32 => self.bridge_win32 = value_str.to_owned(),
            OptionKind::PathBridgeWin64 => self.bridge_win64 = value_str.to_owned(),
            OptionKind::PathBridgeLv2Gtk2 => self.bridge_lv2_gtk2 = value_str.to_owned(),
            OptionKind::PathBridgeLv2Gtk3 => self.bridge_lv2_gtk3 = value_str.to_owned(),
            OptionKind::PathBridgeLv2Qt4 => self.bridge_lv2_qt4 = value_str.to_owned(),
            OptionKind::PathBridgeLv2Qt5 => self.bridge_lv2_qt5 = value_str.to_owned(),
            OptionKind::PathBridgeLv2Cocoa => self.bridge_lv2_cocoa = value_str.to_owned(),
            OptionKind::PathBridgeLv2Windows => self.bridge_lv2_windows = value_str.to_owned(),
            OptionKind::PathBridgeLv2X11 => self.bridge_lv2_x11 = value_str.to_owned(),
            OptionKind::PathBridgeVstCocoa => self.bridge_vst_cocoa = value_str.to_owned(),
            OptionKind::PathBridgeVstHwnd => self.bridge_vst_hwnd = value_str.to_owned(),
            OptionKind::PathBridgeVstX11 => self.bridge_vst_x11 = value_str.to_owned(),
        }

        Ok(())
    }

    /// Bridge binary configured for the given binary kind, if any.
    pub fn bridge_binary(&self, binary: crate::plugin::BinaryType) -> Option<&str> {
        use crate::plugin::BinaryType;

        let path = match binary {
            BinaryType::Native => &self.bridge_native,
            BinaryType::Posix32 => &self.bridge_posix32,
            BinaryType::Posix64 => &self.bridge_posix64,
            BinaryType::Win32 => &self.bridge_win32,
            BinaryType::Win64 => &self.bridge_win64,
        };

        (!path.is_empty()).then_some(path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_mode_gated_while_running() {
        let mut opts = EngineOptions::default();
        let err = opts
            .apply(OptionKind::ProcessMode, 3, "", true)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning));
        assert_eq!(opts.process_mode, ProcessMode::ContinuousRack);
    }

    #[test]
    fn process_mode_range_checked() {
        let mut opts = EngineOptions::default();
        assert!(opts.apply(OptionKind::ProcessMode, 9, "", false).is_err());
        assert!(opts.apply(OptionKind::ProcessMode, 3, "", false).is_ok());
        assert_eq!(opts.process_mode, ProcessMode::Patchbay);
    }

    #[test]
    fn bridge_paths_allowed_while_running() {
        let mut opts = EngineOptions::default();
        opts.apply(OptionKind::PathBridgeWin64, 0, "/opt/bridge-win64", true)
            .unwrap();
        assert_eq!(opts.bridge_win64, "/opt/bridge-win64");
    }

    #[test]
    fn negative_max_parameters_rejected() {
        let mut opts = EngineOptions::default();
        assert!(opts.apply(OptionKind::MaxParameters, -1, "", false).is_err());
        assert_eq!(opts.max_parameters, 200);
    }
}
