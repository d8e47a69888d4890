//! Error types for ensemble-core.

use thiserror::Error;

/// Error type for control-thread engine operations.
///
/// Real-time paths never construct these; invalid RT inputs are dropped with
/// a log line instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Maximum number of plugins reached")]
    AtCapacity,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Engine is not running")]
    NotRunning,

    #[error("Engine is already running")]
    AlreadyRunning,

    #[error("Plugin {0} not found")]
    PluginNotFound(u32),

    #[error("Bridged plugins are not usable here: {0}")]
    UnsupportedBridgeMode(String),

    #[error("Plugin loader failed: {0}")]
    LoaderFailed(String),

    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Failed to pause audio stream")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
