//! Error types for the OSC control surface.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OscError {
    #[error("Invalid OSC target address: {0}")]
    InvalidAddress(String),

    #[error("OSC encoding failed: {0}")]
    Encode(#[from] rosc::OscError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OscError>;
