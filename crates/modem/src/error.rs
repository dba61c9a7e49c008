//! Error types for Stratolink Modem

use thiserror::Error;

/// Modulation error types
#[derive(Error, Debug)]
pub enum ModemError {
    #[error("a transmission is already in progress")]
    TransmitterBusy,

    #[error("the bit sequence is empty")]
    NothingToTransmit,

    #[error("invalid modulator parameters: {msg}")]
    InvalidParameters { msg: String },

    #[error("core error: {0}")]
    Core(#[from] stratolink_core::CoreError),
}

/// Result type for Stratolink Modem operations
pub type Result<T> = std::result::Result<T, ModemError>;
