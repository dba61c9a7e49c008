//! Error types for Stratolink Frame

use thiserror::Error;

/// Framing error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("message of {len} bytes exceeds the {max}-byte frame limit")]
    MessageTooLong { len: usize, max: usize },

    #[error("path of {len} hops exceeds the {max}-hop address chain")]
    PathTooLong { len: usize, max: usize },

    #[error("payload of {len} bytes exceeds the {max}-byte modem capacity")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("packet size {size} is outside 1..={max}")]
    PacketSizeInvalid { size: usize, max: usize },

    #[error("invalid position fix: {msg}")]
    InvalidPosition { msg: String },

    #[error("core error: {0}")]
    Core(#[from] stratolink_core::CoreError),
}

/// Result type for Stratolink Frame operations
pub type Result<T> = std::result::Result<T, FrameError>;
