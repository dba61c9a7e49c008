//! Error types for Stratolink Core

use thiserror::Error;

/// Core primitive error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("buffer full: capacity of {capacity} exceeded")]
    BufferFull { capacity: usize },

    #[error("value {value} does not fit in {width} bits")]
    FieldOverflow { value: i64, width: u32 },

    #[error("bit width {width} is out of range (1..=32)")]
    InvalidWidth { width: u32 },

    #[error("serial I/O failed: {msg}")]
    Io { msg: String },
}

/// Result type for Stratolink Core operations
pub type Result<T> = std::result::Result<T, CoreError>;
