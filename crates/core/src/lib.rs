//! Stratolink Core - shared primitives
//!
//! This crate provides the fixed-capacity bit sequence used by the AX25
//! encoder and AFSK modulator, explicit bit packing over byte buffers,
//! and the byte-stream capability trait consumed by the framing layers.

pub mod bits;
pub mod bitpack;
pub mod io;
pub mod error;

pub use error::{CoreError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        bits::BitSeq,
        bitpack::{BitPacker, BitUnpacker},
        io::{LoopbackPort, SerialPort},
        error::{CoreError, Result},
    };
}
