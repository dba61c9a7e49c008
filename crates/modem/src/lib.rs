//! Stratolink Modem - AFSK modulation
//!
//! This crate turns an AX25 bit sequence into timed two-tone audio
//! samples under a periodic timing capability, keying the transmitter
//! while a frame is on the air.

pub mod afsk;
pub mod hal;
pub mod error;

pub use error::{ModemError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        afsk::{AfskConfig, AfskModulator, TransmitFlag},
        hal::{NoPin, OutputPin, SampleSink, SampleTimer},
        error::{ModemError, Result},
    };
}
