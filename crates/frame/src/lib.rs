//! Stratolink Frame - wire framing for the balloon radio links
//!
//! This crate builds AX25/APRS frames for the AFSK broadcast channel,
//! frames payloads for the two point-to-point radio modems, and codes the
//! compact auxiliary link between companion boards.

pub mod crc;
pub mod ax25;
pub mod mice;
pub mod radio;
pub mod xbee;
pub mod xtend;
pub mod compact;
pub mod error;

pub use error::{FrameError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        ax25::{Ax25Encoder, StationAddress},
        mice::MicE,
        radio::{FrameReceiver, LinkEvent, RadioFrame, RejectReason},
        xbee::XbeeLink,
        xtend::XtendLink,
        compact::{Crc32Decoder, XorDecoder},
        error::{FrameError, Result},
    };
}
