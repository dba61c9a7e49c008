//! AX25 HDLC frame encoder
//!
//! Builds the complete on-air bit sequence for an APRS UI frame: zero-byte
//! preamble, opening flags, bit-shifted address chain, control and PID
//! bytes, the information field, the complemented CRC-16/X.25 and closing
//! flags. Data bytes are emitted LSB-first with HDLC bit stuffing; the
//! preamble and flag bytes bypass both stuffing and the CRC.

use crate::crc::Crc16;
use crate::{FrameError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use stratolink_core::bits::BitSeq;

/// HDLC frame delimiter.
const FLAG: u8 = 0x7E;

/// Unnumbered-information control field.
const CONTROL_UI: u8 = 0x03;

/// "No layer 3 protocol" PID.
const PID_NONE: u8 = 0xF0;

/// Zero bytes sent ahead of the first flag so the receiver's demodulator
/// can settle before real data arrives.
const PREAMBLE_ZERO_BYTES: usize = 100;
const PREFIX_FLAG_BYTES: usize = 3;
const SUFFIX_FLAG_BYTES: usize = 50;

/// Longest information field accepted by `encode`.
pub const MAX_MESSAGE_LEN: usize = 256;

/// Longest digipeater path accepted by `encode`.
pub const MAX_PATH_LEN: usize = 8;

/// Bits needed for a worst-case frame: preamble and flags at 8 bits per
/// byte, every stuffable byte at 10, which leaves headroom over the true
/// worst case of one inserted zero per five data bits.
pub const FRAME_BIT_CAPACITY: usize =
    (PREAMBLE_ZERO_BYTES + PREFIX_FLAG_BYTES + SUFFIX_FLAG_BYTES) * 8
        + (7 * (2 + MAX_PATH_LEN) + 1 + 1 + MAX_MESSAGE_LEN + 2) * 10;

/// An AX25 station address: 6-character call sign plus SSID digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationAddress {
    call: [u8; 6],
    ssid: u8,
}

impl StationAddress {
    /// Build an address from a call sign and SSID. The call sign is
    /// truncated or space-padded to exactly 6 characters; the SSID is a
    /// single digit 0..=9.
    pub fn new(callsign: &str, ssid: u8) -> Self {
        let mut call = [b' '; 6];
        for (slot, byte) in call.iter_mut().zip(callsign.bytes()) {
            *slot = byte;
        }
        Self { call, ssid: ssid % 10 }
    }

    pub(crate) fn from_raw(call: [u8; 6], ssid: u8) -> Self {
        Self { call, ssid }
    }

    /// The space-padded call sign bytes.
    pub fn call(&self) -> &[u8; 6] {
        &self.call
    }

    pub fn ssid(&self) -> u8 {
        self.ssid
    }
}

impl fmt::Display for StationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.call.iter().filter(|&&b| b != b' ') {
            write!(f, "{}", byte as char)?;
        }
        write!(f, "-{}", self.ssid)
    }
}

/// Builds AX25 UI frames into a caller-provided bit sequence.
#[derive(Debug)]
pub struct Ax25Encoder {
    crc: Crc16,
    consecutive_ones: u8,
}

impl Ax25Encoder {
    pub fn new() -> Self {
        Self {
            crc: Crc16::new(),
            consecutive_ones: 0,
        }
    }

    /// A bit sequence sized for any frame `encode` will accept.
    pub fn frame_bits() -> BitSeq {
        BitSeq::with_capacity(FRAME_BIT_CAPACITY)
    }

    /// Encode one UI frame into `out`, replacing its previous contents.
    ///
    /// The final address in the chain (the source when `path` is empty,
    /// otherwise the last path entry) carries the HDLC last-address
    /// marker in its SSID byte.
    pub fn encode(
        &mut self,
        out: &mut BitSeq,
        source: &StationAddress,
        destination: &StationAddress,
        path: &[StationAddress],
        message: &[u8],
    ) -> Result<()> {
        if message.len() > MAX_MESSAGE_LEN {
            return Err(FrameError::MessageTooLong {
                len: message.len(),
                max: MAX_MESSAGE_LEN,
            });
        }
        if path.len() > MAX_PATH_LEN {
            return Err(FrameError::PathTooLong {
                len: path.len(),
                max: MAX_PATH_LEN,
            });
        }

        out.clear();
        self.crc = Crc16::new();
        self.consecutive_ones = 0;

        for _ in 0..PREAMBLE_ZERO_BYTES {
            self.raw_byte(out, 0x00)?;
        }
        for _ in 0..PREFIX_FLAG_BYTES {
            self.raw_byte(out, FLAG)?;
        }

        self.address(out, destination, false)?;
        self.address(out, source, path.is_empty())?;
        for (i, hop) in path.iter().enumerate() {
            self.address(out, hop, i + 1 == path.len())?;
        }

        self.data_byte(out, CONTROL_UI)?;
        self.data_byte(out, PID_NONE)?;
        for &byte in message {
            self.data_byte(out, byte)?;
        }

        // Capture before the FCS bytes themselves run through the CRC.
        let fcs = self.crc.complemented();
        self.data_byte(out, (fcs & 0xFF) as u8)?;
        self.data_byte(out, (fcs >> 8) as u8)?;

        for _ in 0..SUFFIX_FLAG_BYTES {
            self.raw_byte(out, FLAG)?;
        }
        Ok(())
    }

    /// Emit a preamble or flag byte: no CRC, no stuffing.
    fn raw_byte(&mut self, out: &mut BitSeq, byte: u8) -> Result<()> {
        for i in 0..8 {
            out.push((byte >> i) & 0x1 != 0)?;
        }
        Ok(())
    }

    /// Emit a data byte LSB-first, feeding the CRC and stuffing a zero
    /// after every run of five ones.
    fn data_byte(&mut self, out: &mut BitSeq, byte: u8) -> Result<()> {
        for i in 0..8 {
            let bit = (byte >> i) & 0x1 != 0;
            out.push(bit)?;
            self.crc.update_bit(bit);

            if !bit {
                self.consecutive_ones = 0;
            } else {
                self.consecutive_ones += 1;
                if self.consecutive_ones >= 5 {
                    out.push(false)?;
                    self.consecutive_ones = 0;
                }
            }
        }
        Ok(())
    }

    /// Emit one address: call bytes shifted left, then the SSID byte with
    /// the last-address marker in bit 0.
    fn address(&mut self, out: &mut BitSeq, addr: &StationAddress, last: bool) -> Result<()> {
        for &byte in addr.call() {
            self.data_byte(out, byte << 1)?;
        }
        let ssid = ((b'0' + addr.ssid()) << 1) | u8::from(last);
        self.data_byte(out, ssid)
    }
}

impl Default for Ax25Encoder {
    fn default() -> Self {
        Self::new()
    }
}
