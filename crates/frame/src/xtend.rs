//! XTend 900 MHz modem link layer
//!
//! 16-bit addressing, an RSSI byte on every receive frame, and a 128-byte
//! payload. Transmit frames carry frame id 0 (no transmit status) and the
//! disable-ACK option: telemetry is periodic, so a lost frame is cheaper
//! than a retransmit storm.

use crate::radio::{self, FrameReceiver, LinkEvent, LinkProfile, RadioFrame};
use crate::{FrameError, Result};
use stratolink_core::io::SerialPort;

pub const TRANSMIT_ID: u8 = 0x01;
pub const RECEIVE_ID: u8 = 0x81;

pub const OPTION_STANDARD: u8 = 0x00;
pub const OPTION_DISABLE_ACK: u8 = 0x01;

/// Largest payload the modem firmware will send in one frame.
pub const PAYLOAD_CAPACITY: usize = 128;

/// Receive header: 16-bit source, RSSI, options.
const HEADER_LEN: u16 = 4;

pub const PROFILE: LinkProfile = LinkProfile {
    name: "xtend",
    transmit_id: TRANSMIT_ID,
    receive_id: RECEIVE_ID,
    header_len: HEADER_LEN,
    payload_capacity: PAYLOAD_CAPACITY as u16,
};

/// A validated receive frame, header fields decoded.
#[derive(Debug)]
pub struct XtendFrame<'a> {
    pub source: u16,
    pub rssi: u8,
    pub options: u8,
    pub payload: &'a [u8],
}

impl<'a> XtendFrame<'a> {
    fn from_raw(raw: &'a RadioFrame) -> Self {
        let header = raw.header();
        Self {
            source: u16::from_be_bytes([header[0], header[1]]),
            rssi: header[2],
            options: header[3],
            payload: raw.payload(),
        }
    }
}

/// One XTend modem on one serial port's worth of state.
#[derive(Debug)]
pub struct XtendLink {
    receiver: FrameReceiver,
}

impl XtendLink {
    pub fn new() -> Self {
        Self {
            receiver: FrameReceiver::new(PROFILE),
        }
    }

    /// Frame `payload` for `dest` and write it to the port in one pass.
    pub fn send_to<P: SerialPort>(&self, port: &mut P, dest: u16, payload: &[u8]) -> Result<()> {
        if payload.len() > PAYLOAD_CAPACITY {
            return Err(FrameError::PayloadTooLarge {
                len: payload.len(),
                max: PAYLOAD_CAPACITY,
            });
        }

        let dest = dest.to_be_bytes();
        let header = [TRANSMIT_ID, 0x00, dest[0], dest[1], OPTION_DISABLE_ACK];
        radio::send_frame(port, &header, payload)
    }

    /// Advance the receive state machine; see [`FrameReceiver::receive`].
    pub fn receive<P: SerialPort>(&mut self, port: &mut P) -> Option<LinkEvent<XtendFrame<'_>>> {
        Some(match self.receiver.receive(port)? {
            LinkEvent::Received(raw) => LinkEvent::Received(XtendFrame::from_raw(raw)),
            LinkEvent::ChecksumMismatch => LinkEvent::ChecksumMismatch,
            LinkEvent::Rejected(reason) => LinkEvent::Rejected(reason),
        })
    }
}

impl Default for XtendLink {
    fn default() -> Self {
        Self::new()
    }
}
