//! XBee ZB modem link layer
//!
//! 64-bit addressing with a 16-bit network address alongside, and a
//! 72-byte payload. Transmit frames broadcast-radius 0 (maximum) and leave
//! the 16-bit destination as 0xFFFE ("unknown"), letting the mesh resolve
//! the route from the 64-bit address.

use crate::radio::{self, FrameReceiver, LinkEvent, LinkProfile, RadioFrame};
use crate::{FrameError, Result};
use stratolink_core::io::SerialPort;

pub const TRANSMIT_ID: u8 = 0x10;
pub const RECEIVE_ID: u8 = 0x90;

/// Largest payload the modem firmware will send in one frame.
pub const PAYLOAD_CAPACITY: usize = 72;

/// Receive header: 64-bit source, 16-bit network address, options.
const HEADER_LEN: u16 = 11;

/// 16-bit destination meaning "network address unknown".
const NETWORK_UNKNOWN: u16 = 0xFFFE;

pub const PROFILE: LinkProfile = LinkProfile {
    name: "xbee",
    transmit_id: TRANSMIT_ID,
    receive_id: RECEIVE_ID,
    header_len: HEADER_LEN,
    payload_capacity: PAYLOAD_CAPACITY as u16,
};

/// A validated receive frame, header fields decoded.
#[derive(Debug)]
pub struct XbeeFrame<'a> {
    pub source: u64,
    pub network: u16,
    pub options: u8,
    pub payload: &'a [u8],
}

impl<'a> XbeeFrame<'a> {
    fn from_raw(raw: &'a RadioFrame) -> Self {
        let header = raw.header();
        let mut source = [0u8; 8];
        source.copy_from_slice(&header[..8]);
        Self {
            source: u64::from_be_bytes(source),
            network: u16::from_be_bytes([header[8], header[9]]),
            options: header[10],
            payload: raw.payload(),
        }
    }
}

/// One XBee modem on one serial port's worth of state.
#[derive(Debug)]
pub struct XbeeLink {
    receiver: FrameReceiver,
}

impl XbeeLink {
    pub fn new() -> Self {
        Self {
            receiver: FrameReceiver::new(PROFILE),
        }
    }

    /// Frame `payload` for the 64-bit `dest` and write it to the port in
    /// one pass.
    pub fn send_to<P: SerialPort>(&self, port: &mut P, dest: u64, payload: &[u8]) -> Result<()> {
        if payload.len() > PAYLOAD_CAPACITY {
            return Err(FrameError::PayloadTooLarge {
                len: payload.len(),
                max: PAYLOAD_CAPACITY,
            });
        }

        let dest = dest.to_be_bytes();
        let network = NETWORK_UNKNOWN.to_be_bytes();
        let mut header = [0u8; 14];
        header[0] = TRANSMIT_ID;
        header[1] = 0x00; // frame id: no transmit status wanted
        header[2..10].copy_from_slice(&dest);
        header[10..12].copy_from_slice(&network);
        header[12] = 0x00; // broadcast radius: maximum
        header[13] = 0x00; // options
        radio::send_frame(port, &header, payload)
    }

    /// Advance the receive state machine; see [`FrameReceiver::receive`].
    pub fn receive<P: SerialPort>(&mut self, port: &mut P) -> Option<LinkEvent<XbeeFrame<'_>>> {
        Some(match self.receiver.receive(port)? {
            LinkEvent::Received(raw) => LinkEvent::Received(XbeeFrame::from_raw(raw)),
            LinkEvent::ChecksumMismatch => LinkEvent::ChecksumMismatch,
            LinkEvent::Rejected(reason) => LinkEvent::Rejected(reason),
        })
    }
}

impl Default for XbeeLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratolink_core::io::LoopbackPort;

    #[test]
    fn test_transmit_frame_golden_bytes() {
        let mut port = LoopbackPort::new();
        XbeeLink::new()
            .send_to(&mut port, 0x0013_A200_40B9_7E12, b"hi")
            .unwrap();

        assert_eq!(
            port.drain(),
            vec![
                0x7E, 0x00, 0x10, // length 16
                0x10, 0x00, // transmit request, frame id 0
                0x00, 0x13, 0xA2, 0x00, 0x40, 0xB9, 0x7E, 0x12, // dest, big-endian
                0xFF, 0xFE, // network address unknown
                0x00, 0x00, // broadcast radius, options
                0x68, 0x69, // "hi"
                0xE3,
            ]
        );
    }

    #[test]
    fn test_receive_round_trip_one_byte_at_a_time() {
        let mut staging = LoopbackPort::new();
        let mut header = [0u8; 12];
        header[0] = RECEIVE_ID;
        header[1..9].copy_from_slice(&0x0013_A200_1234_5678u64.to_be_bytes());
        header[9..11].copy_from_slice(&0xC001u16.to_be_bytes());
        header[11] = 0x01;
        radio::send_frame(&mut staging, &header, b"ping").unwrap();
        let wire = staging.drain();

        let mut link = XbeeLink::new();
        let mut port = LoopbackPort::new();
        for (i, &byte) in wire.iter().enumerate() {
            port.feed(&[byte]);
            match link.receive(&mut port) {
                None => assert!(i + 1 < wire.len()),
                Some(LinkEvent::Received(frame)) => {
                    assert_eq!(i + 1, wire.len());
                    assert_eq!(frame.source, 0x0013_A200_1234_5678);
                    assert_eq!(frame.network, 0xC001);
                    assert_eq!(frame.options, 0x01);
                    assert_eq!(frame.payload, b"ping");
                }
                Some(other) => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_payload_capacity_enforced_on_send() {
        let mut port = LoopbackPort::new();
        let oversize = vec![0u8; PAYLOAD_CAPACITY + 1];
        assert!(matches!(
            XbeeLink::new().send_to(&mut port, 1, &oversize),
            Err(FrameError::PayloadTooLarge { .. })
        ));
    }
}
