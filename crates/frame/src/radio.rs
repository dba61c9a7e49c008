//! Resumable radio-modem frame codec
//!
//! Both radio modems speak the same API framing and differ only in
//! constants: which identifiers mark transmit and receive frames, how wide
//! the receive header is (source address plus modem-specific fields) and
//! how large a payload may be. One state machine serves both, configured
//! by a [`LinkProfile`].
//!
//! Wire format:
//!
//! ```text
//! | 0x7E | length (u16 BE) | api id | header | payload | checksum |
//! ```
//!
//! `length` counts api id through payload. `checksum` is
//! `0xFF - sum(api id ..= payload)` mod 256.
//!
//! Decoding is incremental: a call with too few bytes buffered returns
//! `None` immediately and resumes exactly where it stopped on the next
//! call. Every frame attempt concludes with exactly one event: a valid
//! frame, a checksum mismatch, or a rejection.

use tracing::debug;

use crate::{FrameError, Result};
use stratolink_core::io::SerialPort;

/// Frame start delimiter.
pub const START_DELIMITER: u8 = 0x7E;

/// Widest receive header across the supported modems (64-bit source,
/// 16-bit network address, options byte).
pub const MAX_HEADER_LEN: usize = 11;

/// Largest payload across the supported modems.
pub const MAX_PAYLOAD_LEN: usize = 128;

/// The constants that distinguish one modem's framing from the other's.
#[derive(Debug, Clone, Copy)]
pub struct LinkProfile {
    pub name: &'static str,
    pub transmit_id: u8,
    pub receive_id: u8,
    /// Bytes between the api id and the payload in a receive frame.
    pub header_len: u16,
    pub payload_capacity: u16,
}

/// A decoded receive frame, header still raw; the per-modem link layers
/// interpret the header bytes.
#[derive(Debug, Clone)]
pub struct RadioFrame {
    /// Declared length: api id through payload.
    pub length: u16,
    pub api_id: u8,
    header: [u8; MAX_HEADER_LEN],
    header_len: usize,
    payload: [u8; MAX_PAYLOAD_LEN],
    payload_len: usize,
}

impl RadioFrame {
    fn empty() -> Self {
        Self {
            length: 0,
            api_id: 0,
            header: [0; MAX_HEADER_LEN],
            header_len: 0,
            payload: [0; MAX_PAYLOAD_LEN],
            payload_len: 0,
        }
    }

    /// Source address and modem-specific fields, as received.
    pub fn header(&self) -> &[u8] {
        &self.header[..self.header_len]
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }
}

/// Why an in-flight frame was abandoned before its checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Declared length too small to hold an api identifier.
    EmptyFrame,
    /// The api identifier is not this link's receive id.
    UnexpectedApiId(u8),
    /// Declared length too small to hold the receive header.
    TruncatedHeader(u16),
    /// Declared payload larger than the modem ever sends.
    PayloadOverrun(u16),
}

/// The single event a concluded frame attempt produces. The per-modem
/// link layers substitute their typed frame view for `F`.
#[derive(Debug)]
pub enum LinkEvent<F> {
    /// Checksum verified; the frame is valid.
    Received(F),
    /// Fully parsed but the checksum disagreed; the frame is withheld.
    ChecksumMismatch,
    /// Malformed header; the declared remainder was drained.
    Rejected(RejectReason),
}

/// The receiver's own event: a raw, uninterpreted frame.
pub type FrameEvent<'a> = LinkEvent<&'a RadioFrame>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AwaitStart,
    Length,
    ApiId,
    Header,
    Payload,
    Checksum,
    Drain,
}

/// Resumable receive state machine for one modem link.
#[derive(Debug)]
pub struct FrameReceiver {
    profile: LinkProfile,
    stage: Stage,
    frame: RadioFrame,
    remaining: u16,
    checksum: u8,
    drain_remaining: u16,
    reject: Option<RejectReason>,
}

impl FrameReceiver {
    pub fn new(profile: LinkProfile) -> Self {
        Self {
            profile,
            stage: Stage::AwaitStart,
            frame: RadioFrame::empty(),
            remaining: 0,
            checksum: 0,
            drain_remaining: 0,
            reject: None,
        }
    }

    /// Advance the decoder as far as the buffered bytes allow.
    ///
    /// Returns `None` while a frame is still incomplete (state is kept for
    /// the next call) and `Some` exactly once per concluded attempt.
    pub fn receive<P: SerialPort>(&mut self, port: &mut P) -> Option<FrameEvent<'_>> {
        while self.stage == Stage::AwaitStart {
            if port.bytes_available() < 1 {
                return None;
            }
            if port.read_byte()? == START_DELIMITER {
                self.checksum = 0;
                self.stage = Stage::Length;
            }
        }

        if self.stage == Stage::Length {
            if port.bytes_available() < 2 {
                return None;
            }
            let hi = port.read_byte()?;
            let lo = port.read_byte()?;
            self.frame.length = u16::from_be_bytes([hi, lo]);
            self.remaining = self.frame.length;

            if self.remaining < 1 {
                debug!(
                    link = self.profile.name,
                    "rejecting frame: no room for an api identifier"
                );
                return self.fail(port, RejectReason::EmptyFrame);
            }
            self.stage = Stage::ApiId;
        }

        if self.stage == Stage::ApiId {
            if port.bytes_available() < 1 {
                return None;
            }
            let api_id = port.read_byte()?;
            self.frame.api_id = api_id;
            self.checksum = self.checksum.wrapping_add(api_id);
            self.remaining -= 1;

            if api_id != self.profile.receive_id {
                debug!(
                    link = self.profile.name,
                    api_id, "rejecting frame: unhandled api identifier"
                );
                return self.fail(port, RejectReason::UnexpectedApiId(api_id));
            }
            if self.remaining < self.profile.header_len {
                debug!(
                    link = self.profile.name,
                    remaining = self.remaining,
                    "rejecting frame: too short for the receive header"
                );
                return self.fail(port, RejectReason::TruncatedHeader(self.remaining));
            }
            self.stage = Stage::Header;
        }

        if self.stage == Stage::Header {
            let header_len = self.profile.header_len as usize;
            if port.bytes_available() < header_len {
                return None;
            }
            for i in 0..header_len {
                let byte = port.read_byte()?;
                self.frame.header[i] = byte;
                self.checksum = self.checksum.wrapping_add(byte);
            }
            self.frame.header_len = header_len;
            self.remaining -= self.profile.header_len;
            self.stage = Stage::Payload;
        }

        if self.stage == Stage::Payload {
            if self.remaining > self.profile.payload_capacity {
                debug!(
                    link = self.profile.name,
                    remaining = self.remaining,
                    "rejecting frame: payload exceeds modem capacity"
                );
                return self.fail(port, RejectReason::PayloadOverrun(self.remaining));
            }
            let payload_len = self.remaining as usize;
            if port.bytes_available() < payload_len {
                return None;
            }
            for i in 0..payload_len {
                let byte = port.read_byte()?;
                self.frame.payload[i] = byte;
                self.checksum = self.checksum.wrapping_add(byte);
            }
            self.frame.payload_len = payload_len;
            self.remaining = 0;
            self.stage = Stage::Checksum;
        }

        if self.stage == Stage::Checksum {
            if port.bytes_available() < 1 {
                return None;
            }
            let received = port.read_byte()?;
            self.stage = Stage::AwaitStart;

            return if received == 0xFF - self.checksum {
                Some(FrameEvent::Received(&self.frame))
            } else {
                debug!(link = self.profile.name, "frame failed its checksum");
                Some(FrameEvent::ChecksumMismatch)
            };
        }

        if self.stage == Stage::Drain {
            return self.drain(port);
        }

        None
    }

    /// Abandon the in-flight frame: remember why, then consume the
    /// declared-but-unread remainder before reporting. The stray checksum
    /// byte that follows is discarded by the start-delimiter scan.
    fn fail<P: SerialPort>(&mut self, port: &mut P, reason: RejectReason) -> Option<FrameEvent<'_>> {
        self.reject = Some(reason);
        self.drain_remaining = self.remaining;
        self.remaining = 0;
        self.stage = Stage::Drain;
        self.drain(port)
    }

    /// Consume as much of the abandoned frame as the port holds; report
    /// the rejection once it is fully drained.
    fn drain<P: SerialPort>(&mut self, port: &mut P) -> Option<FrameEvent<'_>> {
        while self.drain_remaining > 0 {
            if port.bytes_available() < 1 {
                return None;
            }
            port.read_byte()?;
            self.drain_remaining -= 1;
        }
        self.stage = Stage::AwaitStart;
        let reason = self.reject.take()?;
        Some(FrameEvent::Rejected(reason))
    }
}

/// Write one frame: delimiter, big-endian length, the given header bytes
/// (api id first), payload, and the checksum computed in the same pass.
pub fn send_frame<P: SerialPort>(port: &mut P, header: &[u8], payload: &[u8]) -> Result<()> {
    port.write_byte(START_DELIMITER).map_err(FrameError::Core)?;

    let length = (header.len() + payload.len()) as u16;
    port.write_all(&length.to_be_bytes()).map_err(FrameError::Core)?;

    let mut checksum = 0u8;
    for &byte in header.iter().chain(payload) {
        checksum = checksum.wrapping_add(byte);
        port.write_byte(byte).map_err(FrameError::Core)?;
    }
    port.write_byte(0xFF - checksum).map_err(FrameError::Core)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratolink_core::io::LoopbackPort;

    const TEST_PROFILE: LinkProfile = LinkProfile {
        name: "test",
        transmit_id: 0x01,
        receive_id: 0x81,
        header_len: 4,
        payload_capacity: 16,
    };

    fn receive_frame(header: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut port = LoopbackPort::new();
        send_frame(&mut port, header, payload).unwrap();
        port.drain()
    }

    #[test]
    fn test_round_trip_byte_at_a_time() {
        let header = [0x81, 0xAA, 0xBB, 0x26, 0x00];
        let payload = [0xDE, 0xAD, 0xBE, 0xEF];
        let wire = receive_frame(&header, &payload);

        let mut rx = FrameReceiver::new(TEST_PROFILE);
        let mut port = LoopbackPort::new();
        let mut completions = 0;

        for (i, &byte) in wire.iter().enumerate() {
            port.feed(&[byte]);
            match rx.receive(&mut port) {
                None => assert!(i + 1 < wire.len(), "no event on the final byte"),
                Some(FrameEvent::Received(frame)) => {
                    assert_eq!(i + 1, wire.len(), "completed early");
                    assert_eq!(frame.api_id, 0x81);
                    assert_eq!(frame.header(), &[0xAA, 0xBB, 0x26, 0x00]);
                    assert_eq!(frame.payload(), &payload);
                    assert_eq!(frame.length, 9);
                    completions += 1;
                }
                Some(other) => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_corrupted_byte_reports_mismatch_not_hang() {
        let header = [0x81, 0xAA, 0xBB, 0x26, 0x00];
        let payload = [1, 2, 3];

        // Flip one bit in every position after the length field in turn.
        for corrupt_at in 3..10 {
            let mut wire = receive_frame(&header, &payload);
            wire[corrupt_at] ^= 0x40;

            let mut rx = FrameReceiver::new(TEST_PROFILE);
            let mut port = LoopbackPort::new();
            port.feed(&wire);

            match rx.receive(&mut port) {
                Some(FrameEvent::ChecksumMismatch) | Some(FrameEvent::Rejected(_)) => {}
                other => panic!("corruption at {} produced {:?}", corrupt_at, other),
            }
        }
    }

    #[test]
    fn test_under_delivery_never_completes() {
        let wire = receive_frame(&[0x81, 0xAA, 0xBB, 0x26, 0x00], &[9, 9, 9]);

        let mut rx = FrameReceiver::new(TEST_PROFILE);
        let mut port = LoopbackPort::new();
        port.feed(&wire[..wire.len() - 1]);

        // Repeated polls on a starved stream stay pending.
        for _ in 0..3 {
            assert!(rx.receive(&mut port).is_none());
        }
        port.feed(&wire[wire.len() - 1..]);
        assert!(matches!(rx.receive(&mut port), Some(FrameEvent::Received(_))));
    }

    #[test]
    fn test_garbage_before_delimiter_is_skipped() {
        let mut wire = vec![0x00, 0x13, 0xFF];
        wire.extend(receive_frame(&[0x81, 1, 2, 3, 4], &[5]));

        let mut rx = FrameReceiver::new(TEST_PROFILE);
        let mut port = LoopbackPort::new();
        port.feed(&wire);
        assert!(matches!(rx.receive(&mut port), Some(FrameEvent::Received(_))));
    }

    #[test]
    fn test_unexpected_api_id_drains_and_resyncs() {
        // A transmit-id frame arriving at a receiver must be rejected and
        // must not poison the frame that follows it.
        let bad = receive_frame(&[0x01, 0xAA, 0xBB, 0x26, 0x00], &[7, 7, 7, 7]);
        let good = receive_frame(&[0x81, 0xAA, 0xBB, 0x26, 0x00], &[1, 2]);

        let mut rx = FrameReceiver::new(TEST_PROFILE);
        let mut port = LoopbackPort::new();
        port.feed(&bad);
        port.feed(&good);

        match rx.receive(&mut port) {
            Some(FrameEvent::Rejected(RejectReason::UnexpectedApiId(0x01))) => {}
            other => panic!("expected rejection, got {:?}", other),
        }
        match rx.receive(&mut port) {
            Some(FrameEvent::Received(frame)) => assert_eq!(frame.payload(), &[1, 2]),
            other => panic!("expected the good frame, got {:?}", other),
        }
    }

    #[test]
    fn test_drain_is_incremental() {
        let bad = receive_frame(&[0x01, 0xAA, 0xBB, 0x26, 0x00], &[7; 8]);

        let mut rx = FrameReceiver::new(TEST_PROFILE);
        let mut port = LoopbackPort::new();

        // Deliver the malformed frame in two pieces: the rejection is
        // reported only once the declared remainder has been consumed.
        port.feed(&bad[..6]);
        assert!(rx.receive(&mut port).is_none());
        port.feed(&bad[6..]);
        assert!(matches!(
            rx.receive(&mut port),
            Some(FrameEvent::Rejected(RejectReason::UnexpectedApiId(0x01)))
        ));
    }

    #[test]
    fn test_payload_overrun_rejected() {
        // Declared length implies 17 payload bytes against a 16-byte cap.
        let mut wire = vec![START_DELIMITER];
        wire.extend((22u16).to_be_bytes());
        wire.push(0x81);
        wire.extend([0u8; 21]);
        wire.push(0x00);

        let mut rx = FrameReceiver::new(TEST_PROFILE);
        let mut port = LoopbackPort::new();
        port.feed(&wire);
        assert!(matches!(
            rx.receive(&mut port),
            Some(FrameEvent::Rejected(RejectReason::PayloadOverrun(17)))
        ));
    }

    #[test]
    fn test_declared_length_shorter_than_header() {
        let wire = [START_DELIMITER, 0x00, 0x03, 0x81, 0x00, 0x00, 0x00];

        let mut rx = FrameReceiver::new(TEST_PROFILE);
        let mut port = LoopbackPort::new();
        port.feed(&wire);
        assert!(matches!(
            rx.receive(&mut port),
            Some(FrameEvent::Rejected(RejectReason::TruncatedHeader(2)))
        ));
    }

    #[test]
    fn test_send_frame_propagates_port_errors() {
        let mut port = stratolink_core::io::BrokenPort;
        assert!(send_frame(&mut port, &[0x01], &[0x02]).is_err());
    }
}
