//! Byte-stream capability trait and an in-memory port
//!
//! The framing layers never block on I/O: decoders ask how many bytes are
//! available before consuming anything, and a call with too few bytes
//! returns immediately with parser state preserved. Any UART, USB-CDC or
//! socket wrapper that can answer those three questions can carry the
//! protocols.

use crate::{CoreError, Result};
use std::collections::VecDeque;

/// A polled, non-blocking byte stream.
pub trait SerialPort {
    /// Number of bytes that can be read without blocking.
    fn bytes_available(&self) -> usize;

    /// Read one byte, or `None` when nothing is buffered.
    fn read_byte(&mut self) -> Option<u8>;

    /// Write one byte.
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Write a buffer in order.
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        for &byte in data {
            self.write_byte(byte)?;
        }
        Ok(())
    }
}

/// An in-memory port: writes become readable in FIFO order.
///
/// Used by the tests and the beacon simulator to run an encoder and a
/// decoder against each other without hardware.
#[derive(Debug, Default)]
pub struct LoopbackPort {
    queue: VecDeque<u8>,
}

impl LoopbackPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push received bytes into the read side, as a driver ISR would.
    pub fn feed(&mut self, data: &[u8]) {
        self.queue.extend(data.iter().copied());
    }

    /// Take every buffered byte out of the port.
    pub fn drain(&mut self) -> Vec<u8> {
        self.queue.drain(..).collect()
    }
}

impl SerialPort for LoopbackPort {
    fn bytes_available(&self) -> usize {
        self.queue.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.queue.pop_front()
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.queue.push_back(byte);
        Ok(())
    }
}

/// A port that errors on write, for exercising failure paths.
#[derive(Debug, Default)]
pub struct BrokenPort;

impl SerialPort for BrokenPort {
    fn bytes_available(&self) -> usize {
        0
    }

    fn read_byte(&mut self) -> Option<u8> {
        None
    }

    fn write_byte(&mut self, _byte: u8) -> Result<()> {
        Err(CoreError::Io {
            msg: "port disconnected".to_string(),
        })
    }
}
