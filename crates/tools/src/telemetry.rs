//! Bit-packed telemetry record
//!
//! The downlink record the tracker sends every telemetry interval. Fields
//! are packed MSB-first at the widths below; the layout is fixed by the
//! ground-station decoder, so any change here is a protocol change.
//!
//! ```text
//! offset  width  field            encoding
//!      0      8  packet type      0x03
//!      8     16  time             seconds since launch
//!     24     32  latitude         f32 bits
//!     56     32  longitude        f32 bits
//!     88     18  altitude         meters, two's complement
//!    106     10  course           degrees, 0..=359
//!    116      8  speed            m/s
//!    124     24  pressure         Pa
//!    148      8  internal temp    deg C, two's complement
//!    156      8  external temp    deg C, two's complement
//!    164     16  battery          mV
//! ```

use anyhow::{bail, Context, Result};
use stratolink_core::bitpack::{BitPacker, BitUnpacker};

/// Packet-type tag for a telemetry record.
pub const PACKET_TYPE_TELEMETRY: u8 = 0x03;

/// Packed size: 180 bits rounded up to whole bytes.
pub const PACKED_LEN: usize = 23;

/// One cycle's worth of sensor readings, ready for the downlink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    pub time_s: u16,
    pub latitude: f32,
    pub longitude: f32,
    pub altitude_m: i32,
    pub course_deg: u16,
    pub speed_mps: u8,
    pub pressure_pa: u32,
    pub temp_internal_c: i8,
    pub temp_external_c: i8,
    pub battery_mv: u16,
}

impl TelemetryRecord {
    /// Pack the record into its wire layout.
    pub fn pack(&self, buf: &mut [u8; PACKED_LEN]) -> Result<()> {
        let mut packer = BitPacker::new(buf);
        packer.put(PACKET_TYPE_TELEMETRY as u32, 8)?;
        packer.put(self.time_s as u32, 16)?;
        packer.put(self.latitude.to_bits(), 32)?;
        packer.put(self.longitude.to_bits(), 32)?;
        packer
            .put_signed(self.altitude_m, 18)
            .context("altitude out of the 18-bit range")?;
        packer
            .put(self.course_deg as u32, 10)
            .context("course out of the 10-bit range")?;
        packer.put(self.speed_mps as u32, 8)?;
        packer
            .put(self.pressure_pa, 24)
            .context("pressure out of the 24-bit range")?;
        packer.put_signed(self.temp_internal_c as i32, 8)?;
        packer.put_signed(self.temp_external_c as i32, 8)?;
        packer.put(self.battery_mv as u32, 16)?;
        Ok(())
    }

    /// Decode a record packed by [`TelemetryRecord::pack`].
    pub fn unpack(buf: &[u8; PACKED_LEN]) -> Result<Self> {
        let mut unpacker = BitUnpacker::new(buf);

        let packet_type = unpacker.take(8)? as u8;
        if packet_type != PACKET_TYPE_TELEMETRY {
            bail!("packet type {:#04x} is not telemetry", packet_type);
        }

        Ok(Self {
            time_s: unpacker.take(16)? as u16,
            latitude: f32::from_bits(unpacker.take(32)?),
            longitude: f32::from_bits(unpacker.take(32)?),
            altitude_m: unpacker.take_signed(18)?,
            course_deg: unpacker.take(10)? as u16,
            speed_mps: unpacker.take(8)? as u8,
            pressure_pa: unpacker.take(24)?,
            temp_internal_c: unpacker.take_signed(8)? as i8,
            temp_external_c: unpacker.take_signed(8)? as i8,
            battery_mv: unpacker.take(16)? as u16,
        })
    }
}
