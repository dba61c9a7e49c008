//! APRS Mic-E position compression
//!
//! Packs a GPS fix into the two places an AX25 frame has room for it: the
//! latitude digits ride in the destination call sign (with message-type and
//! sign flags encoded as ASCII offsets on individual digits), and a 13-byte
//! information field carries longitude, speed, course, symbol and altitude.
//!
//! Position ambiguity is not supported: every fix is encoded at full
//! precision.

use crate::ax25::StationAddress;
use crate::{FrameError, Result};

/// Length of the encoded information field.
pub const INFO_LEN: usize = 13;

/// Offset applied to a destination digit to set its flag bit.
const DIGIT_FLAG: u8 = b'P' - b'0';

const KNOTS_PER_MPS: f64 = 1.94384449;

/// A GPS fix plus display symbol, ready for Mic-E encoding.
#[derive(Debug, Clone, Copy)]
pub struct MicE {
    /// Degrees, north positive.
    pub latitude: f64,
    /// Degrees, east positive.
    pub longitude: f64,
    /// Meters above sea level.
    pub altitude_m: i32,
    pub speed_mps: f64,
    /// Heading in degrees, 0..=360.
    pub course_deg: u32,
    /// APRS symbol code.
    pub symbol: u8,
    /// APRS symbol table selector.
    pub table: u8,
}

impl MicE {
    /// Produce the destination address and information field for an AX25
    /// frame carrying this fix.
    pub fn encode(&self) -> Result<(StationAddress, [u8; INFO_LEN])> {
        self.validate()?;
        Ok((self.destination(), self.info()))
    }

    fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(FrameError::InvalidPosition {
                msg: format!("latitude {} out of range", self.latitude),
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(FrameError::InvalidPosition {
                msg: format!("longitude {} out of range", self.longitude),
            });
        }
        if self.course_deg > 360 {
            return Err(FrameError::InvalidPosition {
                msg: format!("course {} out of range", self.course_deg),
            });
        }
        if self.altitude_m < -10_000 {
            return Err(FrameError::InvalidPosition {
                msg: format!("altitude {} below the -10000 m encoding floor", self.altitude_m),
            });
        }
        let knots = (self.speed_mps * KNOTS_PER_MPS) as u32;
        if self.speed_mps < 0.0 || knots > 799 {
            return Err(FrameError::InvalidPosition {
                msg: format!("speed {} m/s not encodable", self.speed_mps),
            });
        }
        Ok(())
    }

    /// Latitude digits with the message-type and sign flags applied.
    fn destination(&self) -> StationAddress {
        let lat = self.latitude.abs();
        let deg = lat as u32;
        let min = (lat * 60.0) as u32 % 60;
        let centi_min = (lat * 6000.0) as u32 % 100;

        let mut call = [
            b'0' + (deg / 10) as u8,
            b'0' + (deg % 10) as u8,
            b'0' + (min / 10) as u8,
            b'0' + (min % 10) as u8,
            b'0' + (centi_min / 10) as u8,
            b'0' + (centi_min % 10) as u8,
        ];

        // Message-type bits A/B/C: fixed to the standard message the
        // tracker always reports.
        call[0] += DIGIT_FLAG;
        call[1] += DIGIT_FLAG;

        if self.latitude >= 0.0 {
            call[3] += DIGIT_FLAG;
        }
        let lon_deg = self.longitude.abs() as u32;
        // 0-9 degrees share the +100 indicator (!)
        if lon_deg >= 100 || lon_deg <= 9 {
            call[4] += DIGIT_FLAG;
        }
        if self.longitude < 0.0 {
            call[5] += DIGIT_FLAG;
        }

        StationAddress::from_raw(call, 0)
    }

    fn info(&self) -> [u8; INFO_LEN] {
        let lon = self.longitude.abs();
        let lon_deg = lon as u32;
        let lon_min = (lon * 60.0) as u32 % 60;
        let lon_centi_min = (lon * 6000.0) as u32 % 100;

        let d = match lon_deg {
            110.. => lon_deg - 110 + b'&' as u32,
            100.. => lon_deg - 100 + b'l' as u32,
            10.. => lon_deg - 10 + b'&' as u32,
            _ => lon_deg + b'v' as u32,
        };
        let m = if lon_min >= 10 {
            lon_min - 10 + b'&' as u32
        } else {
            lon_min + b'X' as u32
        };
        let h = lon_centi_min + 28;

        let knots = (self.speed_mps * KNOTS_PER_MPS) as u32;
        let sp = if knots < 200 {
            knots / 10 + b'l' as u32
        } else {
            knots / 10 - 20 + b'0' as u32
        };
        let dc = knots % 10 * 10 + self.course_deg / 100 + 32;
        let se = self.course_deg % 100 + 28;

        let alt = (self.altitude_m + 10_000) as u32;

        [
            b'`', // GPS data current
            d as u8,
            m as u8,
            h as u8,
            sp as u8,
            dc as u8,
            se as u8,
            self.symbol,
            self.table,
            (alt / 91 / 91 + 33) as u8,
            (alt / 91 % 91 + 33) as u8,
            (alt % 91 + 33) as u8,
            b'}',
        ]
    }
}
