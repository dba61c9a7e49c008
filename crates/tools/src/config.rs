//! Tracker configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use stratolink_frame::ax25::StationAddress;
use stratolink_modem::afsk::AfskConfig;

/// One digipeater hop in the APRS path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEntry {
    pub callsign: String,
    pub ssid: u8,
}

/// Which point-to-point radio modem the tracker carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModemKind {
    Xbee,
    Xtend,
}

/// Everything the beacon pipeline needs to know about one tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub callsign: String,
    pub ssid: u8,
    /// Digipeater path for the APRS channel.
    pub path: Vec<PathEntry>,
    /// APRS symbol code ('O' is a balloon).
    pub symbol: char,
    /// APRS symbol table selector.
    pub table: char,
    pub modem: ModemKind,
    /// Ground-station modem address. The XTend link uses the low 16 bits.
    pub dest: u64,
    pub beacon_interval_s: u32,
    pub afsk: AfskConfig,
}

impl TrackerConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    /// A flight-ready default: unassigned call sign, WIDE2-1 path, XTend
    /// modem on the address the ground station listens on.
    pub fn example() -> Self {
        Self {
            callsign: "N0CALL".to_string(),
            ssid: 11,
            path: vec![PathEntry {
                callsign: "WIDE2".to_string(),
                ssid: 1,
            }],
            symbol: 'O',
            table: '/',
            modem: ModemKind::Xtend,
            dest: 0x5854,
            beacon_interval_s: 60,
            afsk: AfskConfig::bell_202(),
        }
    }

    pub fn source_address(&self) -> StationAddress {
        StationAddress::new(&self.callsign, self.ssid)
    }

    pub fn path_addresses(&self) -> Vec<StationAddress> {
        self.path
            .iter()
            .map(|hop| StationAddress::new(&hop.callsign, hop.ssid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let config: TrackerConfig = toml::from_str(
            r#"
            callsign = "VE2XBL"
            ssid = 9
            symbol = "O"
            table = "/"
            modem = "xtend"
            dest = 0x5854
            beacon_interval_s = 30

            [[path]]
            callsign = "WIDE1"
            ssid = 1

            [[path]]
            callsign = "WIDE2"
            ssid = 1

            [afsk]
            mark_frequency = 1200
            space_frequency = 2200
            baud_rate = 1200
            output_resolution = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.callsign, "VE2XBL");
        assert_eq!(config.modem, ModemKind::Xtend);
        assert_eq!(config.path.len(), 2);
        assert_eq!(config.afsk.output_resolution, 16);
        assert_eq!(config.source_address().to_string(), "VE2XBL-9");
        assert_eq!(config.path_addresses()[1].call(), b"WIDE2 ");
    }

    #[test]
    fn test_example_round_trips_through_toml() {
        let rendered = toml::to_string(&TrackerConfig::example()).unwrap();
        let parsed: TrackerConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.callsign, "N0CALL");
        assert_eq!(parsed.dest, 0x5854);
    }
}
