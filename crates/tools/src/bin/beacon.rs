//! Stratolink Beacon - run one beacon cycle without hardware
//!
//! Builds the Mic-E position frame a flight computer would send, renders
//! it to AFSK samples through a simulated timer, then frames a telemetry
//! record for the configured radio modem and the auxiliary link.

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

use stratolink_core::io::LoopbackPort;
use stratolink_frame::ax25::Ax25Encoder;
use stratolink_frame::compact::{self, Crc32Decoder};
use stratolink_frame::mice::MicE;
use stratolink_frame::xbee::XbeeLink;
use stratolink_frame::xtend::XtendLink;
use stratolink_modem::afsk::AfskModulator;
use stratolink_modem::hal::{SampleSink, SampleTimer};
use stratolink_tools::telemetry::{TelemetryRecord, PACKED_LEN};
use stratolink_tools::{ModemKind, TrackerConfig};

/// Beacon simulator arguments
#[derive(Debug, Parser)]
#[command(name = "strato-beacon")]
#[command(about = "Simulate one Stratolink beacon cycle")]
struct Args {
    /// Tracker configuration file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Stand-in for the hardware timer: remembers the period so the render
/// loop can account for simulated time.
#[derive(Clone, Default)]
struct SimTimer {
    period_us: Rc<RefCell<u32>>,
}

impl SampleTimer for SimTimer {
    fn start(&mut self, period_us: u32) {
        *self.period_us.borrow_mut() = period_us;
    }

    fn set_period(&mut self, period_us: u32) {
        *self.period_us.borrow_mut() = period_us;
    }

    fn stop(&mut self) {}
}

/// Counts samples instead of driving a DAC.
#[derive(Clone, Default)]
struct SimSink {
    samples: Rc<RefCell<u64>>,
}

impl SampleSink for SimSink {
    fn write_sample(&mut self, _value: u8) {
        *self.samples.borrow_mut() += 1;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = match &args.config {
        Some(path) => TrackerConfig::from_file(path)?,
        None => TrackerConfig::example(),
    };
    info!(callsign = %config.source_address(), "beacon cycle starting");

    // A plausible mid-flight fix and matching sensor readings.
    let record = TelemetryRecord {
        time_s: 4_210,
        latitude: 45.5214,
        longitude: -73.6103,
        altitude_m: 23_501,
        course_deg: 88,
        speed_mps: 14,
        pressure_pa: 3_846,
        temp_internal_c: 11,
        temp_external_c: -52,
        battery_mv: 7_912,
    };

    transmit_position(&config, &record)?;
    transmit_telemetry(&config, &record)?;
    Ok(())
}

/// Mic-E compress the fix, build the AX25 frame and render it to AFSK.
fn transmit_position(config: &TrackerConfig, record: &TelemetryRecord) -> Result<()> {
    let fix = MicE {
        latitude: record.latitude as f64,
        longitude: record.longitude as f64,
        altitude_m: record.altitude_m,
        speed_mps: record.speed_mps as f64,
        course_deg: record.course_deg as u32,
        symbol: config.symbol as u8,
        table: config.table as u8,
    };
    let (destination, info_field) = fix.encode()?;

    let mut bits = Ax25Encoder::frame_bits();
    Ax25Encoder::new().encode(
        &mut bits,
        &config.source_address(),
        &destination,
        &config.path_addresses(),
        &info_field,
    )?;
    info!(bits = bits.len(), "AX25 frame built");

    let timer = SimTimer::default();
    let sink = SimSink::default();
    let mut modulator = AfskModulator::new(config.afsk.clone(), timer.clone(), sink.clone())?;

    let air_time = modulator.transmission_time(&bits);
    modulator.transmit(bits)?;

    let mut simulated_us = 0u64;
    while modulator.transmitting() {
        simulated_us += u64::from(*timer.period_us.borrow());
        modulator.tick();
    }
    info!(
        samples = *sink.samples.borrow(),
        air_time_ms = air_time.as_millis() as u64,
        simulated_ms = simulated_us / 1000,
        "AFSK rendering complete"
    );
    Ok(())
}

/// Frame the packed record for the radio modem and the auxiliary link.
fn transmit_telemetry(config: &TrackerConfig, record: &TelemetryRecord) -> Result<()> {
    let mut packed = [0u8; PACKED_LEN];
    record.pack(&mut packed)?;

    let mut port = LoopbackPort::new();
    match config.modem {
        ModemKind::Xtend => XtendLink::new().send_to(&mut port, config.dest as u16, &packed)?,
        ModemKind::Xbee => XbeeLink::new().send_to(&mut port, config.dest, &packed)?,
    }
    let wire = port.drain();
    info!(bytes = wire.len(), "telemetry frame: {}", hex(&wire));

    let aux = compact::encode_crc32(&packed)?;
    let mut check = Crc32Decoder::new();
    let validated = aux.iter().any(|&byte| check.push(byte));
    debug!(validated, "aux packet self-check");
    info!(bytes = aux.len(), "aux packet: {}", hex(&aux));
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}
