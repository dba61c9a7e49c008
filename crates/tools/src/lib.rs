//! Stratolink Tools library

pub mod config;
pub mod telemetry;

pub use config::{ModemKind, TrackerConfig};
pub use telemetry::TelemetryRecord;
