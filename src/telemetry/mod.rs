//! Telemetry datasets and operating ranges

pub mod ranges;
mod source;

pub use ranges::{alerts, Alert, AlertLevel, OperatingRange};
pub use source::{JsonTelemetrySource, Period, TelemetryError, TelemetrySource};
