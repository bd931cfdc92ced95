use crate::input::TestLabel;
use serde::Serialize;
use thiserror::Error;

/// Errors that stop a single seasonal performance calculation. None of these ever come with
/// partial metrics.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScopError {
    #[error("Missing required data: {0}")]
    MissingRequiredData(String),
    #[error("Unsupported climate zone '{0}', expected one of Average, Warmer or Colder")]
    UnsupportedClimate(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid test point {label}: {reason}")]
    InvalidTestPoint { label: TestLabel, reason: String },
    #[error("Ambiguous test data: {0}")]
    AmbiguousTestData(String),
    #[error("Division by zero: {0}")]
    DivisionByZero(String),
}

impl ScopError {
    /// The outcome a batch row should report for this error.
    pub fn status(&self) -> RunStatus {
        match self {
            ScopError::MissingRequiredData(_) => RunStatus::MissingData,
            _ => RunStatus::Error,
        }
    }
}

/// Outcome of a single appliance/climate run, as reported in batch output.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum RunStatus {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "missing-data")]
    MissingData,
    #[serde(rename = "error")]
    Error,
}

/// A non-fatal oddity found during a calculation. The calculation carries on with the anomalous
/// value, which is also left visible in the bin trace.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
pub enum NumericAnomaly {
    #[error("Corrected COP of {cop} at test point {label} ({temperature}ºC) is not positive")]
    NonPositiveCorrectedCop {
        label: TestLabel,
        temperature: f64,
        cop: f64,
    },
    #[error("Interpolated COPbin of {cop} at {temperature}ºC is negative")]
    NegativeBinCop { temperature: f64, cop: f64 },
    #[error("Interpolated declared capacity of {capacity} kW at {temperature}ºC is negative, treated as zero")]
    NegativeBinCapacity { temperature: f64, capacity: f64 },
    #[error("Seasonal metrics are not ordered as SCOPnet >= SCOPon >= SCOP ({scop_net}, {scop_on}, {scop})")]
    MetricsOutOfOrder {
        scop_net: f64,
        scop_on: f64,
        scop: f64,
    },
    #[error("SCOP of {scop} does not agree with {scop_from_net} derived from SCOPnet")]
    ScopMismatch { scop: f64, scop_from_net: f64 },
}
