mod compare_floats;
pub mod batch;
pub mod calculation;
pub mod core;
pub mod errors;
pub mod input;
pub mod measurements;
pub mod output;

#[macro_use]
extern crate is_close;

pub use crate::calculation::{calculate_seasonal_performance, SeasonalPerformance};
pub use crate::errors::{NumericAnomaly, RunStatus, ScopError};
use crate::core::energy::BinResult;
use crate::core::metrics::SeasonMetrics;
use crate::core::off_mode::OffModeEnergy;
use crate::core::degradation::CorrectedTestPoint;
use crate::input::ingest_for_processing;
use crate::output::Output;
use csv::WriterBuilder;
use serde::Serialize;
use std::io::{Read, Write};
use tracing::{debug, info};

/// Run a single calculation from a JSON request, writing the bin trace and a summary of the
/// metrics to the given output.
pub fn run_project(
    input: impl Read,
    output: impl Output,
) -> Result<SeasonalPerformance, anyhow::Error> {
    let input = ingest_for_processing(input)?.finalize()?;
    let performance = calculate_seasonal_performance(&input)?;

    if !output.is_noop() {
        debug!("writing out bin trace");
        write_bin_trace(&performance, output.writer_for_location_key("bins", "csv")?)?;
        debug!("writing out metrics");
        write_metrics(&performance, output.writer_for_location_key("metrics", "json")?)?;
    }

    info!(
        "SCOP {:.3} (SCOPon {:.3}, SCOPnet {:.3}), ηs,h {:.1}%",
        performance.metrics.scop,
        performance.metrics.scop_on,
        performance.metrics.scop_net,
        performance.seasonal_efficiency_percent()
    );

    Ok(performance)
}

const BIN_TRACE_COLUMNS: [(&str, &str); 13] = [
    ("Bin", "[j]"),
    ("Outdoor temperature", "[deg C]"),
    ("Hours", "[h]"),
    ("Part load ratio", "[ratio]"),
    ("Heating load", "[kW]"),
    ("COP", "[ratio]"),
    ("Declared capacity", "[kW]"),
    ("Back-up capacity", "[kW]"),
    ("Operation", "[mode]"),
    ("Heat demand", "[kWh]"),
    ("Heat pump electricity", "[kWh]"),
    ("Back-up electricity", "[kWh]"),
    ("Active mode electricity", "[kWh]"),
];

/// Write the per-bin energy balance as CSV, with a row of headings followed by a row of units.
pub fn write_bin_trace(
    performance: &SeasonalPerformance,
    writer: impl Write,
) -> Result<(), anyhow::Error> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    writer.write_record(BIN_TRACE_COLUMNS.iter().map(|(heading, _)| *heading))?;
    writer.write_record(BIN_TRACE_COLUMNS.iter().map(|(_, units)| *units))?;

    for BinResult {
        index,
        temperature,
        hours,
        part_load_ratio,
        load,
        cop,
        capacity,
        backup_capacity,
        operation,
        heat_demand,
        heat_pump_energy,
        supplementary_energy,
        electrical_energy,
    } in &performance.bins
    {
        writer.write_record([
            index.to_string(),
            temperature.to_string(),
            hours.to_string(),
            part_load_ratio.to_string(),
            load.to_string(),
            cop.to_string(),
            capacity.to_string(),
            backup_capacity.to_string(),
            operation.to_string(),
            heat_demand.to_string(),
            heat_pump_energy.to_string(),
            supplementary_energy.to_string(),
            electrical_energy.to_string(),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

#[derive(Serialize)]
struct MetricsSummary<'a> {
    climate: String,
    unit_type: String,
    design_load: f64,
    design_load_inferred: bool,
    metrics: &'a SeasonMetrics,
    seasonal_efficiency_percent: f64,
    active_energy: f64,
    off_mode: &'a OffModeEnergy,
    corrected_test_points: &'a [CorrectedTestPoint],
    warnings: Vec<String>,
}

/// Write the headline metrics, energies, corrected test points and warnings as JSON.
pub fn write_metrics(
    performance: &SeasonalPerformance,
    writer: impl Write,
) -> Result<(), anyhow::Error> {
    let summary = MetricsSummary {
        climate: performance.climate.to_string(),
        unit_type: performance.unit_type.to_string(),
        design_load: performance.design_load,
        design_load_inferred: performance.design_load_inferred,
        metrics: &performance.metrics,
        seasonal_efficiency_percent: performance.seasonal_efficiency_percent(),
        active_energy: performance.metrics.active_energy(),
        off_mode: &performance.off_mode,
        corrected_test_points: &performance.corrected_test_points,
        warnings: performance
            .warnings
            .iter()
            .map(|warning| warning.to_string())
            .collect(),
    };
    serde_json::to_writer_pretty(writer, &summary)?;

    Ok(())
}
