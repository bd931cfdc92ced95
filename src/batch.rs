use crate::calculation::{calculate_seasonal_performance, SeasonalPerformance};
use crate::core::climate::ClimateZone;
use crate::core::units::watts_to_kilowatts;
use crate::errors::{RunStatus, ScopError};
use crate::input::{InputForProcessing, UnitType};
use crate::measurements::{
    required_codes, Dimension, MeasurementCode, MeasurementRecord, OPTIONAL_CODES,
};
use chrono::{SecondsFormat, Utc};
use csv::WriterBuilder;
use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use std::any::Any;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info};

pub const DEFAULT_PROGRESS_INTERVAL: usize = 25;

/// Which records to evaluate and how.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub unit_type: UnitType,
    /// Exact dimension tokens to include. When empty, only standard dimensions are included
    /// unless `include_nonstandard` is set.
    pub dimensions: Vec<String>,
    pub include_nonstandard: bool,
    pub model_type: Option<String>,
    pub limit: Option<usize>,
    /// Log progress after every this many records. Zero logs only once all records are done.
    pub progress_interval: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            unit_type: UnitType::Air,
            dimensions: vec![],
            include_nonstandard: false,
            model_type: None,
            limit: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// One line of batch output comparing reported and calculated values for a record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchRow {
    pub manufacturer_name: String,
    pub model_name: String,
    pub variant_name: String,
    pub dimension: String,
    pub application_label: String,
    pub climate_label: String,
    pub unit_type: String,
    pub pdesignh_reported_kw: Option<f64>,
    pub pdesignh_inferred_kw: Option<f64>,
    pub tbiv_c: Option<f64>,
    pub tol_c: Option<f64>,
    pub poff_kw: Option<f64>,
    pub pto_kw: Option<f64>,
    pub psb_kw: Option<f64>,
    pub pck_kw: Option<f64>,
    pub reported_scop: Option<f64>,
    pub calculated_scop: Option<f64>,
    pub delta_scop_pct: Option<f64>,
    pub reported_eta_percent: Option<f64>,
    pub calculated_eta_percent: Option<f64>,
    pub delta_eta_pct: Option<f64>,
    pub reported_qhe_kwh: Option<f64>,
    pub calculated_qhe_active_kwh: Option<f64>,
    pub delta_qhe_pct: Option<f64>,
    pub scopnet: Option<f64>,
    pub scopon: Option<f64>,
    pub calc_qh_kwh: Option<f64>,
    pub q_sup_kwh: Option<f64>,
    pub q_offmode_kwh: Option<f64>,
    pub missing_required_en_codes: String,
    pub missing_optional_en_codes: String,
    pub status: RunStatus,
    pub status_message: String,
    pub timestamp_utc: String,
}

impl BatchRow {
    fn for_record(record: &MeasurementRecord, dimension: &Dimension, unit_type: UnitType) -> Self {
        let power_kw = |code| record.value(code).map(watts_to_kilowatts);

        Self {
            manufacturer_name: record.manufacturer.clone(),
            model_name: record.model.clone(),
            variant_name: record.variant.clone(),
            dimension: record.dimension.clone(),
            application_label: dimension.application_label(),
            climate_label: dimension.climate_label(),
            unit_type: unit_type.to_string(),
            pdesignh_reported_kw: record.value(MeasurementCode::RatedCapacity),
            pdesignh_inferred_kw: None,
            tbiv_c: record.value(MeasurementCode::BivalentTemperature),
            tol_c: record.value(MeasurementCode::OperatingLimitTemperature),
            poff_kw: power_kw(MeasurementCode::OffModePower),
            pto_kw: power_kw(MeasurementCode::ThermostatOffPower),
            psb_kw: power_kw(MeasurementCode::StandbyPower),
            pck_kw: power_kw(MeasurementCode::CrankcaseHeaterPower),
            reported_scop: record.value(MeasurementCode::Scop),
            calculated_scop: None,
            delta_scop_pct: None,
            reported_eta_percent: record.value(MeasurementCode::SeasonalEfficiency),
            calculated_eta_percent: None,
            delta_eta_pct: None,
            reported_qhe_kwh: record.value(MeasurementCode::AnnualEnergy),
            calculated_qhe_active_kwh: None,
            delta_qhe_pct: None,
            scopnet: None,
            scopon: None,
            calc_qh_kwh: None,
            q_sup_kwh: None,
            q_offmode_kwh: None,
            missing_required_en_codes: String::new(),
            missing_optional_en_codes: String::new(),
            status: RunStatus::Ok,
            status_message: String::new(),
            timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    fn with_failure(mut self, status: RunStatus, message: String) -> Self {
        self.status = status;
        self.status_message = message;
        self
    }

    fn with_performance(mut self, performance: &SeasonalPerformance) -> Self {
        let metrics = &performance.metrics;
        let calculated_eta_percent = metrics.seasonal_efficiency_percent();

        self.pdesignh_inferred_kw = Some(performance.design_load);
        self.calculated_scop = Some(metrics.scop);
        self.delta_scop_pct = percent_delta(Some(metrics.scop), self.reported_scop);
        self.calculated_eta_percent = Some(calculated_eta_percent);
        self.delta_eta_pct = percent_delta(Some(calculated_eta_percent), self.reported_eta_percent);
        self.calculated_qhe_active_kwh = Some(metrics.active_energy());
        self.delta_qhe_pct = percent_delta(Some(metrics.active_energy()), self.reported_qhe_kwh);
        self.scopnet = Some(metrics.scop_net);
        self.scopon = Some(metrics.scop_on);
        self.calc_qh_kwh = Some(metrics.heat_demand);
        self.q_sup_kwh = Some(metrics.supplementary_energy);
        self.q_offmode_kwh = Some(metrics.off_mode_energy);
        self.status = RunStatus::Ok;
        self
    }
}

/// Relative difference of a calculated value from a reported one, in %. There is nothing to
/// compare against when the reported value is missing or zero.
pub fn percent_delta(calculated: Option<f64>, reported: Option<f64>) -> Option<f64> {
    match (calculated, reported) {
        (Some(calculated), Some(reported)) if reported != 0. => {
            Some((calculated - reported) / reported * 100.)
        }
        _ => None,
    }
}

fn join_codes(codes: &[MeasurementCode]) -> String {
    codes.iter().join(";")
}

/// Records to evaluate, in a stable order.
pub fn select_records<'a>(
    records: &'a [MeasurementRecord],
    options: &BatchOptions,
) -> Vec<&'a MeasurementRecord> {
    let selected = records
        .iter()
        .filter(|record| {
            if !options.dimensions.is_empty() {
                options.dimensions.contains(&record.dimension)
            } else {
                options.include_nonstandard || Dimension::parse(&record.dimension).standard
            }
        })
        .filter(|record| match &options.model_type {
            Some(model_type) => record.model_type.as_ref() == Some(model_type),
            None => true,
        })
        .sorted_by(|a, b| {
            (&a.manufacturer, &a.model, &a.variant, &a.dimension).cmp(&(
                &b.manufacturer,
                &b.model,
                &b.variant,
                &b.dimension,
            ))
        });

    match options.limit {
        Some(limit) => selected.take(limit).collect(),
        None => selected.collect(),
    }
}

fn calculate_record(
    record: &MeasurementRecord,
    climate: ClimateZone,
    unit_type: UnitType,
) -> Result<SeasonalPerformance, ScopError> {
    let request = record.to_request(climate, unit_type)?;
    let input = InputForProcessing::from_request(request).finalize()?;
    calculate_seasonal_performance(&input)
}

/// Evaluate one record. Never fails: every outcome is expressed in the row's status.
pub fn evaluate_record(record: &MeasurementRecord, unit_type: UnitType) -> BatchRow {
    let dimension = Dimension::parse(&record.dimension);
    let mut row = BatchRow::for_record(record, &dimension, unit_type);

    let missing_required = record.missing_codes(&required_codes(dimension.climate));
    row.missing_required_en_codes = join_codes(&missing_required);
    row.missing_optional_en_codes = join_codes(&record.missing_codes(&OPTIONAL_CODES));

    let Some(climate) = dimension.climate else {
        return row.with_failure(
            RunStatus::Error,
            format!(
                "Unsupported climate digit in dimension {}",
                record.dimension
            ),
        );
    };
    if !missing_required.is_empty() {
        return row.with_failure(RunStatus::MissingData, "Missing required EN codes".into());
    }

    match calculate_record(record, climate, unit_type) {
        Ok(performance) => row.with_performance(&performance),
        Err(e) => row.with_failure(e.status(), e.to_string()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "calculation panicked".into())
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchSummary {
    pub successes: usize,
    pub failures: usize,
}

#[derive(Clone, Debug)]
pub struct BatchResults {
    pub rows: Vec<BatchRow>,
    pub summary: BatchSummary,
}

/// Evaluate the selected records in parallel. A failure in one record, including a panic, is
/// recorded against that record and the run carries on.
pub fn run_batch(records: &[MeasurementRecord], options: &BatchOptions) -> BatchResults {
    let selected = select_records(records, options);
    let total = selected.len();
    let processed = AtomicUsize::new(0);
    let successes = AtomicUsize::new(0);

    let rows = selected
        .par_iter()
        .map(|record| {
            let row = catch_unwind(AssertUnwindSafe(|| {
                evaluate_record(record, options.unit_type)
            }))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload);
                error!(
                    "Calculation for {} {} ({}) panicked: {message}",
                    record.model, record.variant, record.dimension
                );
                let dimension = Dimension::parse(&record.dimension);
                BatchRow::for_record(record, &dimension, options.unit_type)
                    .with_failure(RunStatus::Error, message)
            });

            if row.status == RunStatus::Ok {
                successes.fetch_add(1, Ordering::Relaxed);
            }
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            let at_interval =
                options.progress_interval != 0 && done % options.progress_interval == 0;
            if at_interval || done == total {
                let successes = successes.load(Ordering::Relaxed);
                info!(
                    "Processed {done} / {total} records (successes={successes}, failures={})",
                    done - successes
                );
            }

            row
        })
        .collect::<Vec<_>>();

    let successes = rows
        .iter()
        .filter(|row| row.status == RunStatus::Ok)
        .count();
    BatchResults {
        summary: BatchSummary {
            successes,
            failures: rows.len() - successes,
        },
        rows,
    }
}

pub fn write_batch_csv(rows: &[BatchRow], writer: impl Write) -> anyhow::Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurements::tests::average_record;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(Some(3.6), Some(3.), Some(20.))]
    #[case(Some(2.7), Some(3.), Some(-10.))]
    #[case(Some(3.6), None, None)]
    #[case(Some(3.6), Some(0.), None)]
    #[case(None, Some(3.), None)]
    pub fn should_give_percent_delta(
        #[case] calculated: Option<f64>,
        #[case] reported: Option<f64>,
        #[case] expected: Option<f64>,
    ) {
        match (percent_delta(calculated, reported), expected) {
            (Some(actual), Some(expected)) => {
                assert_relative_eq!(actual, expected, max_relative = 1e-9)
            }
            (actual, expected) => assert_eq!(actual, expected),
        }
    }

    #[rstest]
    pub fn should_evaluate_complete_record() {
        let row = evaluate_record(&average_record(), UnitType::Air);

        assert_eq!(row.status, RunStatus::Ok);
        assert_eq!(row.status_message, "");
        assert_eq!(row.application_label, "Low temp (35°C)");
        assert_eq!(row.climate_label, "Average");
        assert_eq!(row.missing_required_en_codes, "");
        assert!(row.missing_optional_en_codes.starts_with("EN14825_021;"));
        assert_eq!(row.poff_kw, Some(0.009));
        assert_relative_eq!(row.pdesignh_inferred_kw.unwrap(), 11.46, max_relative = 1e-3);
        assert!(row.delta_scop_pct.is_some());
        assert!(row.scopnet.unwrap() >= row.scopon.unwrap());
        assert!(row.scopon.unwrap() >= row.calculated_scop.unwrap());
    }

    #[rstest]
    pub fn should_mark_missing_data() {
        let mut record = average_record();
        record.values.shift_remove("EN14825_019");

        let row = evaluate_record(&record, UnitType::Air);
        assert_eq!(row.status, RunStatus::MissingData);
        assert_eq!(row.missing_required_en_codes, "EN14825_019");
        assert_eq!(row.calculated_scop, None);
    }

    #[rstest]
    pub fn should_mark_unknown_climate_as_error() {
        let mut record = average_record();
        record.dimension = "4_8_0_0".into();

        let row = evaluate_record(&record, UnitType::Air);
        assert_eq!(row.status, RunStatus::Error);
        assert_eq!(row.climate_label, "Unknown");
        assert_eq!(
            row.status_message,
            "Unsupported climate digit in dimension 4_8_0_0"
        );
    }

    #[rstest]
    pub fn should_mark_calculation_error() {
        let mut record = average_record();
        // +2ºC point measured at zero capacity
        record.values.insert("EN14825_010".into(), 0.);

        let row = evaluate_record(&record, UnitType::Air);
        assert_eq!(row.status, RunStatus::Error);
        assert!(row.status_message.starts_with("Invalid test point B"));
    }

    #[rstest]
    pub fn should_filter_and_order_records() {
        let mut second = average_record();
        second.manufacturer = "Zephyr".into();
        let mut nonstandard = average_record();
        nonstandard.dimension = "4_3_1_0".into();
        let mut other_type = average_record();
        other_type.model = "Brine 9".into();
        other_type.model_type = Some("Brine/Water".into());
        let records = vec![second, nonstandard, average_record(), other_type];

        let selected = select_records(&records, &BatchOptions::default());
        assert_eq!(
            selected
                .iter()
                .map(|record| (record.manufacturer.as_str(), record.model.as_str()))
                .collect_vec(),
            vec![("Acme", "Brine 9"), ("Acme", "HP 11"), ("Zephyr", "HP 11")]
        );

        let options = BatchOptions {
            include_nonstandard: true,
            model_type: Some("Outdoor Air/Water".into()),
            limit: Some(2),
            ..Default::default()
        };
        let selected = select_records(&records, &options);
        assert_eq!(
            selected
                .iter()
                .map(|record| record.dimension.as_str())
                .collect_vec(),
            vec!["4_3_0_0", "4_3_1_0"]
        );

        let options = BatchOptions {
            dimensions: vec!["4_3_1_0".into()],
            ..Default::default()
        };
        assert_eq!(select_records(&records, &options).len(), 1);
    }

    #[rstest]
    pub fn should_continue_past_failures() {
        let mut broken = average_record();
        broken.variant = "broken".into();
        broken.values.shift_remove("EN14825_003");
        let records = vec![average_record(), broken];

        let results = run_batch(&records, &BatchOptions::default());
        assert_eq!(
            results.summary,
            BatchSummary {
                successes: 1,
                failures: 1
            }
        );
        assert_eq!(results.rows.len(), 2);
        assert_eq!(results.rows[0].status, RunStatus::Ok);
        assert_eq!(results.rows[1].status, RunStatus::MissingData);
    }

    #[rstest]
    pub fn should_write_rows_with_headings() {
        let row = evaluate_record(&average_record(), UnitType::WaterBrine);
        let mut buffer = vec![];
        write_batch_csv(&[row], &mut buffer).unwrap();

        let written = String::from_utf8(buffer).unwrap();
        let mut lines = written.lines();
        let headings = lines.next().unwrap();
        assert!(headings.starts_with("manufacturer_name,model_name,variant_name,dimension,"));
        assert!(headings.ends_with(",status,status_message,timestamp_utc"));
        assert_eq!(headings.split(',').count(), 34);
        let row = lines.next().unwrap();
        assert!(row.starts_with(
            "Acme,HP 11,HP 11 mono,4_3_0_0,Low temp (35°C),Average,water_brine,11.46,"
        ));
        assert!(row.contains(",ok,,"));
    }
}
