use crate::core::climate::ClimateZone;
use crate::core::degradation::{correct_test_points, CorrectedTestPoint};
use crate::core::energy::{BinResult, EnergyIntegrator};
use crate::core::interpolation::PerformanceCurves;
use crate::core::load_curve::LoadCurve;
use crate::core::metrics::{calculate_metrics, SeasonMetrics};
use crate::core::off_mode::{off_mode_energy, OffModeEnergy};
use crate::errors::{NumericAnomaly, ScopError};
use crate::input::{Input, UnitType};
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Everything produced by one seasonal performance calculation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeasonalPerformance {
    pub climate: ClimateZone,
    pub unit_type: UnitType,
    /// Pdesignh used, in kW
    pub design_load: f64,
    pub design_load_inferred: bool,
    pub metrics: SeasonMetrics,
    pub off_mode: OffModeEnergy,
    pub corrected_test_points: Vec<CorrectedTestPoint>,
    pub bins: Vec<BinResult>,
    pub warnings: Vec<NumericAnomaly>,
}

impl SeasonalPerformance {
    pub fn seasonal_efficiency_percent(&self) -> f64 {
        self.metrics.seasonal_efficiency_percent()
    }
}

#[instrument(skip_all, fields(climate = %input.climate))]
pub fn calculate_seasonal_performance(input: &Input) -> Result<SeasonalPerformance, ScopError> {
    let profile = input.climate.profile();
    let unit = &input.unit;

    let load_curve = LoadCurve::new(unit.design_load, profile.design_temperature())?;
    let corrected_test_points = correct_test_points(
        &input.test_points,
        &load_curve,
        unit.degradation_coefficient,
    )?;
    let mut warnings = corrected_test_points
        .iter()
        .filter_map(CorrectedTestPoint::anomaly)
        .collect::<Vec<_>>();

    let curves = PerformanceCurves::new(&corrected_test_points)?;
    let trace = EnergyIntegrator::new(&load_curve, &curves, unit.operating_limit_temperature)
        .integrate(profile.bins())?;
    warnings.extend(trace.anomalies);

    let off_mode = off_mode_energy(profile.off_mode_hours(), &unit.off_mode_powers);
    let metrics = calculate_metrics(&trace.totals, off_mode.total(), unit.unit_type)?;
    warnings.extend(metrics.consistency_anomalies());

    for warning in &warnings {
        warn!("{warning}");
    }
    debug!(
        scop_net = metrics.scop_net,
        scop_on = metrics.scop_on,
        scop = metrics.scop,
        "seasonal performance calculated"
    );

    Ok(SeasonalPerformance {
        climate: input.climate,
        unit_type: unit.unit_type,
        design_load: unit.design_load,
        design_load_inferred: unit.design_load_inferred,
        metrics,
        off_mode,
        corrected_test_points,
        bins: trace.bins,
        warnings,
    })
}
