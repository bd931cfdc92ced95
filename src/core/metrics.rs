use crate::core::energy::SeasonEnergy;
use crate::core::units::fraction_to_percent;
use crate::errors::{NumericAnomaly, ScopError};
use crate::input::UnitType;
use serde::Serialize;

/// Conversion coefficient CC for electricity
pub const PRIMARY_ENERGY_CONVERSION_COEFFICIENT: f64 = 2.5;
/// F(1), correction for temperature controls
pub const TEMPERATURE_CONTROL_CORRECTION: f64 = 0.03;
/// F(2), correction for ground water pump consumption of water/brine units
pub const WATER_BRINE_PUMP_CORRECTION: f64 = 0.05;

const METRICS_RELATIVE_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SeasonMetrics {
    /// QH, annual reference heating demand in kWh
    pub heat_demand: f64,
    /// QHE, heat pump electricity in kWh
    pub heat_pump_energy: f64,
    /// QSUP, back-up heater electricity in kWh
    pub supplementary_energy: f64,
    /// Q_offmode, in kWh
    pub off_mode_energy: f64,
    pub scop_net: f64,
    pub scop_on: f64,
    pub scop: f64,
    /// ηs,h as a fraction
    pub seasonal_efficiency: f64,
}

impl SeasonMetrics {
    /// QHE + QSUP
    pub fn active_energy(&self) -> f64 {
        self.heat_pump_energy + self.supplementary_energy
    }

    pub fn seasonal_efficiency_percent(&self) -> f64 {
        fraction_to_percent(self.seasonal_efficiency)
    }

    /// Cross-checks between the metrics that should hold for any physically sensible input.
    pub fn consistency_anomalies(&self) -> Vec<NumericAnomaly> {
        let mut anomalies = vec![];

        if self.supplementary_energy >= 0.
            && self.off_mode_energy >= 0.
            && !(self.scop_net >= self.scop_on && self.scop_on >= self.scop)
        {
            anomalies.push(NumericAnomaly::MetricsOutOfOrder {
                scop_net: self.scop_net,
                scop_on: self.scop_on,
                scop: self.scop,
            });
        }

        if self.scop_net != 0. {
            let scop_from_net = self.heat_demand
                / (self.heat_demand / self.scop_net
                    + self.supplementary_energy
                    + self.off_mode_energy);
            if !is_close!(
                self.scop,
                scop_from_net,
                rel_tol = METRICS_RELATIVE_TOLERANCE
            ) {
                anomalies.push(NumericAnomaly::ScopMismatch {
                    scop: self.scop,
                    scop_from_net,
                });
            }
        }

        anomalies
    }
}

pub fn seasonal_efficiency(scop: f64, unit_type: UnitType) -> f64 {
    let pump_correction = match unit_type {
        UnitType::Air => 0.,
        UnitType::WaterBrine => WATER_BRINE_PUMP_CORRECTION,
    };

    scop / PRIMARY_ENERGY_CONVERSION_COEFFICIENT
        - (TEMPERATURE_CONTROL_CORRECTION + pump_correction)
}

pub fn calculate_metrics(
    energy: &SeasonEnergy,
    off_mode_energy: f64,
    unit_type: UnitType,
) -> Result<SeasonMetrics, ScopError> {
    let non_zero = |denominator: f64, what: &str| {
        if denominator == 0. {
            Err(ScopError::DivisionByZero(format!(
                "{what} is zero, the heat pump supplies no heat over the season"
            )))
        } else {
            Ok(denominator)
        }
    };

    let heat_pump_energy = non_zero(energy.heat_pump_energy, "QHE")?;
    let active_energy = non_zero(energy.active_energy(), "QHE + QSUP")?;
    let total_energy = non_zero(active_energy + off_mode_energy, "QHE + QSUP + Q_offmode")?;

    let scop = energy.heat_demand / total_energy;

    Ok(SeasonMetrics {
        heat_demand: energy.heat_demand,
        heat_pump_energy: energy.heat_pump_energy,
        supplementary_energy: energy.supplementary_energy,
        off_mode_energy,
        scop_net: energy.heat_demand / heat_pump_energy,
        scop_on: energy.heat_demand / active_energy,
        scop,
        seasonal_efficiency: seasonal_efficiency(scop, unit_type),
    })
}
