use crate::compare_floats::max_of_2;
use crate::core::climate::TemperatureBin;
use crate::core::interpolation::PerformanceCurves;
use crate::core::load_curve::LoadCurve;
use crate::core::units::TEMPERATURE_TOLERANCE;
use crate::errors::{NumericAnomaly, ScopError};
use serde::Serialize;
use strum_macros::Display;

/// How the heat demand of a bin is met.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum BinOperation {
    /// Below the operating limit the heat pump is off and the back-up heater covers the load
    #[serde(rename = "backup-only")]
    #[strum(serialize = "backup-only")]
    BackupOnly,
    #[serde(rename = "heat-pump")]
    #[strum(serialize = "heat-pump")]
    HeatPump,
    /// Heat pump at full capacity, back-up heater covering the shortfall
    #[serde(rename = "heat-pump-with-backup")]
    #[strum(serialize = "heat-pump-with-backup")]
    HeatPumpWithBackup,
}

/// Energy balance of one temperature bin over the heating season.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BinResult {
    pub index: u8,
    /// Tj, in deg C
    pub temperature: f64,
    /// hj
    pub hours: f64,
    pub part_load_ratio: f64,
    /// Ph, in kW
    pub load: f64,
    /// COPbin
    pub cop: f64,
    /// Declared capacity at Tj as interpolated, in kW, before any flooring at zero
    pub capacity: f64,
    /// elbu, in kW
    pub backup_capacity: f64,
    pub operation: BinOperation,
    /// hj x Ph, in kWh
    pub heat_demand: f64,
    /// Electricity used by the heat pump, in kWh
    pub heat_pump_energy: f64,
    /// Electricity used by the back-up heater, in kWh
    pub supplementary_energy: f64,
    /// Eelec, total active mode electricity, in kWh
    pub electrical_energy: f64,
}

/// Season totals over all bins, in kWh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SeasonEnergy {
    /// QH
    pub heat_demand: f64,
    /// QHE
    pub heat_pump_energy: f64,
    /// QSUP
    pub supplementary_energy: f64,
}

impl SeasonEnergy {
    /// Active mode electricity, QHE + QSUP
    pub fn active_energy(&self) -> f64 {
        self.heat_pump_energy + self.supplementary_energy
    }

    fn add(&mut self, bin: &BinResult) {
        self.heat_demand += bin.heat_demand;
        self.heat_pump_energy += bin.heat_pump_energy;
        self.supplementary_energy += bin.supplementary_energy;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinTrace {
    pub bins: Vec<BinResult>,
    pub totals: SeasonEnergy,
    pub anomalies: Vec<NumericAnomaly>,
}

pub struct EnergyIntegrator<'a> {
    load_curve: &'a LoadCurve,
    curves: &'a PerformanceCurves,
    operating_limit_temperature: f64,
}

impl<'a> EnergyIntegrator<'a> {
    pub fn new(
        load_curve: &'a LoadCurve,
        curves: &'a PerformanceCurves,
        operating_limit_temperature: f64,
    ) -> Self {
        Self {
            load_curve,
            curves,
            operating_limit_temperature,
        }
    }

    pub fn integrate(&self, bins: &[TemperatureBin]) -> Result<BinTrace, ScopError> {
        let mut anomalies = vec![];
        let mut totals = SeasonEnergy::default();
        let results = bins
            .iter()
            .map(|bin| {
                let result = self.bin_result(bin, &mut anomalies)?;
                totals.add(&result);
                Ok(result)
            })
            .collect::<Result<Vec<_>, ScopError>>()?;

        Ok(BinTrace {
            bins: results,
            totals,
            anomalies,
        })
    }

    fn bin_result(
        &self,
        bin: &TemperatureBin,
        anomalies: &mut Vec<NumericAnomaly>,
    ) -> Result<BinResult, ScopError> {
        let temperature = bin.temperature;
        let load = self.load_curve.load(temperature);
        let cop = self.curves.cop(temperature);
        let capacity = self.curves.capacity(temperature);

        let heat_pump_on = temperature >= self.operating_limit_temperature - TEMPERATURE_TOLERANCE;
        let (operation, backup_capacity) = if !heat_pump_on {
            (BinOperation::BackupOnly, load)
        } else {
            if capacity < 0. {
                anomalies.push(NumericAnomaly::NegativeBinCapacity {
                    temperature,
                    capacity,
                });
            }
            let available_capacity = max_of_2(capacity, 0.);
            if available_capacity >= load {
                (BinOperation::HeatPump, 0.)
            } else {
                (BinOperation::HeatPumpWithBackup, load - available_capacity)
            }
        };

        let heat_from_heat_pump = load - backup_capacity;
        let heat_pump_energy = if heat_pump_on && heat_from_heat_pump > 0. {
            if cop == 0. {
                return Err(ScopError::DivisionByZero(format!(
                    "COPbin is zero at {temperature}ºC where the heat pump must supply {heat_from_heat_pump} kW"
                )));
            }
            if cop < 0. {
                anomalies.push(NumericAnomaly::NegativeBinCop { temperature, cop });
            }
            bin.hours * heat_from_heat_pump / cop
        } else {
            0.
        };
        let supplementary_energy = bin.hours * backup_capacity;

        Ok(BinResult {
            index: bin.index,
            temperature,
            hours: bin.hours,
            part_load_ratio: self.load_curve.part_load_ratio(temperature),
            load,
            cop,
            capacity,
            backup_capacity,
            operation,
            heat_demand: bin.hours * load,
            heat_pump_energy,
            supplementary_energy,
            electrical_energy: heat_pump_energy + supplementary_energy,
        })
    }
}
