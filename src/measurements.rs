use crate::core::climate::ClimateZone;
use crate::core::off_mode::OffModePowers;
use crate::errors::ScopError;
use crate::input::{
    CalculationRequest, TestLabel, TestPoint, UnitType, DEFAULT_DEGRADATION_COEFFICIENT,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Measurement codes under which EN 14825 values are published on heat pump certificates.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, PartialEq)]
pub enum MeasurementCode {
    /// ηs,h in %
    #[strum(serialize = "EN14825_001")]
    SeasonalEfficiency,
    /// Prated in kW
    #[strum(serialize = "EN14825_002")]
    RatedCapacity,
    #[strum(serialize = "EN14825_003")]
    Scop,
    #[strum(serialize = "EN14825_004")]
    BivalentTemperature,
    #[strum(serialize = "EN14825_005")]
    OperatingLimitTemperature,
    #[strum(serialize = "EN14825_008")]
    CapacityAtMinus7,
    #[strum(serialize = "EN14825_009")]
    CopAtMinus7,
    #[strum(serialize = "EN14825_010")]
    CapacityAtPlus2,
    #[strum(serialize = "EN14825_011")]
    CopAtPlus2,
    #[strum(serialize = "EN14825_012")]
    CapacityAtPlus7,
    #[strum(serialize = "EN14825_013")]
    CopAtPlus7,
    #[strum(serialize = "EN14825_014")]
    CapacityAtPlus12,
    #[strum(serialize = "EN14825_015")]
    CopAtPlus12,
    #[strum(serialize = "EN14825_016")]
    CapacityAtBivalent,
    #[strum(serialize = "EN14825_017")]
    CopAtBivalent,
    #[strum(serialize = "EN14825_018")]
    CapacityAtOperatingLimit,
    #[strum(serialize = "EN14825_019")]
    CopAtOperatingLimit,
    #[strum(serialize = "EN14825_021")]
    DegradationAtOperatingLimit,
    /// Poff in W
    #[strum(serialize = "EN14825_023")]
    OffModePower,
    /// Pto in W
    #[strum(serialize = "EN14825_024")]
    ThermostatOffPower,
    /// Psb in W
    #[strum(serialize = "EN14825_025")]
    StandbyPower,
    /// Pck in W
    #[strum(serialize = "EN14825_026")]
    CrankcaseHeaterPower,
    /// QHE in kWh as reported
    #[strum(serialize = "EN14825_029")]
    AnnualEnergy,
    #[strum(serialize = "EN14825_044")]
    CapacityAtMinus15,
    #[strum(serialize = "EN14825_045")]
    CopAtMinus15,
    #[strum(serialize = "EN14825_047")]
    DegradationAtMinus7,
    #[strum(serialize = "EN14825_048")]
    DegradationAtPlus2,
    #[strum(serialize = "EN14825_049")]
    DegradationAtPlus7,
    #[strum(serialize = "EN14825_050")]
    DegradationAtPlus12,
    #[strum(serialize = "EN14825_051")]
    DegradationAtMinus15,
}

use MeasurementCode::*;

const BASE_REQUIRED_CODES: [MeasurementCode; 21] = [
    RatedCapacity,
    Scop,
    BivalentTemperature,
    OperatingLimitTemperature,
    CapacityAtMinus7,
    CopAtMinus7,
    CapacityAtPlus2,
    CopAtPlus2,
    CapacityAtPlus7,
    CopAtPlus7,
    CapacityAtPlus12,
    CopAtPlus12,
    CapacityAtBivalent,
    CopAtBivalent,
    CapacityAtOperatingLimit,
    CopAtOperatingLimit,
    OffModePower,
    ThermostatOffPower,
    StandbyPower,
    CrankcaseHeaterPower,
    AnnualEnergy,
];

pub const OPTIONAL_CODES: [MeasurementCode; 9] = [
    SeasonalEfficiency,
    DegradationAtOperatingLimit,
    DegradationAtMinus7,
    DegradationAtPlus2,
    DegradationAtPlus7,
    DegradationAtPlus12,
    DegradationAtMinus15,
    CapacityAtMinus15,
    CopAtMinus15,
];

/// Capacity, COP and Cd codes for each test point. No Cd is published for the bivalent point.
const POINT_CODES: [(
    TestLabel,
    MeasurementCode,
    MeasurementCode,
    Option<MeasurementCode>,
); 7] = [
    (TestLabel::A, CapacityAtMinus7, CopAtMinus7, Some(DegradationAtMinus7)),
    (TestLabel::B, CapacityAtPlus2, CopAtPlus2, Some(DegradationAtPlus2)),
    (TestLabel::C, CapacityAtPlus7, CopAtPlus7, Some(DegradationAtPlus7)),
    (TestLabel::D, CapacityAtPlus12, CopAtPlus12, Some(DegradationAtPlus12)),
    (
        TestLabel::E,
        CapacityAtOperatingLimit,
        CopAtOperatingLimit,
        Some(DegradationAtOperatingLimit),
    ),
    (TestLabel::F, CapacityAtBivalent, CopAtBivalent, None),
    (TestLabel::G, CapacityAtMinus15, CopAtMinus15, Some(DegradationAtMinus15)),
];

/// Codes without which a record cannot be evaluated. The warmer climate does not use the -7ºC
/// point.
pub fn required_codes(climate: Option<ClimateZone>) -> Vec<MeasurementCode> {
    BASE_REQUIRED_CODES
        .into_iter()
        .filter(|code| {
            !(climate == Some(ClimateZone::Warmer)
                && matches!(code, CapacityAtMinus7 | CopAtMinus7))
        })
        .collect()
}

/// Space heating application, from the first digit of a dimension token.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Application {
    #[strum(serialize = "Low temp (35°C)")]
    LowTemperature,
    #[strum(serialize = "Medium temp (55°C)")]
    MediumTemperature,
    #[strum(serialize = "High temp (65°C)")]
    HighTemperature,
}

impl Application {
    pub fn from_dimension_digit(digit: &str) -> Option<Self> {
        match digit {
            "4" => Some(Application::LowTemperature),
            "5" => Some(Application::MediumTemperature),
            "6" => Some(Application::HighTemperature),
            _ => None,
        }
    }
}

/// Certificate dimension token of the form `A_C_x_y`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dimension {
    pub application: Option<Application>,
    pub climate: Option<ClimateZone>,
    pub standard: bool,
}

impl Dimension {
    pub fn parse(token: &str) -> Self {
        let parts = token.split('_').collect::<Vec<_>>();
        let application = parts
            .first()
            .and_then(|digit| Application::from_dimension_digit(digit));
        let climate = parts
            .get(1)
            .and_then(|digit| ClimateZone::from_dimension_digit(digit));
        let standard = parts.len() == 4
            && application.is_some()
            && climate.is_some()
            && parts[2] == "0"
            && parts[3] == "0";

        Self {
            application,
            climate,
            standard,
        }
    }

    pub fn application_label(&self) -> String {
        self.application
            .map(|application| application.to_string())
            .unwrap_or_else(|| "Unknown".into())
    }

    pub fn climate_label(&self) -> String {
        self.climate
            .map(|climate| climate.to_string())
            .unwrap_or_else(|| "Unknown".into())
    }
}

/// Published measurements for one appliance variant in one dimension.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MeasurementRecord {
    pub manufacturer: String,
    pub model: String,
    pub variant: String,
    pub dimension: String,
    #[serde(default)]
    pub model_type: Option<String>,
    /// Values keyed by measurement code. Codes not used here are kept but ignored.
    pub values: IndexMap<String, f64>,
}

impl MeasurementRecord {
    pub fn value(&self, code: MeasurementCode) -> Option<f64> {
        self.values.get(code.as_ref()).copied()
    }

    fn require(&self, code: MeasurementCode) -> Result<f64, ScopError> {
        self.value(code)
            .ok_or_else(|| ScopError::MissingRequiredData(format!("measurement {code}")))
    }

    pub fn missing_codes(&self, codes: &[MeasurementCode]) -> Vec<MeasurementCode> {
        codes
            .iter()
            .filter(|code| self.value(**code).is_none())
            .copied()
            .collect()
    }

    fn test_point(
        &self,
        temperature: f64,
        capacity: MeasurementCode,
        cop: MeasurementCode,
        degradation_coefficient: Option<MeasurementCode>,
    ) -> Result<TestPoint, ScopError> {
        Ok(TestPoint {
            temperature,
            capacity: self.require(capacity)?,
            cop: self.require(cop)?,
            degradation_coefficient: degradation_coefficient.and_then(|code| self.value(code)),
        })
    }

    fn has_point(&self, capacity: MeasurementCode, cop: MeasurementCode) -> bool {
        self.value(capacity).is_some() && self.value(cop).is_some()
    }

    /// Build a calculation request for this record. The design load is left to be inferred
    /// from the bivalent point; test points E and F sit at the declared TOL and Tbiv.
    pub fn to_request(
        &self,
        climate: ClimateZone,
        unit_type: UnitType,
    ) -> Result<CalculationRequest, ScopError> {
        let bivalent_temperature = self.require(BivalentTemperature)?;
        let operating_limit_temperature = self.require(OperatingLimitTemperature)?;

        let mut test_points = IndexMap::new();
        for (label, capacity, cop, degradation_coefficient) in POINT_CODES {
            // A is optional in the warmer climate and G everywhere
            if matches!(label, TestLabel::A | TestLabel::G) && !self.has_point(capacity, cop) {
                continue;
            }
            let temperature =
                label.standard_temperature(bivalent_temperature, operating_limit_temperature);
            test_points.insert(
                label,
                self.test_point(temperature, capacity, cop, degradation_coefficient)?
                    .into(),
            );
        }

        Ok(CalculationRequest {
            climate: Some(climate.to_string()),
            design_load: None,
            bivalent_temperature: Some(bivalent_temperature),
            operating_limit_temperature: Some(operating_limit_temperature),
            unit_type,
            off_mode_powers: OffModePowers {
                off: self.require(OffModePower)?,
                thermostat_off: self.require(ThermostatOffPower)?,
                standby: self.require(StandbyPower)?,
                crankcase_heater: self.require(CrankcaseHeaterPower)?,
            },
            degradation_coefficient: Some(DEFAULT_DEGRADATION_COEFFICIENT),
            test_points,
        })
    }
}
