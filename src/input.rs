use crate::core::climate::ClimateZone;
use crate::core::load_curve::LoadCurve;
use crate::core::off_mode::OffModePowers;
use crate::core::units::TEMPERATURE_TOLERANCE;
use crate::errors::ScopError;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use serde_valid::Validate;
use std::io::{BufReader, Read};
use strum_macros::{Display, EnumIter, EnumString};

/// Degradation coefficient Cd applied to any test point that does not declare its own
pub const DEFAULT_DEGRADATION_COEFFICIENT: f64 = 0.9;

pub fn ingest_for_processing(json: impl Read) -> Result<InputForProcessing, anyhow::Error> {
    InputForProcessing::init_with_json(json)
}

/// Test conditions of EN 14825 at which declared capacity and COP are measured.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub enum TestLabel {
    /// -7ºC
    A,
    /// +2ºC
    B,
    /// +7ºC
    C,
    /// +12ºC
    D,
    /// operating limit temperature
    E,
    /// bivalent temperature
    F,
    /// -15ºC, optional
    G,
}

const LABELS_REQUIRED: [TestLabel; 6] = [
    TestLabel::A,
    TestLabel::B,
    TestLabel::C,
    TestLabel::D,
    TestLabel::E,
    TestLabel::F,
];

impl TestLabel {
    /// Nominal outdoor temperature of the test condition in deg C. E and F follow the unit's
    /// declared operating limit and bivalent temperatures.
    pub fn standard_temperature(
        &self,
        bivalent_temperature: f64,
        operating_limit_temperature: f64,
    ) -> f64 {
        match self {
            TestLabel::A => -7.,
            TestLabel::B => 2.,
            TestLabel::C => 7.,
            TestLabel::D => 12.,
            TestLabel::E => operating_limit_temperature,
            TestLabel::F => bivalent_temperature,
            TestLabel::G => -15.,
        }
    }

    /// Labels whose test point must be present for a calculation in the given climate. The
    /// warmer climate never reaches -7ºC, so A may be left out there.
    pub fn required_for(zone: ClimateZone) -> Vec<TestLabel> {
        LABELS_REQUIRED
            .into_iter()
            .filter(|label| !(zone == ClimateZone::Warmer && *label == TestLabel::A))
            .collect()
    }
}

/// One laboratory measurement at an outdoor temperature.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TestPoint {
    /// Outdoor temperature Tj, in deg C
    pub temperature: f64,
    /// Declared heating capacity Pdh, in kW
    pub capacity: f64,
    /// Declared coefficient of performance COPd
    pub cop: f64,
    /// Degradation coefficient Cd, falling back to the unit default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation_coefficient: Option<f64>,
}

/// A test point as it arrives in a request, with any of its values possibly left out.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct TestPointRequest {
    #[serde(alias = "Tj", default)]
    pub temperature: Option<f64>,
    #[serde(alias = "Pdh", default)]
    pub capacity: Option<f64>,
    #[serde(alias = "COPd", default)]
    pub cop: Option<f64>,
    #[serde(alias = "Cd", default, skip_serializing_if = "Option::is_none")]
    pub degradation_coefficient: Option<f64>,
}

impl TestPointRequest {
    fn complete(self, label: TestLabel) -> Result<TestPoint, ScopError> {
        let missing =
            |symbol: &str| ScopError::MissingRequiredData(format!("test point {label}: {symbol}"));

        Ok(TestPoint {
            temperature: self.temperature.ok_or_else(|| missing("Tj"))?,
            capacity: self.capacity.ok_or_else(|| missing("Pdh"))?,
            cop: self.cop.ok_or_else(|| missing("COPd"))?,
            degradation_coefficient: self.degradation_coefficient,
        })
    }
}

impl From<TestPoint> for TestPointRequest {
    fn from(point: TestPoint) -> Self {
        Self {
            temperature: Some(point.temperature),
            capacity: Some(point.capacity),
            cop: Some(point.cop),
            degradation_coefficient: point.degradation_coefficient,
        }
    }
}

impl TestPoint {
    fn check_finite(&self, label: TestLabel) -> Result<(), ScopError> {
        let values = [self.temperature, self.capacity, self.cop];
        if values.iter().any(|value| !value.is_finite())
            || self
                .degradation_coefficient
                .is_some_and(|value| !value.is_finite())
        {
            return Err(ScopError::InvalidTestPoint {
                label,
                reason: "all values must be finite numbers".into(),
            });
        }
        Ok(())
    }
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize_enum_str, Eq, Hash, PartialEq, Serialize_enum_str,
)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub enum UnitType {
    #[default]
    #[serde(rename = "air")]
    Air,
    #[serde(rename = "water_brine")]
    WaterBrine,
}

/// A calculation request as it arrives at the boundary. Every field the calculation needs is
/// optional here so that absences are reported as missing data rather than as parse errors.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct CalculationRequest {
    /// Average, Warmer or Colder
    #[serde(default)]
    pub climate: Option<String>,
    /// Design heating load Pdesignh in kW, inferred from the bivalent point when absent
    #[serde(alias = "Pdesignh", default)]
    pub design_load: Option<f64>,
    #[serde(alias = "Tbiv", default)]
    pub bivalent_temperature: Option<f64>,
    #[serde(alias = "TOL", default)]
    pub operating_limit_temperature: Option<f64>,
    #[serde(default)]
    pub unit_type: UnitType,
    #[serde(default)]
    pub off_mode_powers: OffModePowers,
    #[serde(alias = "Cd", default)]
    pub degradation_coefficient: Option<f64>,
    #[serde(default)]
    pub test_points: IndexMap<TestLabel, TestPointRequest>,
}

/// Validated input to a seasonal performance calculation.
#[derive(Clone, Debug, PartialEq)]
pub struct Input {
    pub climate: ClimateZone,
    pub unit: UnitConfig,
    pub test_points: TestPointSet,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct UnitConfig {
    /// Pdesignh, in kW
    pub design_load: f64,
    pub design_load_inferred: bool,
    /// Tbiv, in deg C
    pub bivalent_temperature: f64,
    /// TOL, in deg C
    pub operating_limit_temperature: f64,
    pub unit_type: UnitType,
    pub off_mode_powers: OffModePowers,
    pub degradation_coefficient: f64,
}

/// Test points keyed by label, held in label order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestPointSet(IndexMap<TestLabel, TestPoint>);

impl TestPointSet {
    pub fn new(test_points: IndexMap<TestLabel, TestPoint>) -> Self {
        let mut test_points = test_points;
        test_points.sort_keys();
        Self(test_points)
    }

    pub fn get(&self, label: TestLabel) -> Option<&TestPoint> {
        self.0.get(&label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TestLabel, &TestPoint)> {
        self.0.iter().map(|(label, point)| (*label, point))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Holds a request between parsing and validation, so that drivers can fill in or adjust values
/// before the input is fixed.
#[derive(Clone, Debug)]
pub struct InputForProcessing {
    request: CalculationRequest,
}

impl InputForProcessing {
    pub fn init_with_json(json: impl Read) -> Result<Self, anyhow::Error> {
        let reader = BufReader::new(json);

        let request: CalculationRequest = serde_json::from_reader(reader)?;

        Ok(Self { request })
    }

    pub fn from_request(request: CalculationRequest) -> Self {
        Self { request }
    }

    pub fn set_unit_type(&mut self, unit_type: UnitType) -> &Self {
        self.request.unit_type = unit_type;
        self
    }

    pub fn set_design_load(&mut self, design_load: Option<f64>) -> &Self {
        self.request.design_load = design_load;
        self
    }

    /// Validate the request, inferring the design load if it was not given. No numeric work on
    /// the test points happens before every required value is known to be present.
    pub fn finalize(self) -> Result<Input, ScopError> {
        let CalculationRequest {
            climate,
            design_load,
            bivalent_temperature,
            operating_limit_temperature,
            unit_type,
            off_mode_powers,
            degradation_coefficient,
            test_points,
        } = self.request;

        let climate = ClimateZone::from_name(
            climate
                .as_deref()
                .ok_or_else(|| ScopError::MissingRequiredData("climate".into()))?,
        )?;
        let bivalent_temperature = bivalent_temperature.ok_or_else(|| {
            ScopError::MissingRequiredData("bivalent temperature (Tbiv)".into())
        })?;
        let operating_limit_temperature = operating_limit_temperature.ok_or_else(|| {
            ScopError::MissingRequiredData("operating limit temperature (TOL)".into())
        })?;

        let missing_labels = TestLabel::required_for(climate)
            .into_iter()
            .filter(|label| !test_points.contains_key(label))
            .collect_vec();
        if !missing_labels.is_empty() {
            return Err(ScopError::MissingRequiredData(format!(
                "test points {}",
                missing_labels.iter().join(", ")
            )));
        }
        let test_points = test_points
            .into_iter()
            .map(|(label, point)| Ok((label, point.complete(label)?)))
            .collect::<Result<IndexMap<_, _>, ScopError>>()?;

        for (temperature, name) in [
            (bivalent_temperature, "bivalent temperature"),
            (operating_limit_temperature, "operating limit temperature"),
        ] {
            if !temperature.is_finite() {
                return Err(ScopError::InvalidConfiguration(format!(
                    "{name} must be finite, got {temperature}"
                )));
            }
        }
        let degradation_coefficient =
            degradation_coefficient.unwrap_or(DEFAULT_DEGRADATION_COEFFICIENT);
        if !(0. ..=1.).contains(&degradation_coefficient) {
            return Err(ScopError::InvalidConfiguration(format!(
                "degradation coefficient must lie between 0 and 1, got {degradation_coefficient}"
            )));
        }
        off_mode_powers
            .validate()
            .map_err(|e| ScopError::InvalidConfiguration(format!("off mode powers: {e}")))?;

        for (label, point) in test_points.iter() {
            point.check_finite(*label)?;
        }
        let test_points = TestPointSet::new(test_points);

        let bivalent_point = test_points.get(TestLabel::F).ok_or_else(|| {
            ScopError::MissingRequiredData("bivalent test point F".into())
        })?;
        if !is_close!(
            bivalent_point.temperature,
            bivalent_temperature,
            abs_tol = TEMPERATURE_TOLERANCE
        ) {
            return Err(ScopError::AmbiguousTestData(format!(
                "test point F is at {}ºC but the bivalent temperature is {}ºC",
                bivalent_point.temperature, bivalent_temperature
            )));
        }

        let (design_load, design_load_inferred) = match design_load {
            Some(design_load) => (design_load, false),
            None => (
                LoadCurve::infer_design_load(
                    bivalent_point.capacity,
                    bivalent_temperature,
                    climate.profile().design_temperature(),
                )?,
                true,
            ),
        };

        Ok(Input {
            climate,
            unit: UnitConfig {
                design_load,
                design_load_inferred,
                bivalent_temperature,
                operating_limit_temperature,
                unit_type,
                off_mode_powers,
                degradation_coefficient,
            },
            test_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn request_json() -> &'static str {
        r#"{
            "climate": "Average",
            "Pdesignh": 11.46,
            "Tbiv": -6,
            "TOL": -10,
            "unit_type": "air",
            "off_mode_powers": {"Poff": 9, "Pto": 9, "Psb": 9, "Pck": 0},
            "Cd": 0.9,
            "test_points": {
                "A": {"Tj": -7, "Pdh": 9.55, "COPd": 3.26},
                "B": {"Tj": 2, "Pdh": 11.17, "COPd": 4.0},
                "C": {"Tj": 7, "Pdh": 12.66, "COPd": 4.91},
                "D": {"Tj": 12, "Pdh": 14.3, "COPd": 5.5},
                "E": {"Tj": -10, "Pdh": 7.8, "COPd": 2.6, "Cd": 0.95},
                "F": {"Tj": -6, "Pdh": 9.7, "COPd": 3.3}
            }
        }"#
    }

    fn request_from(json: &str) -> InputForProcessing {
        InputForProcessing::init_with_json(json.as_bytes()).unwrap()
    }

    #[rstest]
    pub fn should_read_request_using_standard_symbols(request_json: &str) {
        let input = request_from(request_json).finalize().unwrap();

        assert_eq!(input.climate, ClimateZone::Average);
        assert_eq!(input.unit.design_load, 11.46);
        assert!(!input.unit.design_load_inferred);
        assert_eq!(input.unit.bivalent_temperature, -6.);
        assert_eq!(input.unit.operating_limit_temperature, -10.);
        assert_eq!(input.unit.unit_type, UnitType::Air);
        assert_eq!(input.unit.off_mode_powers.thermostat_off, 9.);
        assert_eq!(input.test_points.len(), 6);
        assert_eq!(
            input.test_points.get(TestLabel::E).unwrap().degradation_coefficient,
            Some(0.95)
        );
        assert_eq!(
            input.test_points.get(TestLabel::A).unwrap().degradation_coefficient,
            None
        );
    }

    #[rstest]
    pub fn should_reject_unknown_fields() {
        let result = InputForProcessing::init_with_json(
            r#"{"climate": "Average", "heating_hours": 2066}"#.as_bytes(),
        );
        assert!(result.is_err());
    }

    #[rstest]
    pub fn should_keep_test_points_in_label_order(request_json: &str) {
        let mut input = request_from(request_json);
        input.request.test_points.reverse();
        let input = input.finalize().unwrap();

        let labels = input.test_points.iter().map(|(label, _)| label).collect_vec();
        assert_eq!(
            labels,
            vec![
                TestLabel::A,
                TestLabel::B,
                TestLabel::C,
                TestLabel::D,
                TestLabel::E,
                TestLabel::F
            ]
        );
    }

    #[rstest]
    #[case(TestLabel::A)]
    #[case(TestLabel::B)]
    #[case(TestLabel::C)]
    #[case(TestLabel::D)]
    #[case(TestLabel::E)]
    #[case(TestLabel::F)]
    pub fn should_report_missing_required_test_point(request_json: &str, #[case] label: TestLabel) {
        let mut input = request_from(request_json);
        input.request.test_points.shift_remove(&label);

        assert_eq!(
            input.finalize().unwrap_err(),
            ScopError::MissingRequiredData(format!("test points {label}"))
        );
    }

    #[rstest]
    #[case(r#"{"Pdh": 12.66, "COPd": 4.91}"#, "Tj")]
    #[case(r#"{"Tj": 7, "COPd": 4.91}"#, "Pdh")]
    #[case(r#"{"Tj": 7, "Pdh": 12.66}"#, "COPd")]
    pub fn should_report_missing_test_point_value(
        request_json: &str,
        #[case] point_json: &str,
        #[case] symbol: &str,
    ) {
        let request_json = request_json.replace(
            r#""C": {"Tj": 7, "Pdh": 12.66, "COPd": 4.91}"#,
            &format!(r#""C": {point_json}"#),
        );
        let input = request_from(&request_json);

        assert_eq!(
            input.finalize().unwrap_err(),
            ScopError::MissingRequiredData(format!("test point C: {symbol}"))
        );
    }

    #[rstest]
    pub fn should_reject_bivalent_point_away_from_bivalent_temperature(request_json: &str) {
        let mut input = request_from(request_json);
        input.request.bivalent_temperature = Some(-5.);

        assert!(matches!(
            input.finalize(),
            Err(ScopError::AmbiguousTestData(_))
        ));
    }

    #[rstest]
    pub fn should_allow_warmer_climate_without_minus_seven_point(request_json: &str) {
        let mut input = request_from(request_json);
        input.request.climate = Some("Warmer".into());
        input.request.test_points.shift_remove(&TestLabel::A);

        let input = input.finalize().unwrap();
        assert_eq!(input.climate, ClimateZone::Warmer);
        assert_eq!(input.test_points.len(), 5);
    }

    #[rstest]
    pub fn should_report_missing_bivalent_temperature(request_json: &str) {
        let mut input = request_from(request_json);
        input.request.bivalent_temperature = None;

        assert!(matches!(
            input.finalize(),
            Err(ScopError::MissingRequiredData(_))
        ));
    }

    #[rstest]
    pub fn should_reject_unsupported_climate(request_json: &str) {
        let mut input = request_from(request_json);
        input.request.climate = Some("Arctic".into());

        assert_eq!(
            input.finalize().unwrap_err(),
            ScopError::UnsupportedClimate("Arctic".into())
        );
    }

    #[rstest]
    pub fn should_reject_degradation_coefficient_out_of_range(request_json: &str) {
        let mut input = request_from(request_json);
        input.request.degradation_coefficient = Some(1.2);

        assert!(matches!(
            input.finalize(),
            Err(ScopError::InvalidConfiguration(_))
        ));
    }

    #[rstest]
    pub fn should_reject_negative_off_mode_power(request_json: &str) {
        let mut input = request_from(request_json);
        input.request.off_mode_powers.crankcase_heater = -5.;

        assert!(matches!(
            input.finalize(),
            Err(ScopError::InvalidConfiguration(_))
        ));
    }

    #[rstest]
    pub fn should_infer_design_load_when_absent(request_json: &str) {
        let mut input = request_from(request_json);
        input.set_design_load(None);
        let input = input.finalize().unwrap();

        assert!(input.unit.design_load_inferred);
        assert_relative_eq!(input.unit.design_load, 11.46, max_relative = 1e-3);
    }

    #[rstest]
    pub fn should_infer_design_load_from_climate_design_temperature(request_json: &str) {
        let mut input = request_from(request_json);
        input.set_design_load(None);
        input.set_unit_type(UnitType::WaterBrine);
        input.request.climate = Some("Warmer".into());
        input.request.bivalent_temperature = Some(4.);
        input.request.test_points.insert(
            TestLabel::F,
            TestPoint {
                temperature: 4.,
                capacity: 9.7,
                cop: 3.3,
                degradation_coefficient: None,
            }
            .into(),
        );
        let input = input.finalize().unwrap();

        assert_eq!(input.unit.unit_type, UnitType::WaterBrine);
        assert_relative_eq!(
            input.unit.design_load,
            9.7 * 14. / 12.,
            max_relative = 1e-12
        );
    }

    #[rstest]
    pub fn should_default_to_air_unit_type() {
        let request: CalculationRequest = serde_json::from_str(r#"{"climate": "Colder"}"#).unwrap();
        assert_eq!(request.unit_type, UnitType::Air);
        assert_eq!(request.off_mode_powers, OffModePowers::default());
    }

    #[rstest]
    pub fn should_read_water_brine_unit_type() {
        let request: CalculationRequest =
            serde_json::from_str(r#"{"unit_type": "water_brine"}"#).unwrap();
        assert_eq!(request.unit_type, UnitType::WaterBrine);
        assert_eq!(request.unit_type.to_string(), "water_brine");
    }

    #[rstest]
    pub fn should_give_standard_test_temperatures() {
        assert_eq!(TestLabel::A.standard_temperature(-6., -10.), -7.);
        assert_eq!(TestLabel::E.standard_temperature(-6., -10.), -10.);
        assert_eq!(TestLabel::F.standard_temperature(-6., -10.), -6.);
        assert_eq!(TestLabel::G.standard_temperature(-6., -10.), -15.);
    }
}
